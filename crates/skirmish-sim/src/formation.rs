//! Roster layout: initial placement and rank/file reshuffling after casualties.

use hecs::Entity;

use crate::components::Roster;

/// Lay out `fighters` in files of `ranks`, filling each file front to back.
pub fn initial_roster(fighters: Vec<Entity>, ranks: usize) -> Roster {
    let ranks = ranks.clamp(1, fighters.len().max(1));
    let files = fighters.len().div_ceil(ranks);
    let mut slots: Vec<Option<Entity>> = fighters.into_iter().map(Some).collect();
    slots.resize(files * ranks, None);
    Roster { slots, ranks }
}

/// Close the gaps left by casualties.
///
/// Survivors step forward within their file, then surplus edge files (the
/// side with fewer fighters first, the right on a tie) are dissolved into the
/// holes nearest the front and the middle of the formation.
pub fn swap_fighters(roster: &mut Roster) {
    let ranks = roster.ranks.max(1);
    let mut columns: Vec<Vec<Option<Entity>>> = roster
        .slots
        .chunks(ranks)
        .map(|c| c.to_vec())
        .collect();

    columns.iter_mut().for_each(|c| compact_file(c));

    let count: usize = columns.iter().map(|c| filled(c)).sum();
    let needed = count.div_ceil(ranks).max(1);

    while columns.len() > needed {
        let left = filled(&columns[0]);
        let right = filled(&columns[columns.len() - 1]);
        let retired = if left < right {
            columns.remove(0)
        } else {
            columns.pop().unwrap_or_default()
        };

        let middle = (columns.len() as f32 - 1.0) / 2.0;
        let mut holes: Vec<(usize, usize)> = columns
            .iter()
            .enumerate()
            .flat_map(|(file, c)| {
                c.iter()
                    .enumerate()
                    .filter(|(_, s)| s.is_none())
                    .map(move |(rank, _)| (file, rank))
            })
            .collect();
        holes.sort_by(|a, b| {
            a.1.cmp(&b.1)
                .then((a.0 as f32 - middle).abs().total_cmp(&(b.0 as f32 - middle).abs()))
                .then(a.0.cmp(&b.0))
        });

        for (fighter, (file, rank)) in retired.into_iter().flatten().zip(holes) {
            columns[file][rank] = Some(fighter);
        }
    }

    columns.iter_mut().for_each(|c| compact_file(c));
    roster.slots = columns.into_iter().flatten().collect();
    roster.ranks = ranks;
}

fn filled(file: &[Option<Entity>]) -> usize {
    file.iter().filter(|s| s.is_some()).count()
}

fn compact_file(file: &mut [Option<Entity>]) {
    let survivors: Vec<Entity> = file.iter().filter_map(|s| *s).collect();
    for (rank, slot) in file.iter_mut().enumerate() {
        *slot = survivors.get(rank).copied();
    }
}
