use super::{Roster, RosterError, RosterStats};
use crate::interval::{self, Interval};
use crate::model::Shift;
use chrono::{DateTime, Utc};

fn spans<'a>(shifts: impl Iterator<Item = &'a Shift>) -> Vec<Interval<DateTime<Utc>>> {
    shifts
        .map(|s| Interval {
            start: s.start(),
            end: s.end(),
        })
        .collect()
}

/// Instant jusqu'auquel la couverture est continue à partir de `now`.
///
/// Renvoie `now` si personne n'est d'astreinte à cet instant.
pub(super) fn runway(shifts: &[Shift], now: DateTime<Utc>) -> DateTime<Utc> {
    let merged = interval::merge(&spans(shifts.iter().filter(|s| s.end() > now)));
    match merged.first() {
        Some(first) if first.start <= now => first.end,
        _ => now,
    }
}

pub(super) fn stats(roster: &mut Roster, now: DateTime<Utc>) -> Result<RosterStats, RosterError> {
    // peupler d'abord : un rafraîchissement réécrit le cache
    roster.shifts()?;
    let cache_timestamp = roster.cache_timestamp();
    let min_end = roster.min_end;
    let max_start = roster.opts.max_start;

    let shifts = roster.shifts()?;
    let all = spans(shifts.iter());
    let merged = interval::merge(&all);

    Ok(RosterStats {
        min_end,
        max_start,
        shift_count: shifts.len(),
        fragments: merged.len(),
        coverage_end: merged.last().map(|f| f.end),
        holes: interval::holes(&merged),
        overlaps: interval::find_overlaps(&all),
        cache_timestamp,
        runway: runway(shifts, now),
    })
}
