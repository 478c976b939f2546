use super::{refresh, ReportDay, Roster, RosterError};
use crate::model::Shift;
use crate::source::Window;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use tracing::warn;

pub(super) fn query(
    roster: &mut Roster,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Shift>, RosterError> {
    if end < start {
        return Err(RosterError::InvalidRange { start, end });
    }

    let outside = start < roster.min_end || roster.opts.max_start.is_some_and(|max| end > max);
    if outside {
        warn!(
            roster = %roster.opts.identity,
            %start,
            %end,
            min_end = %roster.min_end,
            "range is outside of cache scope, querying live data"
        );
        match refresh::fetch_shifts(roster, &Window::new(start, Some(end))) {
            Ok(live) => return Ok(within(live.iter(), start, end)),
            Err(e) => warn!(error = %e, "live query failed, answering from cache"),
        }
    }

    Ok(within(roster.shifts()?.iter(), start, end))
}

fn within<'a>(
    shifts: impl Iterator<Item = &'a Shift>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<Shift> {
    shifts.filter(|s| s.overlaps(start, end)).cloned().collect()
}

/// Tous les shifts actifs à `now`, bornes incluses.
pub(super) fn current_at(
    roster: &mut Roster,
    now: DateTime<Utc>,
) -> Result<Vec<Shift>, RosterError> {
    Ok(roster
        .shifts()?
        .iter()
        .filter(|s| s.covers(now))
        .cloned()
        .collect())
}

/// Une entrée par jour calendaire de `[first, last]` dans le fuseau `tz`.
///
/// Un jour va de `00:00 + offset` au même horaire le lendemain, en heure
/// locale : un jour de changement d'heure dure donc 23 ou 25 heures.
pub(super) fn report<Z: TimeZone>(
    roster: &mut Roster,
    first: NaiveDate,
    last: NaiveDate,
    tz: &Z,
) -> Result<Vec<ReportDay>, RosterError> {
    if last < first {
        return Err(RosterError::InvalidPeriod { first, last });
    }

    let offset = roster.opts.all_day_offset;
    let mut out = Vec::new();
    let mut day = first;
    loop {
        let next = day.succ_opt().ok_or(RosterError::DateOverflow(day))?;
        let start = day_boundary(day, offset, tz).ok_or(RosterError::DateOverflow(day))?;
        let end = day_boundary(next, offset, tz).ok_or(RosterError::DateOverflow(next))?;

        let mut names: Vec<String> = Vec::new();
        for shift in roster.query(start, end)? {
            if let Some(name) = shift.name() {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        out.push(ReportDay { date: day, names });

        if day == last {
            break;
        }
        day = next;
    }
    Ok(out)
}

/// Instant UTC de `date 00:00 + offset` en heure locale de `tz`.
///
/// Heure ambiguë : la plus tôt. Heure inexistante : premier quart d'heure
/// valide après le saut.
fn day_boundary<Z: TimeZone>(date: NaiveDate, offset: i32, tz: &Z) -> Option<DateTime<Utc>> {
    let local = date
        .and_time(NaiveTime::MIN)
        .checked_add_signed(Duration::hours(i64::from(offset)))?;
    (0..=16).find_map(|quarter| {
        let candidate = local.checked_add_signed(Duration::minutes(15 * quarter))?;
        tz.from_local_datetime(&candidate)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Paris;

    #[test]
    fn boundary_in_spring_gap_moves_forward() {
        // 2025-03-30 02:00 n'existe pas à Paris
        let date = NaiveDate::from_ymd_opt(2025, 3, 30).unwrap();
        let at = day_boundary(date, 2, &Paris).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2025, 3, 30, 1, 0, 0).unwrap());
    }

    #[test]
    fn boundary_in_autumn_overlap_takes_earliest() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 26).unwrap();
        let at = day_boundary(date, 2, &Paris).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2025, 10, 26, 0, 0, 0).unwrap());
    }
}
