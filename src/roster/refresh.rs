use super::{Roster, RosterError};
use crate::model::{Contact, Shift};
use crate::source::{collect_events, Directory, EventSource, LookupError, SourceError, Window};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

/// Remplit le roster au premier accès : cache si frais, sinon source.
pub(super) fn populate(roster: &Roster, now: DateTime<Utc>) -> Result<Vec<Shift>, RosterError> {
    if roster.is_stale_at(now) {
        debug!(roster = %roster.opts.identity, "cache is stale");
        return refresh_or_fallback(roster);
    }

    let cached = match roster.store.load() {
        Ok(shifts) => sorted(shifts),
        Err(e) if e.is_recoverable() => {
            debug!(roster = %roster.opts.identity, error = %e, "cache unusable");
            return refresh_or_fallback(roster);
        }
        Err(e) => {
            warn!(roster = %roster.opts.identity, error = %e, "cache unreadable");
            return refresh_or_fallback(roster);
        }
    };

    let lacks_early = cached
        .first()
        .is_some_and(|first| first.start() > roster.min_end);
    if !lacks_early {
        info!(roster = %roster.opts.identity, count = cached.len(), "building roster from cache");
        return Ok(cached);
    }

    warn!(roster = %roster.opts.identity, "cache may lack early records");
    match fetch_shifts(roster, &roster.window()) {
        Ok(fresh) => {
            persist(roster, &fresh);
            Ok(fresh)
        }
        Err(e) => {
            error!(roster = %roster.opts.identity, error = %e, "refresh failed, keeping cache");
            Ok(cached)
        }
    }
}

/// Rafraîchit depuis la source ; en cas d'échec, relit le cache persisté.
fn refresh_or_fallback(roster: &Roster) -> Result<Vec<Shift>, RosterError> {
    match fetch_shifts(roster, &roster.window()) {
        Ok(shifts) => {
            persist(roster, &shifts);
            Ok(shifts)
        }
        Err(source) => {
            error!(roster = %roster.opts.identity, error = %source, "error while retrieving live data");
            fallback(roster, source)
        }
    }
}

/// Relit le cache persisté après un échec de la source, sans le réécrire.
pub(super) fn fallback(roster: &Roster, source: SourceError) -> Result<Vec<Shift>, RosterError> {
    match roster.store.load() {
        Ok(shifts) => {
            warn!(roster = %roster.opts.identity, "serving stale cache");
            Ok(sorted(shifts))
        }
        Err(cache) => Err(RosterError::NoDataSource { source, cache }),
    }
}

/// Interroge la source sur `window` et croise avec l'annuaire.
pub(super) fn fetch_shifts(roster: &Roster, window: &Window) -> Result<Vec<Shift>, SourceError> {
    info!(
        roster = %roster.opts.identity,
        calendar = %roster.opts.external_id,
        "building roster from live data"
    );
    build_shifts(
        roster.source.as_ref(),
        roster.directory.as_ref(),
        window,
        roster.opts.all_day_offset,
    )
}

fn build_shifts(
    source: &dyn EventSource,
    directory: &dyn Directory,
    window: &Window,
    all_day_offset: i32,
) -> Result<Vec<Shift>, SourceError> {
    let events = collect_events(source, window)?;

    // une seule résolution par identité
    let mut contacts: BTreeMap<String, Contact> = BTreeMap::new();
    for event in &events {
        let identity = event.summary.trim();
        if identity.is_empty() || contacts.contains_key(identity) {
            continue;
        }
        let contact = match directory.resolve(identity) {
            Ok(contact) => contact,
            Err(e @ LookupError::Ambiguous { .. }) | Err(e @ LookupError::NoMatch(_)) => {
                warn!(identity, error = %e, "contact details left empty");
                Contact::default()
            }
            Err(e) => {
                warn!(identity, error = %e, "directory lookup failed");
                Contact::default()
            }
        };
        contacts.insert(identity.to_string(), contact);
    }

    let mut shifts = Vec::with_capacity(events.len());
    for event in events {
        let identity = event.summary.trim();
        let contact = contacts.get(identity).cloned().unwrap_or_default();
        let start = event.start.to_utc(all_day_offset);
        let end = event.end.to_utc(all_day_offset);
        match Shift::new(start, end, Some(identity.to_string()), contact) {
            Ok(shift) => shifts.push(shift),
            Err(e) => warn!(identity, error = %e, "skipping malformed event"),
        }
    }
    debug!(count = shifts.len(), "retrieved shifts");
    Ok(sorted(shifts))
}

pub(super) fn persist(roster: &Roster, shifts: &[Shift]) {
    info!(roster = %roster.opts.identity, "saving cache");
    if let Err(e) = roster.store.save(shifts) {
        error!(roster = %roster.opts.identity, error = %e, "could not save cache");
    }
}

fn sorted(mut shifts: Vec<Shift>) -> Vec<Shift> {
    shifts.sort_by_key(|s| (s.start(), s.end()));
    shifts
}
