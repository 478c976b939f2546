mod query;
mod refresh;
mod stats;
mod types;

pub use types::{DataOrigin, ReportDay, RosterError, RosterOptions, RosterStats};

use crate::config::RosterConfig;
use crate::io::{JsonDirectory, JsonEventSource};
use crate::model::Shift;
use crate::source::{Directory, EventSource, Window};
use crate::storage::{ShiftStore, TsvStore};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use tracing::error;

/// Roster : cache local des shifts d'un calendrier, chargé à la demande.
///
/// Le premier accès décide entre le cache persisté (frais et cohérent) et
/// la source distante. Les données restent ensuite en mémoire ; seul
/// [`Roster::update_cache`] force un nouveau rafraîchissement.
pub struct Roster {
    opts: RosterOptions,
    min_end: DateTime<Utc>,
    source: Box<dyn EventSource>,
    directory: Box<dyn Directory>,
    store: Box<dyn ShiftStore>,
    shifts: Option<Vec<Shift>>,
}

impl Roster {
    pub fn new(
        opts: RosterOptions,
        source: Box<dyn EventSource>,
        directory: Box<dyn Directory>,
        store: Box<dyn ShiftStore>,
    ) -> Self {
        let min_end = opts.min_end.unwrap_or_else(Utc::now);
        Self {
            opts,
            min_end,
            source,
            directory,
            store,
            shifts: None,
        }
    }

    /// Roster branché sur les fichiers JSON et le cache `<dir>/<name>.cache`.
    pub fn from_config(cfg: &RosterConfig) -> Self {
        let source = JsonEventSource::open(cfg.events_file(), cfg.all_day_offset);
        let directory = JsonDirectory::open(cfg.contacts_file());
        let store = TsvStore::for_roster(cfg.cache_dir(), &cfg.name);
        Self::new(
            RosterOptions::from_config(cfg),
            Box::new(source),
            Box::new(directory),
            Box::new(store),
        )
    }

    pub fn identity(&self) -> &str {
        &self.opts.identity
    }
    pub fn external_id(&self) -> &str {
        &self.opts.external_id
    }
    pub fn min_end(&self) -> DateTime<Utc> {
        self.min_end
    }
    pub fn max_start(&self) -> Option<DateTime<Utc>> {
        self.opts.max_start
    }

    pub(crate) fn window(&self) -> Window {
        Window::new(self.min_end, self.opts.max_start)
    }

    pub fn cache_timestamp(&self) -> Option<DateTime<Utc>> {
        self.store.timestamp()
    }

    /// Cache jamais écrit, ou plus vieux que la durée de validité.
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        match self.store.age(now) {
            None => true,
            Some(age) => age > Duration::minutes(i64::from(self.opts.cache_ttl)),
        }
    }

    /// Tous les shifts, triés par début ; charge le roster si besoin.
    pub fn shifts(&mut self) -> Result<&[Shift], RosterError> {
        if self.shifts.is_none() {
            let loaded = refresh::populate(self, Utc::now())?;
            self.shifts = Some(loaded);
        }
        Ok(self.shifts.as_deref().unwrap_or(&[]))
    }

    pub fn last_shift(&mut self) -> Result<Option<&Shift>, RosterError> {
        Ok(self.shifts()?.iter().max_by_key(|s| s.end()))
    }

    /// Force un rafraîchissement depuis la source, quel que soit l'âge du cache.
    ///
    /// Si la source échoue, les données déjà en mémoire priment sur le cache
    /// persisté, qui n'est relu que si le roster n'a jamais été chargé.
    pub fn update_cache(&mut self) -> Result<DataOrigin, RosterError> {
        match refresh::fetch_shifts(self, &self.window()) {
            Ok(shifts) => {
                refresh::persist(self, &shifts);
                self.shifts = Some(shifts);
                Ok(DataOrigin::Live)
            }
            Err(e) if self.shifts.is_some() => {
                error!(roster = %self.opts.identity, error = %e, "update failed, keeping roster in memory");
                Ok(DataOrigin::Cached)
            }
            Err(e) => {
                error!(roster = %self.opts.identity, error = %e, "update failed");
                let shifts = refresh::fallback(self, e)?;
                self.shifts = Some(shifts);
                Ok(DataOrigin::Cached)
            }
        }
    }

    pub fn query(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Shift>, RosterError> {
        query::query(self, start, end)
    }

    pub fn current(&mut self) -> Result<Vec<Shift>, RosterError> {
        self.current_at(Utc::now())
    }

    pub fn current_at(&mut self, now: DateTime<Utc>) -> Result<Vec<Shift>, RosterError> {
        query::current_at(self, now)
    }

    pub fn report<Z: TimeZone>(
        &mut self,
        first: NaiveDate,
        last: NaiveDate,
        tz: &Z,
    ) -> Result<Vec<ReportDay>, RosterError> {
        query::report(self, first, last, tz)
    }

    pub fn runway(&mut self) -> Result<DateTime<Utc>, RosterError> {
        self.runway_at(Utc::now())
    }

    pub fn runway_at(&mut self, now: DateTime<Utc>) -> Result<DateTime<Utc>, RosterError> {
        Ok(stats::runway(self.shifts()?, now))
    }

    pub fn stats(&mut self) -> Result<RosterStats, RosterError> {
        self.stats_at(Utc::now())
    }

    pub fn stats_at(&mut self, now: DateTime<Utc>) -> Result<RosterStats, RosterError> {
        stats::stats(self, now)
    }
}
