use crate::config::RosterConfig;
use crate::interval::Interval;
use crate::source::SourceError;
use crate::storage::StoreError;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

/// Paramètres d'un roster.
#[derive(Debug, Clone)]
pub struct RosterOptions {
    /// Nom lisible du roster.
    pub identity: String,
    /// Identifiant opaque côté source (id du calendrier).
    pub external_id: String,
    /// Fin minimale des shifts mis en cache ; « maintenant » si absent.
    pub min_end: Option<DateTime<Utc>>,
    /// Début maximal des shifts mis en cache ; sans limite si absent.
    pub max_start: Option<DateTime<Utc>>,
    pub all_day_offset: i32,
    /// Durée de validité du cache, en minutes.
    pub cache_ttl: u32,
}

impl RosterOptions {
    pub fn new<I: Into<String>, E: Into<String>>(identity: I, external_id: E) -> Self {
        Self {
            identity: identity.into(),
            external_id: external_id.into(),
            min_end: None,
            max_start: None,
            all_day_offset: 0,
            cache_ttl: 30,
        }
    }

    pub fn from_config(cfg: &RosterConfig) -> Self {
        Self {
            identity: cfg.name.clone(),
            external_id: cfg.calendar_id.clone(),
            min_end: cfg.min_end,
            max_start: cfg.max_start,
            all_day_offset: cfg.all_day_offset,
            cache_ttl: cfg.cache_timeout,
        }
    }
}

/// Provenance des données servies après un rafraîchissement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOrigin {
    Live,
    Cached,
}

/// Personnes d'astreinte pour une journée calendaire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDay {
    pub date: NaiveDate,
    pub names: Vec<String>,
}

/// Statistiques et contrôle d'intégrité du roster en mémoire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterStats {
    pub min_end: DateTime<Utc>,
    pub max_start: Option<DateTime<Utc>>,
    pub shift_count: usize,
    /// Nombre de fragments de couverture continue (1 = sans trou).
    pub fragments: usize,
    /// Fin du dernier fragment.
    pub coverage_end: Option<DateTime<Utc>>,
    pub holes: Vec<Interval<DateTime<Utc>>>,
    pub overlaps: Vec<Interval<DateTime<Utc>>>,
    pub cache_timestamp: Option<DateTime<Utc>>,
    pub runway: DateTime<Utc>,
}

impl RosterStats {
    pub fn has_integrity_problem(&self) -> bool {
        self.fragments > 1 || !self.overlaps.is_empty()
    }
}

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("invalid range: end {end} is before start {start}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("invalid report period: {last} is before {first}")]
    InvalidPeriod { first: NaiveDate, last: NaiveDate },
    #[error("date out of range after {0}")]
    DateOverflow(NaiveDate),
    #[error("no usable data source: {source}; cache: {cache}")]
    NoDataSource {
        #[source]
        source: SourceError,
        cache: StoreError,
    },
}
