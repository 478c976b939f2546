//! Collaborateurs externes : source d'évènements (calendrier) et annuaire.
//!
//! Le moteur ne les connaît qu'à travers [`EventSource`] et [`Directory`].

use crate::model::Contact;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use thiserror::Error;
use tracing::{debug, warn};

/// Nombre maximal de pages lues lors d'une collecte.
pub const MAX_PAGES: usize = 50;
/// Nombre maximal d'évènements retenus lors d'une collecte.
pub const MAX_EVENTS: usize = 2500;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("event source unreachable: {0}")]
    Unreachable(String),
    #[error("malformed event source response: {0}")]
    Malformed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("no contact matches {0:?}")]
    NoMatch(String),
    #[error("{count} contacts match {identity:?}")]
    Ambiguous { identity: String, count: usize },
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Borne d'un évènement : instant précis ou journée entière.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    At(DateTime<FixedOffset>),
    AllDay(NaiveDate),
}

impl EventTime {
    /// Ramène la borne en UTC ; une date devient `date 00:00 UTC + offset`.
    pub fn to_utc(self, all_day_offset: i32) -> DateTime<Utc> {
        match self {
            EventTime::At(dt) => dt.with_timezone(&Utc),
            EventTime::AllDay(date) => {
                Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
                    + Duration::hours(i64::from(all_day_offset))
            }
        }
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self, EventTime::AllDay(_))
    }
}

/// Évènement brut tel que renvoyé par le calendrier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub start: EventTime,
    pub end: EventTime,
    /// Texte libre identifiant la personne d'astreinte.
    pub summary: String,
}

/// Fenêtre de requête ; `end == None` signifie sans limite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// Même test de recouvrement que les requêtes du roster.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        end > self.start && self.end.map_or(true, |we| start < we)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventPage {
    pub events: Vec<RawEvent>,
    pub next_page_token: Option<String>,
}

pub trait EventSource {
    /// Lit une page d'évènements dans `window`.
    fn fetch_page(
        &self,
        window: &Window,
        page_token: Option<&str>,
    ) -> Result<EventPage, SourceError>;
}

pub trait Directory {
    /// Résout un nom libre en coordonnées ; un seul résultat attendu.
    fn resolve(&self, identity: &str) -> Result<Contact, LookupError>;
}

/// Lit toutes les pages de `window`, dans la limite de [`MAX_PAGES`] et
/// [`MAX_EVENTS`]. Atteindre une limite tronque la collecte sans erreur.
pub fn collect_events(
    source: &dyn EventSource,
    window: &Window,
) -> Result<Vec<RawEvent>, SourceError> {
    let mut events = Vec::new();
    let mut token: Option<String> = None;

    for page_no in 1..=MAX_PAGES {
        let page = source.fetch_page(window, token.as_deref())?;
        debug!(page = page_no, count = page.events.len(), "fetched event page");
        events.extend(page.events);

        if events.len() >= MAX_EVENTS {
            if events.len() > MAX_EVENTS || page.next_page_token.is_some() {
                warn!(cap = MAX_EVENTS, "event cap reached, truncating collection");
                events.truncate(MAX_EVENTS);
            }
            return Ok(events);
        }
        match page.next_page_token {
            Some(next) => token = Some(next),
            None => return Ok(events),
        }
    }

    warn!(cap = MAX_PAGES, "page cap reached, truncating collection");
    Ok(events)
}
