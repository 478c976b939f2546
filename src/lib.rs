#![forbid(unsafe_code)]
//! Permanence : cache local d'un planning d'astreinte.
//!
//! - Shifts tirés d'un calendrier, croisés avec un annuaire.
//! - Cache fichier (TSV) avec durée de validité, repli sur cache périmé.
//! - Requêtes par plage, astreinte courante, rapport journalier.
//! - Runway de couverture, trous et chevauchements.
//! - Tout en UTC ; l'affichage local reste hors de la lib.

pub mod config;
pub mod interval;
pub mod io;
pub mod model;
pub mod roster;
pub mod source;
pub mod storage;

pub use config::{ConfigError, RosterConfig};
pub use interval::{find_overlaps, merge, Interval};
pub use io::{JsonDirectory, JsonEventSource};
pub use model::{Contact, Shift, ShiftError, ShiftField};
pub use roster::{DataOrigin, ReportDay, Roster, RosterError, RosterOptions, RosterStats};
pub use source::{
    collect_events, Directory, EventPage, EventSource, EventTime, LookupError, RawEvent,
    SourceError, Window,
};
pub use storage::{ShiftStore, StoreError, TsvStore};
