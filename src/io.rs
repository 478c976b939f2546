//! Adaptateurs fichiers (JSON) pour la source d'évènements et l'annuaire.

use crate::model::Contact;
use crate::source::{
    Directory, EventPage, EventSource, EventTime, LookupError, RawEvent, SourceError, Window,
};
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ExportFile {
    #[serde(default)]
    items: Vec<ExportItem>,
}

#[derive(Debug, Deserialize)]
struct ExportItem {
    #[serde(default)]
    summary: String,
    start: ExportTime,
    end: ExportTime,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportTime {
    #[serde(default)]
    date_time: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

impl ExportTime {
    fn parse(&self) -> Result<EventTime, SourceError> {
        if let Some(raw) = &self.date_time {
            let dt = DateTime::parse_from_rfc3339(raw)
                .map_err(|e| SourceError::Malformed(format!("dateTime {raw:?}: {e}")))?;
            return Ok(EventTime::At(dt));
        }
        if let Some(raw) = &self.date {
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|e| SourceError::Malformed(format!("date {raw:?}: {e}")))?;
            return Ok(EventTime::AllDay(date));
        }
        Err(SourceError::Malformed("event time without date nor dateTime".into()))
    }
}

/// Export de calendrier au format `{"items": [{summary, start, end}]}`.
///
/// Les bornes suivent la forme des API calendrier : `{"dateTime": ...}`
/// pour un instant, `{"date": "YYYY-MM-DD"}` pour une journée entière.
#[derive(Debug, Clone)]
pub struct JsonEventSource {
    path: PathBuf,
    all_day_offset: i32,
}

impl JsonEventSource {
    pub fn open<P: AsRef<Path>>(path: P, all_day_offset: i32) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            all_day_offset,
        }
    }
}

impl EventSource for JsonEventSource {
    fn fetch_page(
        &self,
        window: &Window,
        _page_token: Option<&str>,
    ) -> Result<EventPage, SourceError> {
        let data = fs::read(&self.path)
            .map_err(|e| SourceError::Unreachable(format!("{}: {e}", self.path.display())))?;
        let export: ExportFile = serde_json::from_slice(&data)
            .map_err(|e| SourceError::Malformed(format!("{}: {e}", self.path.display())))?;

        let mut events = Vec::with_capacity(export.items.len());
        for item in export.items {
            let start = item.start.parse()?;
            let end = item.end.parse()?;
            let (s, e) = (
                start.to_utc(self.all_day_offset),
                end.to_utc(self.all_day_offset),
            );
            if !window.overlaps(s, e) {
                continue;
            }
            events.push(RawEvent {
                start,
                end,
                summary: item.summary,
            });
        }
        debug!(path = %self.path.display(), count = events.len(), "read calendar export");
        Ok(EventPage {
            events,
            next_page_token: None,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct DirectoryEntry {
    name: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
}

/// Annuaire JSON `[{"name", "email", "phone"}]`, correspondance exacte sur le nom.
#[derive(Debug, Clone)]
pub struct JsonDirectory {
    path: PathBuf,
}

impl JsonDirectory {
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn entries(&self) -> Result<Vec<DirectoryEntry>, LookupError> {
        let data = fs::read(&self.path)
            .map_err(|e| LookupError::Unavailable(format!("{}: {e}", self.path.display())))?;
        serde_json::from_slice(&data)
            .map_err(|e| LookupError::Unavailable(format!("{}: {e}", self.path.display())))
    }
}

impl Directory for JsonDirectory {
    fn resolve(&self, identity: &str) -> Result<Contact, LookupError> {
        let wanted = identity.trim();
        let mut matches: Vec<DirectoryEntry> = self
            .entries()?
            .into_iter()
            .filter(|e| e.name.trim() == wanted)
            .collect();
        match matches.len() {
            0 => Err(LookupError::NoMatch(wanted.to_string())),
            1 => {
                let entry = matches.remove(0);
                Ok(Contact::new(entry.email, entry.phone))
            }
            count => Err(LookupError::Ambiguous {
                identity: wanted.to_string(),
                count,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    #[test]
    fn reads_timed_and_all_day_events_in_window() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.json");
        fs::write(
            &path,
            r#"{"items":[
                {"summary":"Alice","start":{"dateTime":"2025-03-01T09:00:00+01:00"},
                 "end":{"dateTime":"2025-03-02T09:00:00+01:00"}},
                {"summary":"Bob","start":{"date":"2025-03-02"},"end":{"date":"2025-03-03"}},
                {"summary":"Old","start":{"date":"2024-01-01"},"end":{"date":"2024-01-02"}}
            ]}"#,
        )
        .unwrap();
        let src = JsonEventSource::open(&path, 8);
        let window = Window::new(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(), None);
        let page = src.fetch_page(&window, None).unwrap();
        assert_eq!(page.events.len(), 2);
        assert!(page.events[1].start.is_all_day());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn missing_export_is_unreachable() {
        let dir = tempdir().unwrap();
        let src = JsonEventSource::open(dir.path().join("nope.json"), 0);
        let window = Window::new(Utc::now(), None);
        assert!(matches!(
            src.fetch_page(&window, None),
            Err(SourceError::Unreachable(_))
        ));
    }

    #[test]
    fn directory_exact_match() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("contacts.json");
        fs::write(
            &path,
            r#"[{"name":"Alice","email":"alice@example.com","phone":"+331"},
                {"name":"Bob","email":"bob@example.com"},
                {"name":"Bob","email":"bob2@example.com"}]"#,
        )
        .unwrap();
        let d = JsonDirectory::open(&path);
        let alice = d.resolve("Alice").unwrap();
        assert_eq!(alice.email.as_deref(), Some("alice@example.com"));
        assert_eq!(alice.phone.as_deref(), Some("+331"));
        assert!(matches!(
            d.resolve("Bob"),
            Err(LookupError::Ambiguous { count: 2, .. })
        ));
        assert!(matches!(d.resolve("Carol"), Err(LookupError::NoMatch(_))));
    }
}
