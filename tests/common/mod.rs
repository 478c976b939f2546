#![allow(dead_code)]
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use permanence::{
    Contact, Directory, EventPage, EventSource, EventTime, LookupError, RawEvent, Roster,
    RosterOptions, Shift, SourceError, TsvStore, Window,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::rc::Rc;
use std::time::SystemTime;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
}

pub fn h(hours: i64) -> DateTime<Utc> {
    t0() + Duration::hours(hours)
}

pub fn timed(start: DateTime<Utc>, end: DateTime<Utc>, who: &str) -> RawEvent {
    let utc = FixedOffset::east_opt(0).unwrap();
    RawEvent {
        start: EventTime::At(start.with_timezone(&utc)),
        end: EventTime::At(end.with_timezone(&utc)),
        summary: who.to_string(),
    }
}

pub fn shift(start: DateTime<Utc>, end: DateTime<Utc>, who: &str) -> Shift {
    Shift::new(start, end, Some(who.to_string()), Contact::default()).unwrap()
}

#[derive(Default)]
struct CalendarState {
    events: Vec<RawEvent>,
    down: bool,
    windows: Vec<Window>,
}

/// Calendrier en mémoire ; les clones partagent le même état.
#[derive(Clone, Default)]
pub struct FakeCalendar {
    state: Rc<RefCell<CalendarState>>,
}

impl FakeCalendar {
    pub fn with_events(events: Vec<RawEvent>) -> Self {
        let cal = Self::default();
        cal.state.borrow_mut().events = events;
        cal
    }
    pub fn down() -> Self {
        let cal = Self::default();
        cal.set_down(true);
        cal
    }
    pub fn set_down(&self, down: bool) {
        self.state.borrow_mut().down = down;
    }
    pub fn set_events(&self, events: Vec<RawEvent>) {
        self.state.borrow_mut().events = events;
    }
    pub fn calls(&self) -> usize {
        self.state.borrow().windows.len()
    }
    pub fn windows(&self) -> Vec<Window> {
        self.state.borrow().windows.clone()
    }
}

impl EventSource for FakeCalendar {
    fn fetch_page(&self, window: &Window, _: Option<&str>) -> Result<EventPage, SourceError> {
        let mut st = self.state.borrow_mut();
        st.windows.push(*window);
        if st.down {
            return Err(SourceError::Unreachable("calendar down".into()));
        }
        let events = st
            .events
            .iter()
            .filter(|e| window.overlaps(e.start.to_utc(0), e.end.to_utc(0)))
            .cloned()
            .collect();
        Ok(EventPage {
            events,
            next_page_token: None,
        })
    }
}

/// Annuaire en mémoire ; un nom présent plusieurs fois est ambigu.
#[derive(Clone, Default)]
pub struct FakeDirectory {
    entries: Rc<RefCell<Vec<(String, Contact)>>>,
    lookups: Rc<RefCell<HashMap<String, usize>>>,
}

impl FakeDirectory {
    pub fn add(self, name: &str, email: &str, phone: &str) -> Self {
        self.entries.borrow_mut().push((
            name.to_string(),
            Contact::new(Some(email.to_string()), Some(phone.to_string())),
        ));
        self
    }
    pub fn lookups(&self, name: &str) -> usize {
        self.lookups.borrow().get(name).copied().unwrap_or(0)
    }
}

impl Directory for FakeDirectory {
    fn resolve(&self, identity: &str) -> Result<Contact, LookupError> {
        *self
            .lookups
            .borrow_mut()
            .entry(identity.to_string())
            .or_default() += 1;
        let entries = self.entries.borrow();
        let found: Vec<&Contact> = entries
            .iter()
            .filter(|(name, _)| name == identity)
            .map(|(_, c)| c)
            .collect();
        match found.len() {
            0 => Err(LookupError::NoMatch(identity.to_string())),
            1 => Ok(found[0].clone()),
            count => Err(LookupError::Ambiguous {
                identity: identity.to_string(),
                count,
            }),
        }
    }
}

pub fn options(min_end: DateTime<Utc>) -> RosterOptions {
    let mut opts = RosterOptions::new("ops", "ops@calendar.example.com");
    opts.min_end = Some(min_end);
    opts.cache_ttl = 30;
    opts
}

pub fn roster(
    opts: RosterOptions,
    calendar: &FakeCalendar,
    directory: &FakeDirectory,
    store: &TsvStore,
) -> Roster {
    Roster::new(
        opts,
        Box::new(calendar.clone()),
        Box::new(directory.clone()),
        Box::new(store.clone()),
    )
}

/// Vieillit artificiellement le fichier de cache.
pub fn age_file(path: &Path, by: std::time::Duration) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - by).unwrap();
}
