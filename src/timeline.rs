//! Timeline projection for anniversary events.
//!
//! Sorts the event collection chronologically, computes a countdown for each
//! event relative to a given day, and detects birthdays falling on that day.
use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveTime};
use log::{debug, info};

use crate::{
    new_id, Category, Collection, Confirmer, Deletion, EncodedBlob, Event, KeepsakeError,
    RecordStore, Result,
};

/// Fields submitted to create an event
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub date: NaiveDate,
    pub category: Category,
    pub reminder: Option<NaiveTime>,
    pub photo: Option<EncodedBlob>,
}

/// Calendar-day distance between an event and a reference day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    Today,
    InDays(u64),
    Elapsed(u64),
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Countdown::Today => write!(f, "today"),
            Countdown::InDays(n) => write!(f, "in {} days", n),
            Countdown::Elapsed(n) => write!(f, "elapsed {} days", n),
        }
    }
}

/// Countdown from `today` to `date`. Works on whole calendar days, so the
/// time of day never shifts the result.
pub fn countdown(date: NaiveDate, today: NaiveDate) -> Countdown {
    let days = (date - today).num_days();
    match days {
        0 => Countdown::Today,
        d if d > 0 => Countdown::InDays(d as u64),
        d => Countdown::Elapsed(d.unsigned_abs()),
    }
}

/// A birthday whose month and day match `today`, in any year.
pub fn is_birthday_on(event: &Event, today: NaiveDate) -> bool {
    event.category == Category::Birthday
        && event.date.month() == today.month()
        && event.date.day() == today.day()
}

/// Stable ascending sort by date.
pub fn sort_events(events: &mut [Event]) {
    events.sort_by_key(|e| e.date);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineItem {
    pub event: Event,
    pub countdown: Countdown,
}

/// The timeline as seen on one day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineView {
    pub today: NaiveDate,
    pub items: Vec<TimelineItem>,
    /// IDs of birthday events that fall on `today`
    pub birthdays_today: Vec<String>,
}

impl TimelineView {
    /// Whether this projection calls for a celebration
    pub fn celebrate(&self) -> bool {
        !self.birthdays_today.is_empty()
    }
}

/// Turns the celebration condition into a one-shot signal.
///
/// A view that calls for a celebration fires the latch once; further views
/// on the same day stay quiet while the condition keeps holding.
#[derive(Debug, Default)]
pub struct CelebrationLatch {
    fired_on: Option<NaiveDate>,
}

impl CelebrationLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true exactly once per day on which a celebration is due.
    pub fn observe(&mut self, view: &TimelineView) -> bool {
        if !view.celebrate() || self.fired_on == Some(view.today) {
            return false;
        }
        self.fired_on = Some(view.today);
        true
    }
}

/// Command functions over the `events` collection
#[derive(Clone)]
pub struct Timeline {
    store: RecordStore,
}

impl Timeline {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    /// Validates and appends a new event.
    pub fn add_event(&self, new_event: NewEvent) -> Result<Event> {
        if new_event.title.trim().is_empty() {
            return Err(KeepsakeError::validation("event title is required"));
        }

        let event = Event {
            id: new_id(),
            title: new_event.title,
            date: new_event.date,
            category: new_event.category,
            reminder: new_event.reminder,
            photo: new_event.photo,
        };

        let mut events: Vec<Event> = self.store.load_for_update(Collection::Events)?;
        events.push(event.clone());
        self.store.save(Collection::Events, &events)?;

        info!("Event added: {} ({})", event.id, event.date);
        Ok(event)
    }

    /// All events in chronological order
    pub fn events(&self) -> Vec<Event> {
        let mut events: Vec<Event> = self.store.load(Collection::Events);
        sort_events(&mut events);
        events
    }

    pub fn project(&self, today: NaiveDate) -> TimelineView {
        let events = self.events();
        let birthdays_today = events
            .iter()
            .filter(|e| is_birthday_on(e, today))
            .map(|e| e.id.clone())
            .collect();
        let items = events
            .into_iter()
            .map(|event| TimelineItem {
                countdown: countdown(event.date, today),
                event,
            })
            .collect();

        TimelineView {
            today,
            items,
            birthdays_today,
        }
    }

    /// Deletes an event once the confirmer agrees.
    pub fn delete_event(&self, id: &str, confirmer: &dyn Confirmer) -> Result<Deletion> {
        let mut events: Vec<Event> = self.store.load_for_update(Collection::Events)?;
        let Some(position) = events.iter().position(|e| e.id == id) else {
            return Err(KeepsakeError::RecordNotFound {
                kind: "Event",
                id: id.to_string(),
            });
        };

        let prompt = format!("Delete \"{}\"?", events[position].title);
        if !confirmer.confirm(&prompt) {
            debug!("Deletion of event {} declined", id);
            return Ok(Deletion::Declined);
        }

        events.remove(position);
        self.store.save(Collection::Events, &events)?;

        info!("Event deleted: {}", id);
        Ok(Deletion::Deleted)
    }
}
