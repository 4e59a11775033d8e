//! Event models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{null_as_default, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventCategory {
    Sports,
    Conference,
    Concert,
}

impl EventCategory {
    pub const ALL: [EventCategory; 3] = [
        EventCategory::Sports,
        EventCategory::Conference,
        EventCategory::Concert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Sports => "SPORTS",
            EventCategory::Conference => "CONFERENCE",
            EventCategory::Concert => "CONCERT",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SPORTS" => Ok(EventCategory::Sports),
            "CONFERENCE" => Ok(EventCategory::Conference),
            "CONCERT" => Ok(EventCategory::Concert),
            other => Err(format!(
                "unknown category: {} (expected SPORTS, CONFERENCE or CONCERT)",
                other
            )),
        }
    }
}

/// An event as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    pub event_date: NaiveDate,
    /// Local start time, `HH:MM` or `HH:MM:SS`
    pub start_time: String,
    pub end_time: String,
    pub city: String,
    pub location: String,
    pub category: EventCategory,
    pub max_participants: u32,
    #[serde(default, alias = "currentParticants", deserialize_with = "null_as_default")]
    pub current_participants: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub average_rating: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub participants: Vec<User>,
    #[serde(default)]
    pub organizer: Option<User>,
}

impl Event {
    /// Whether the given user already holds a booking for this event.
    pub fn is_booked_by(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p.id == user_id)
    }

    /// Whether the given user organizes this event.
    pub fn is_organized_by(&self, user_id: &str) -> bool {
        self.organizer.as_ref().is_some_and(|o| o.id == user_id)
    }

    pub fn seats_left(&self) -> u32 {
        self.max_participants
            .saturating_sub(self.current_participants.max(self.participants.len() as u32))
    }

    pub fn is_full(&self) -> bool {
        self.seats_left() == 0
    }
}

/// Body of `POST /events`: an event without identity or backend-owned fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub event_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub city: String,
    pub location: String,
    pub category: EventCategory,
    pub max_participants: u32,
    pub price: f64,
}

/// Body of `PUT /events/update`.
///
/// The backend overwrites every editable field, so an update is built from the
/// current event and then patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUpdate {
    pub id: String,
    pub title: String,
    pub description: String,
    pub event_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub city: String,
    pub location: String,
    pub category: EventCategory,
    pub max_participants: u32,
    pub price: f64,
}

impl From<&Event> for EventUpdate {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id.clone(),
            title: event.title.clone(),
            description: event.description.clone(),
            event_date: event.event_date,
            start_time: event.start_time.clone(),
            end_time: event.end_time.clone(),
            city: event.city.clone(),
            location: event.location.clone(),
            category: event.category,
            max_participants: event.max_participants,
            price: event.price,
        }
    }
}

/// Optional overrides applied on top of an existing event.
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub city: Option<String>,
    pub location: Option<String>,
    pub category: Option<EventCategory>,
    pub max_participants: Option<u32>,
    pub price: Option<f64>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.event_date.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.city.is_none()
            && self.location.is_none()
            && self.category.is_none()
            && self.max_participants.is_none()
            && self.price.is_none()
    }

    pub fn apply(self, update: &mut EventUpdate) {
        if let Some(v) = self.title {
            update.title = v;
        }
        if let Some(v) = self.description {
            update.description = v;
        }
        if let Some(v) = self.event_date {
            update.event_date = v;
        }
        if let Some(v) = self.start_time {
            update.start_time = v;
        }
        if let Some(v) = self.end_time {
            update.end_time = v;
        }
        if let Some(v) = self.city {
            update.city = v;
        }
        if let Some(v) = self.location {
            update.location = v;
        }
        if let Some(v) = self.category {
            update.category = v;
        }
        if let Some(v) = self.max_participants {
            update.max_participants = v;
        }
        if let Some(v) = self.price {
            update.price = v;
        }
    }
}

/// Body of `POST /events/{id}/rate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRequest {
    pub rating: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKEND_EVENT: &str = r#"{
        "id": "e1",
        "title": "Jazz Night",
        "description": "Live quartet",
        "eventDate": "2025-06-01",
        "startTime": "20:00:00",
        "endTime": "23:00:00",
        "city": "Oslo",
        "location": "Operahuset",
        "category": "CONCERT",
        "maxParticipants": 2,
        "currentParticipants": 1,
        "price": 19.99,
        "averageRating": 4.5,
        "participants": [{"id": "u1", "email": "ana@example.com", "fullName": "Ana", "role": "MEMBER"}],
        "organizer": {"id": "a1", "email": "org@example.com", "fullName": "Org", "role": "ADMIN"}
    }"#;

    #[test]
    fn test_event_deserializes_backend_shape() {
        let event: Event = serde_json::from_str(BACKEND_EVENT).unwrap();
        assert_eq!(event.id, "e1");
        assert_eq!(event.category, EventCategory::Concert);
        assert_eq!(event.event_date, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert_eq!(event.participants.len(), 1);
        assert!(event.is_booked_by("u1"));
        assert!(!event.is_booked_by("u2"));
        assert!(event.is_organized_by("a1"));
        assert_eq!(event.seats_left(), 1);
    }

    #[test]
    fn test_event_tolerates_missing_optional_fields() {
        let event: Event = serde_json::from_str(
            r#"{"id":"e2","title":"Derby","eventDate":"2025-07-01","startTime":"18:00",
                "endTime":"20:00","city":"Rabat","location":"Stadium","category":"SPORTS",
                "maxParticipants":10,"currentParticants":10}"#,
        )
        .unwrap();
        assert!(event.participants.is_empty());
        assert!(event.organizer.is_none());
        assert_eq!(event.average_rating, 0.0);
        assert!(event.is_full());
    }

    #[test]
    fn test_event_tolerates_explicit_nulls() {
        let event: Event = serde_json::from_str(
            r#"{"id":"e3","title":"Summit","description":null,"eventDate":"2025-09-10",
                "startTime":"09:00","endTime":"17:00","city":"Lagos","location":"Hall A",
                "category":"CONFERENCE","maxParticipants":5,"currentParticipants":null,
                "price":null,"averageRating":null,"participants":null,
                "organizer":{"id":"a1","email":null,"fullName":null,"role":null}}"#,
        )
        .unwrap();
        assert_eq!(event.description, "");
        assert_eq!(event.current_participants, 0);
        assert_eq!(event.price, 0.0);
        assert_eq!(event.average_rating, 0.0);
        assert!(event.participants.is_empty());
        let organizer = event.organizer.as_ref().unwrap();
        assert_eq!(organizer.email, "");
        assert_eq!(organizer.full_name, "");
        assert!(organizer.role.is_none());
        assert_eq!(event.seats_left(), 5);
    }

    #[test]
    fn test_patch_overlays_only_given_fields() {
        let event: Event = serde_json::from_str(BACKEND_EVENT).unwrap();
        let mut update = EventUpdate::from(&event);
        let patch = EventPatch {
            title: Some("Jazz Night II".to_string()),
            max_participants: Some(50),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        patch.apply(&mut update);

        assert_eq!(update.id, "e1");
        assert_eq!(update.title, "Jazz Night II");
        assert_eq!(update.max_participants, 50);
        assert_eq!(update.city, "Oslo");
        assert_eq!(update.price, 19.99);
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("concert".parse::<EventCategory>().unwrap(), EventCategory::Concert);
        assert_eq!("SPORTS".parse::<EventCategory>().unwrap(), EventCategory::Sports);
        assert!("theatre".parse::<EventCategory>().is_err());
    }
}
