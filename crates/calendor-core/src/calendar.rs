use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored calendar event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub event_id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl CalendarEvent {
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_duration_minutes() {
        let event = CalendarEvent {
            event_id: "e1".into(),
            title: "Standup".into(),
            start: Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 6, 2, 9, 45, 0).unwrap(),
            attendees: vec![],
            description: String::new(),
        };
        assert_eq!(event.duration_minutes(), 45);
    }
}
