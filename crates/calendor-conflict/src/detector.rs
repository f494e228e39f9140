use crate::types::{ConflictKind, ConflictRecord, Resolution, RescheduleOption, Severity};
use calendor_core::{CalendarEvent, CalendorError, CalendorResult};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Thresholds for the four sub-analyses. Every field can be overridden
/// from configuration; the defaults match a typical working day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Minimum gap required between adjacent meetings, in minutes.
    #[serde(default = "default_buffer_minutes")]
    pub buffer_minutes: i64,
    /// Maximum meetings per day before a day counts as overbooked.
    #[serde(default = "default_max_daily_meetings")]
    pub max_daily_meetings: usize,
    /// Longest tolerated consecutive meeting run, in hours.
    #[serde(default = "default_max_consecutive_hours")]
    pub max_consecutive_hours: f64,
    /// Total daily meeting hours above which burnout risk is flagged.
    #[serde(default = "default_burnout_threshold_hours")]
    pub burnout_threshold_hours: f64,
}

fn default_buffer_minutes() -> i64 {
    15
}

fn default_max_daily_meetings() -> usize {
    8
}

fn default_max_consecutive_hours() -> f64 {
    4.0
}

fn default_burnout_threshold_hours() -> f64 {
    6.0
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            buffer_minutes: default_buffer_minutes(),
            max_daily_meetings: default_max_daily_meetings(),
            max_consecutive_hours: default_max_consecutive_hours(),
            burnout_threshold_hours: default_burnout_threshold_hours(),
        }
    }
}

/// The minimal slice of an event the detector needs, normalized to UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSpan {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl EventSpan {
    pub fn new(id: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            start,
            end,
        }
    }

    /// Build a span from a raw event document.
    ///
    /// Timestamps may be RFC 3339 text (`Z` or explicit offset) or numeric
    /// epoch seconds; both normalize to `DateTime<Utc>`. The id is read
    /// from `id` or `event_id`, whichever is present.
    pub fn from_document(doc: &Value) -> CalendorResult<Self> {
        let id = doc
            .get("id")
            .or_else(|| doc.get("event_id"))
            .and_then(Value::as_str)
            .ok_or_else(|| CalendorError::Conflict("event document missing id".into()))?;
        let start = parse_timestamp(doc.get("start").unwrap_or(&Value::Null))
            .ok_or_else(|| CalendorError::Conflict(format!("event {id} has invalid start")))?;
        let end = parse_timestamp(doc.get("end").unwrap_or(&Value::Null))
            .ok_or_else(|| CalendorError::Conflict(format!("event {id} has invalid end")))?;
        Ok(Self::new(id, start, end))
    }

    fn duration_hours(&self) -> f64 {
        (self.end - self.start).num_seconds() as f64 / 3600.0
    }
}

impl From<&CalendarEvent> for EventSpan {
    fn from(event: &CalendarEvent) -> Self {
        Self::new(event.event_id.clone(), event.start, event.end)
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => {
            // Accept a bare `Z` suffix as well as explicit offsets.
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        }
        Value::Number(n) => {
            if let Some(secs) = n.as_i64() {
                Utc.timestamp_opt(secs, 0).single()
            } else {
                let secs = n.as_f64()?;
                Utc.timestamp_opt(secs as i64, ((secs.fract()) * 1e9) as u32)
                    .single()
            }
        }
        _ => None,
    }
}

/// Stateless rule-based analyzer over an event sequence.
///
/// `detect` sorts the events by start time and runs four independent
/// sub-analyses over the sorted order; their results are concatenated, so
/// one pair or day can appear under several conflict kinds at once.
#[derive(Debug, Clone, Default)]
pub struct ConflictDetector {
    config: DetectorConfig,
}

impl ConflictDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    fn buffer(&self) -> Duration {
        Duration::minutes(self.config.buffer_minutes)
    }

    /// Detect all conflicts in the given events for one user.
    pub fn detect(&self, events: &[EventSpan], user_id: &str) -> Vec<ConflictRecord> {
        let mut sorted: Vec<EventSpan> = events.to_vec();
        sorted.sort_by_key(|e| e.start);

        let mut conflicts = Vec::new();
        conflicts.extend(self.detect_time_overlaps(&sorted, user_id));
        conflicts.extend(self.detect_overbooking(&sorted, user_id));
        conflicts.extend(self.detect_burnout_risk(&sorted, user_id));
        conflicts.extend(self.detect_insufficient_buffer(&sorted, user_id));

        tracing::debug!(
            user_id,
            event_count = events.len(),
            conflict_count = conflicts.len(),
            "conflict detection complete"
        );
        conflicts
    }

    /// Adjacent pairs whose earlier event ends after the later one starts.
    /// Transitive overlap chains are reported pairwise, not merged.
    fn detect_time_overlaps(&self, sorted: &[EventSpan], user_id: &str) -> Vec<ConflictRecord> {
        sorted
            .windows(2)
            .filter(|pair| pair[0].end > pair[1].start)
            .map(|pair| {
                let (current, next) = (&pair[0], &pair[1]);
                ConflictRecord::new(
                    format!("overlap_{}_{}", current.id, next.id),
                    user_id,
                    ConflictKind::TimeOverlap,
                    vec![current.id.clone(), next.id.clone()],
                    Severity::High,
                    Resolution::Reschedule {
                        options: vec![
                            RescheduleOption {
                                action: "move_second_event".into(),
                                new_start: Some(current.end + self.buffer()),
                                new_end: None,
                                reason: "Move second event to avoid overlap".into(),
                            },
                            RescheduleOption {
                                action: "shorten_first_event".into(),
                                new_start: None,
                                new_end: Some(next.start - self.buffer()),
                                reason: "Shorten first event to avoid overlap".into(),
                            },
                        ],
                    },
                )
            })
            .collect()
    }

    /// Days with strictly more events than the configured maximum.
    fn detect_overbooking(&self, sorted: &[EventSpan], user_id: &str) -> Vec<ConflictRecord> {
        group_by_day(sorted)
            .into_iter()
            .filter(|(_, day_events)| day_events.len() > self.config.max_daily_meetings)
            .map(|(date, day_events)| {
                ConflictRecord::new(
                    format!("overbook_{date}_{user_id}"),
                    user_id,
                    ConflictKind::Overbooked,
                    day_events.iter().map(|e| e.id.clone()).collect(),
                    Severity::Medium,
                    Resolution::Redistribute {
                        current_count: day_events.len(),
                        recommended_count: self.config.max_daily_meetings,
                        suggestion: "Consider moving some meetings to other days".into(),
                    },
                )
            })
            .collect()
    }

    /// Days whose total meeting hours, or longest consecutive run of
    /// meetings separated by at most 30 minutes, exceed the thresholds.
    fn detect_burnout_risk(&self, sorted: &[EventSpan], user_id: &str) -> Vec<ConflictRecord> {
        let mut conflicts = Vec::new();

        for (date, day_events) in group_by_day(sorted) {
            let mut total_hours = 0.0;
            let mut run_hours = 0.0;
            let mut max_run = 0.0f64;

            for (i, event) in day_events.iter().enumerate() {
                let duration = event.duration_hours();
                total_hours += duration;

                if i > 0 {
                    let gap = event.start - day_events[i - 1].end;
                    if gap <= Duration::minutes(30) {
                        run_hours += duration;
                    } else {
                        max_run = max_run.max(run_hours);
                        run_hours = duration;
                    }
                } else {
                    run_hours = duration;
                }
            }
            max_run = max_run.max(run_hours);

            if total_hours > self.config.burnout_threshold_hours
                || max_run > self.config.max_consecutive_hours
            {
                let severity = if total_hours > self.config.burnout_threshold_hours * 1.5 {
                    Severity::Critical
                } else {
                    Severity::High
                };
                conflicts.push(ConflictRecord::new(
                    format!("burnout_{date}_{user_id}"),
                    user_id,
                    ConflictKind::BurnoutRisk,
                    day_events.iter().map(|e| e.id.clone()).collect(),
                    severity,
                    Resolution::ScheduleBreaks {
                        total_hours,
                        max_consecutive: max_run,
                        recommendations: vec![
                            "Add 15-minute breaks between meetings".into(),
                            "Consider moving some meetings to other days".into(),
                            "Block time for focused work".into(),
                        ],
                    },
                ));
            }
        }

        conflicts
    }

    /// Adjacent pairs with a positive gap strictly below the buffer —
    /// not overlapping, just too close. A gap of exactly the buffer is fine.
    fn detect_insufficient_buffer(&self, sorted: &[EventSpan], user_id: &str) -> Vec<ConflictRecord> {
        let buffer = self.buffer();
        sorted
            .windows(2)
            .filter(|pair| {
                let gap = pair[1].start - pair[0].end;
                gap > Duration::zero() && gap < buffer
            })
            .map(|pair| {
                let (current, next) = (&pair[0], &pair[1]);
                let gap_minutes = (next.start - current.end).num_seconds() as f64 / 60.0;
                ConflictRecord::new(
                    format!("buffer_{}_{}", current.id, next.id),
                    user_id,
                    ConflictKind::InsufficientBuffer,
                    vec![current.id.clone(), next.id.clone()],
                    Severity::Low,
                    Resolution::AddBuffer {
                        current_gap_minutes: gap_minutes,
                        recommended_gap_minutes: self.config.buffer_minutes as f64,
                        suggestion: format!(
                            "Add {} minutes buffer between meetings",
                            self.config.buffer_minutes
                        ),
                    },
                )
            })
            .collect()
    }
}

/// Group events by the UTC date of their start time, preserving the sorted
/// order within each day.
fn group_by_day(sorted: &[EventSpan]) -> BTreeMap<NaiveDate, Vec<&EventSpan>> {
    let mut days: BTreeMap<NaiveDate, Vec<&EventSpan>> = BTreeMap::new();
    for event in sorted {
        days.entry(event.start.date_naive()).or_default().push(event);
    }
    days
}
