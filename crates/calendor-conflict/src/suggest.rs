use crate::detector::DetectorConfig;
use crate::types::{ConflictKind, ConflictRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A free window that an event could move into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A single move suggestion for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOption {
    pub event_id: String,
    pub action: String,
    pub available_slots: Vec<TimeSlot>,
}

/// Kind-specific reschedule proposal built from a conflict plus the
/// caller's free slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RescheduleProposal {
    /// Move the later of two overlapping events into a free slot.
    RescheduleOptions { options: Vec<MoveOption> },
    /// Move the excess meetings of an overbooked day elsewhere.
    RedistributeMeetings {
        excess_count: usize,
        available_slots: Vec<TimeSlot>,
    },
    /// Break up a burnout-risk day and offer alternative slots.
    AddBreaksAndRedistribute {
        recommendations: Vec<String>,
        alternative_slots: Vec<TimeSlot>,
    },
}

/// Build a reschedule proposal for a conflict, dispatched on its kind.
///
/// Insufficient-buffer conflicts get no proposal; nudging events a few
/// minutes is left to the user.
pub fn suggest_reschedule(
    config: &DetectorConfig,
    conflict: &ConflictRecord,
    available_slots: &[TimeSlot],
) -> Option<RescheduleProposal> {
    match conflict.kind {
        ConflictKind::TimeOverlap => {
            let moved = conflict.affected_events.get(1)?;
            Some(RescheduleProposal::RescheduleOptions {
                options: vec![MoveOption {
                    event_id: moved.clone(),
                    action: "move".into(),
                    available_slots: available_slots.iter().take(3).cloned().collect(),
                }],
            })
        }
        ConflictKind::Overbooked => Some(RescheduleProposal::RedistributeMeetings {
            excess_count: conflict
                .affected_events
                .len()
                .saturating_sub(config.max_daily_meetings),
            available_slots: available_slots.to_vec(),
        }),
        ConflictKind::BurnoutRisk => Some(RescheduleProposal::AddBreaksAndRedistribute {
            recommendations: vec![
                "Add 15-minute breaks between consecutive meetings".into(),
                "Move some meetings to less busy days".into(),
                "Consider shorter meeting durations".into(),
            ],
            alternative_slots: available_slots.to_vec(),
        }),
        ConflictKind::InsufficientBuffer => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Resolution, Severity};
    use chrono::TimeZone;

    fn slot(h: u32) -> TimeSlot {
        TimeSlot {
            start: Utc.with_ymd_and_hms(2025, 6, 3, h, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 6, 3, h + 1, 0, 0).unwrap(),
        }
    }

    fn conflict(kind: ConflictKind, events: Vec<&str>) -> ConflictRecord {
        ConflictRecord::new(
            "c1".into(),
            "u1",
            kind,
            events.into_iter().map(String::from).collect(),
            Severity::High,
            Resolution::Reschedule { options: vec![] },
        )
    }

    #[test]
    fn test_overlap_takes_top_three_slots() {
        let slots: Vec<TimeSlot> = (9..14).map(slot).collect();
        let proposal = suggest_reschedule(
            &DetectorConfig::default(),
            &conflict(ConflictKind::TimeOverlap, vec!["a", "b"]),
            &slots,
        )
        .unwrap();
        match proposal {
            RescheduleProposal::RescheduleOptions { options } => {
                assert_eq!(options.len(), 1);
                assert_eq!(options[0].event_id, "b");
                assert_eq!(options[0].action, "move");
                assert_eq!(options[0].available_slots.len(), 3);
                assert_eq!(options[0].available_slots[0], slot(9));
            }
            other => panic!("unexpected proposal: {other:?}"),
        }
    }

    #[test]
    fn test_overbooked_reports_excess_count() {
        let events: Vec<String> = (0..10).map(|i| format!("e{i}")).collect();
        let refs: Vec<&str> = events.iter().map(String::as_str).collect();
        let proposal = suggest_reschedule(
            &DetectorConfig::default(),
            &conflict(ConflictKind::Overbooked, refs),
            &[slot(9)],
        )
        .unwrap();
        match proposal {
            RescheduleProposal::RedistributeMeetings {
                excess_count,
                available_slots,
            } => {
                assert_eq!(excess_count, 2);
                assert_eq!(available_slots.len(), 1);
            }
            other => panic!("unexpected proposal: {other:?}"),
        }
    }

    #[test]
    fn test_burnout_offers_breaks() {
        let proposal = suggest_reschedule(
            &DetectorConfig::default(),
            &conflict(ConflictKind::BurnoutRisk, vec!["a", "b"]),
            &[slot(9), slot(10)],
        )
        .unwrap();
        match proposal {
            RescheduleProposal::AddBreaksAndRedistribute {
                recommendations,
                alternative_slots,
            } => {
                assert_eq!(recommendations.len(), 3);
                assert_eq!(alternative_slots.len(), 2);
            }
            other => panic!("unexpected proposal: {other:?}"),
        }
    }

    #[test]
    fn test_buffer_conflicts_get_no_proposal() {
        let proposal = suggest_reschedule(
            &DetectorConfig::default(),
            &conflict(ConflictKind::InsufficientBuffer, vec!["a", "b"]),
            &[slot(9)],
        );
        assert!(proposal.is_none());
    }

    #[test]
    fn test_proposal_serde_tagging() {
        let proposal = RescheduleProposal::RedistributeMeetings {
            excess_count: 1,
            available_slots: vec![],
        };
        let json = serde_json::to_value(&proposal).unwrap();
        assert_eq!(json["type"], "redistribute_meetings");
        assert_eq!(json["excess_count"], 1);
    }
}
