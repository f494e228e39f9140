//! Keyword classifier for incoming mail.
//!
//! Ordered membership rules over the lowercased subject and body; within
//! each dimension the first matching rule wins. Classification never
//! fails — every input gets a sentiment, a priority, and a category.

use calendor_core::{MailCategory, MailContext, MailMessage, MailPriority, Sentiment};

const NEGATIVE_WORDS: &[&str] = &["urgent", "asap", "immediately", "critical"];
const POSITIVE_WORDS: &[&str] = &["thank", "great", "excellent", "congratulations"];

const URGENT_WORDS: &[&str] = &["urgent", "asap", "critical", "emergency"];
const HIGH_WORDS: &[&str] = &["important", "priority", "deadline"];
const LOW_WORDS: &[&str] = &["fyi", "info", "update"];

const MEETING_WORDS: &[&str] = &["meeting", "call", "schedule", "appointment"];
const TASK_WORDS: &[&str] = &["task", "todo", "action", "complete"];
const QUESTION_WORDS: &[&str] = &["question", "?", "help", "clarify"];
const COMPLAINT_WORDS: &[&str] = &["complaint", "issue", "problem", "error"];

fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|word| text.contains(word))
}

pub fn classify_sentiment(text: &str) -> Sentiment {
    if contains_any(text, NEGATIVE_WORDS) {
        Sentiment::Negative
    } else if contains_any(text, POSITIVE_WORDS) {
        Sentiment::Positive
    } else {
        Sentiment::Neutral
    }
}

pub fn classify_priority(text: &str) -> MailPriority {
    if contains_any(text, URGENT_WORDS) {
        MailPriority::Urgent
    } else if contains_any(text, HIGH_WORDS) {
        MailPriority::High
    } else if contains_any(text, LOW_WORDS) {
        MailPriority::Low
    } else {
        MailPriority::Medium
    }
}

pub fn classify_category(text: &str) -> MailCategory {
    if contains_any(text, MEETING_WORDS) {
        MailCategory::Meeting
    } else if contains_any(text, TASK_WORDS) {
        MailCategory::Task
    } else if contains_any(text, QUESTION_WORDS) {
        MailCategory::Question
    } else if contains_any(text, COMPLAINT_WORDS) {
        MailCategory::Complaint
    } else {
        MailCategory::Information
    }
}

fn suggested_actions(category: MailCategory) -> Vec<String> {
    let actions: &[&str] = match category {
        MailCategory::Meeting => &["Check calendar availability", "Confirm meeting details"],
        MailCategory::Task => &["Review task requirements", "Set completion timeline"],
        MailCategory::Question => &["Provide requested information", "Answer questions"],
        MailCategory::Complaint | MailCategory::Information => {
            &["Review and respond if necessary"]
        }
    };
    actions.iter().map(ToString::to_string).collect()
}

/// Derive the full structured context for a message.
pub fn classify_message(message: &MailMessage) -> MailContext {
    let text = format!("{} {}", message.subject, message.body).to_lowercase();
    let category = classify_category(&text);
    MailContext {
        message_id: message.message_id.clone(),
        sentiment: classify_sentiment(&text),
        priority: classify_priority(&text),
        category,
        key_points: vec![message.snippet.clone()],
        suggested_actions: suggested_actions(category),
    }
}
