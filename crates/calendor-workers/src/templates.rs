//! Deterministic reply templates, keyed by message category.

use calendor_core::MailCategory;

/// Summary text used when the summarizer cannot produce one.
pub const FALLBACK_SUMMARY: &str = "Main topic and agenda not available. Please review the \
    meeting details and prepare questions or discussion points relevant to the agenda.";

/// Build the reply draft for a message, parameterized by its subject.
pub fn draft_reply(category: MailCategory, subject: &str) -> String {
    match category {
        MailCategory::Meeting => format!(
            "Thank you for your email regarding '{subject}'. I have reviewed the meeting \
             details and will check my calendar availability. I'll get back to you shortly \
             with my response."
        ),
        MailCategory::Task => format!(
            "Thank you for your email regarding '{subject}'. I have noted the task \
             requirements and will review them carefully. I'll provide an update on the \
             timeline and next steps soon."
        ),
        MailCategory::Question => format!(
            "Thank you for your email regarding '{subject}'. I have received your questions \
             and will provide the requested information as soon as possible."
        ),
        MailCategory::Complaint => format!(
            "Thank you for bringing this matter to my attention regarding '{subject}'. I \
             understand your concerns and will investigate this issue promptly. I'll follow \
             up with you once I have more information."
        ),
        MailCategory::Information => format!(
            "Thank you for your email regarding '{subject}'. I have received your message \
             and will review it carefully. I'll get back to you soon with a response."
        ),
    }
}
