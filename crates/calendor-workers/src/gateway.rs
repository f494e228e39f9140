//! External capability seams: the mail provider and the summarizer.
//!
//! Real integrations live behind these traits; the crate ships only stub
//! implementations for embedded and test use.

use crate::templates::FALLBACK_SUMMARY;
use async_trait::async_trait;
use calendor_core::{CalendorResult, MailMessage};

/// Access to the user's mailbox.
#[async_trait]
pub trait MailGateway: Send + Sync {
    /// Fetch up to `limit` unread messages.
    async fn fetch_unread(&self, limit: usize) -> CalendorResult<Vec<MailMessage>>;

    /// Send a message, returning whether the provider accepted it.
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        thread_ref: &str,
    ) -> CalendorResult<bool>;
}

/// Free-text generation used for meeting preparation notes.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn generate(&self, prompt: &str) -> CalendorResult<String>;
}

/// Ask the summarizer with up to three attempts, falling back to the
/// deterministic template text when all of them fail.
pub async fn summarize_with_retry(summarizer: &dyn Summarizer, prompt: &str) -> String {
    for attempt in 1..=3 {
        match summarizer.generate(prompt).await {
            Ok(summary) => return summary,
            Err(error) => {
                tracing::warn!(attempt, %error, "summarizer attempt failed");
            }
        }
    }
    FALLBACK_SUMMARY.to_string()
}

/// Gateway with no mailbox behind it. Fetches nothing and accepts every
/// send; used when running without a provider.
pub struct StubMailGateway;

#[async_trait]
impl MailGateway for StubMailGateway {
    async fn fetch_unread(&self, _limit: usize) -> CalendorResult<Vec<MailMessage>> {
        Ok(Vec::new())
    }

    async fn send(
        &self,
        to: &str,
        subject: &str,
        _body: &str,
        _thread_ref: &str,
    ) -> CalendorResult<bool> {
        tracing::info!(to, subject, "stub gateway accepted message");
        Ok(true)
    }
}
