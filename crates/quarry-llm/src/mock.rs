//! Scripted generation provider for deterministic tests
//!
//! Replies are matched by prompt substring. Each script is a queue; the last
//! reply in a queue is sticky so a script never runs dry.

use async_trait::async_trait;
use quarry_domain::{Capability, GenerateOptions, GeneratedText, GenerationService, ServiceError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// One scripted reply
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this text
    Text(String),

    /// Fail with this error
    Error(ServiceError),

    /// Wait, then return this text
    Delayed(Duration, String),
}

impl MockReply {
    /// Shorthand for a text reply
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }
}

/// A call observed by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Prompt sent
    pub prompt: String,

    /// Whether strict structured mode was requested
    pub strict: bool,

    /// Output units requested
    pub max_output_units: u32,

    /// Capability level requested
    pub capability: Capability,
}

/// Mock generation provider
///
/// # Examples
///
/// ```
/// use quarry_llm::{MockProvider, MockReply};
/// use quarry_domain::{GenerateOptions, GenerationService, ServiceError};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let provider = MockProvider::new("{}");
/// provider.script("ASSESS", vec![
///     MockReply::Error(ServiceError::RateLimited),
///     MockReply::text(r#"{"confidence_score": 80}"#),
/// ]);
///
/// let options = || GenerateOptions::strict(100, Duration::from_secs(1));
/// assert!(provider.generate("ASSESS this", options()).await.is_err());
/// assert!(provider.generate("ASSESS this", options()).await.is_ok());
/// assert_eq!(provider.generate("other", options()).await.unwrap().text, "{}");
/// assert_eq!(provider.call_count(), 3);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_reply: MockReply,
    scripts: Arc<Mutex<Vec<(String, VecDeque<MockReply>)>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockProvider {
    /// Create a provider with a fixed text reply for unmatched prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self::with_default(MockReply::Text(response.into()))
    }

    /// Create a provider with an arbitrary default reply
    pub fn with_default(reply: MockReply) -> Self {
        Self {
            default_reply: reply,
            scripts: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Script replies for prompts containing `marker`
    ///
    /// Scripts are checked in registration order; the first match wins.
    pub fn script(&self, marker: impl Into<String>, replies: Vec<MockReply>) {
        if replies.is_empty() {
            return;
        }
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((marker.into(), replies.into()));
    }

    /// Number of generate calls so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Calls observed so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Forget recorded calls
    pub fn reset_call_count(&self) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn next_reply(&self, prompt: &str) -> MockReply {
        let mut scripts = self.scripts.lock().unwrap_or_else(PoisonError::into_inner);
        for (marker, queue) in scripts.iter_mut() {
            if !prompt.contains(marker.as_str()) {
                continue;
            }
            if queue.len() > 1 {
                if let Some(reply) = queue.pop_front() {
                    return reply;
                }
            }
            if let Some(reply) = queue.front() {
                return reply.clone();
            }
        }
        self.default_reply.clone()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("{}")
    }
}

#[async_trait]
impl GenerationService for MockProvider {
    async fn generate(
        &self,
        prompt: &str,
        options: GenerateOptions,
    ) -> Result<GeneratedText, ServiceError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                prompt: prompt.to_string(),
                strict: options.strict_structured_mode,
                max_output_units: options.max_output_units,
                capability: options.capability,
            });

        match self.next_reply(prompt) {
            MockReply::Text(text) => Ok(GeneratedText::new(text)),
            MockReply::Error(error) => Err(error),
            MockReply::Delayed(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(GeneratedText::new(text))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> GenerateOptions {
        GenerateOptions::strict(100, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_mock_provider_default() {
        let provider = MockProvider::new("Test response");
        let result = provider.generate("any prompt", options()).await;
        assert_eq!(result.unwrap().text, "Test response");
    }

    #[tokio::test]
    async fn test_last_scripted_reply_is_sticky() {
        let provider = MockProvider::default();
        provider.script("hello", vec![MockReply::text("one"), MockReply::text("two")]);

        assert_eq!(provider.generate("hello", options()).await.unwrap().text, "one");
        assert_eq!(provider.generate("hello", options()).await.unwrap().text, "two");
        assert_eq!(provider.generate("hello", options()).await.unwrap().text, "two");
    }

    #[tokio::test]
    async fn test_first_matching_script_wins() {
        let provider = MockProvider::default();
        provider.script("alpha", vec![MockReply::text("A")]);
        provider.script("alp", vec![MockReply::text("B")]);

        assert_eq!(provider.generate("alpha beta", options()).await.unwrap().text, "A");
        assert_eq!(provider.generate("alp only", options()).await.unwrap().text, "B");
    }

    #[tokio::test]
    async fn test_mock_provider_records_options() {
        let provider = MockProvider::default();
        let mut opts = options();
        opts.strict_structured_mode = false;
        opts.max_output_units = 4242;
        opts.capability = Capability::Premium;

        provider.generate("p", opts).await.unwrap();

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].strict);
        assert_eq!(calls[0].max_output_units, 4242);
        assert_eq!(calls[0].capability, Capability::Premium);

        provider.reset_call_count();
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_provider_error() {
        let provider = MockProvider::default();
        provider.script("bad prompt", vec![MockReply::Error(ServiceError::Unauthorized("key".into()))]);

        let result = provider.generate("bad prompt", options()).await;
        assert!(matches!(result, Err(ServiceError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_mock_provider_clone_shares_state() {
        let provider1 = MockProvider::new("test");
        let provider2 = provider1.clone();

        provider1.generate("test", options()).await.unwrap();

        // Both should share the same call log due to Arc
        assert_eq!(provider1.call_count(), 1);
        assert_eq!(provider2.call_count(), 1);
    }
}
