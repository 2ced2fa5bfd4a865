//! Jokes about calculations, generated by a remote language model.
//!
//! The calculator hands over the expression and its outcome; whatever
//! happens on the way to the model, the caller always gets some text back.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use llm::LLMProvider;
use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::ChatMessage;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinSet;

use crate::config::JokeConfig;

/// Shown in place of a joke when the fetch fails for any reason.
pub const APOLOGY: &str = "Oops! Something went wrong while fetching a joke.";

/// The outcome of a calculation as seen by the joke teller.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Value(f64),
    Failure(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => write!(f, "{}", crate::calculator::format_clipboard(*value)),
            Self::Failure(text) => f.write_str(text),
        }
    }
}

/// What a joke should be about.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JokeRequest {
    pub expression: String,
    pub result: Outcome,
}

impl JokeRequest {
    pub fn new(expression: impl Into<String>, result: Outcome) -> Self {
        Self {
            expression: expression.into(),
            result,
        }
    }

    /// Build the natural-language prompt sent to the model.
    pub fn prompt(&self) -> String {
        format!(
            "You are inside a calculator which tells a joke on every calculation. \
             Tell the joke based on the result of the calculation. \
             Only output the joke and only one joke. \
             This time the calculation expression is {} and the result is {}. \
             You need to make the joke based on that calculation expression and result.",
            self.expression, self.result
        )
    }
}

#[derive(Debug, Error)]
pub enum JokeError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("failed to set up the language model: {0}")]
    Setup(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("request timed out after {0}s")]
    Timeout(u64),
    #[error("the model returned no text")]
    EmptyResponse,
}

/// Anything that can come up with a joke for a calculation.
pub trait JokeSource: Send + Sync {
    fn fetch(&self, request: &JokeRequest)
    -> impl Future<Output = Result<String, JokeError>> + Send;
}

/// Fetch a joke, substituting [`APOLOGY`] on any failure.
pub async fn tell<S: JokeSource>(source: &S, request: &JokeRequest) -> String {
    match source.fetch(request).await {
        Ok(joke) => joke,
        Err(e) => {
            tracing::warn!(expression = %request.expression, "Failed to fetch joke: {}", e);
            APOLOGY.to_string()
        }
    }
}

/// Joke fetches running in the background.
///
/// Fetches are neither de-duplicated nor cancelled; each one finishes in its
/// own time and results arrive in whatever order they complete.
#[derive(Default)]
pub struct JokeTasks {
    set: JoinSet<()>,
}

impl JokeTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.set.spawn(task);
        self.reap();
    }

    /// Drop the handles of tasks that have already finished.
    pub fn reap(&mut self) {
        while let Some(result) = self.set.try_join_next() {
            if let Err(e) = result {
                tracing::warn!("Joke task failed: {}", e);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Wait for outstanding tasks, giving up after `timeout`.
    ///
    /// Returns how many tasks were still running and got aborted.
    pub async fn drain(&mut self, timeout: Duration) -> usize {
        let finished = tokio::time::timeout(timeout, async {
            while let Some(result) = self.set.join_next().await {
                if let Err(e) = result {
                    tracing::warn!("Joke task failed: {}", e);
                }
            }
        })
        .await;

        if finished.is_ok() {
            return 0;
        }

        let abandoned = self.set.len();
        tracing::warn!(abandoned, "Gave up waiting for jokes");
        self.set.abort_all();
        abandoned
    }
}

/// Jokes from Google's generative language API.
pub struct GeminiJokes {
    provider: Box<dyn LLMProvider>,
    timeout_secs: u64,
}

impl GeminiJokes {
    pub fn new(config: &JokeConfig, api_key: &str) -> Result<Self, JokeError> {
        if api_key.trim().is_empty() {
            return Err(JokeError::MissingApiKey);
        }

        let provider = LLMBuilder::new()
            .backend(LLMBackend::Google)
            .api_key(api_key)
            .model(&config.model)
            .build()
            .map_err(|e| JokeError::Setup(e.to_string()))?;

        tracing::debug!(model = %config.model, "Joke source ready");

        Ok(Self {
            provider,
            timeout_secs: config.timeout_secs,
        })
    }
}

impl JokeSource for GeminiJokes {
    async fn fetch(&self, request: &JokeRequest) -> Result<String, JokeError> {
        let messages = vec![ChatMessage::user().content(request.prompt()).build()];

        let response = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            self.provider.chat(&messages),
        )
        .await
        .map_err(|_| JokeError::Timeout(self.timeout_secs))?
        .map_err(|e| JokeError::Request(e.to_string()))?;

        response
            .text()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(JokeError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(Option<&'static str>);

    impl JokeSource for Canned {
        async fn fetch(&self, _request: &JokeRequest) -> Result<String, JokeError> {
            self.0
                .map(str::to_string)
                .ok_or_else(|| JokeError::Request("connection refused".to_string()))
        }
    }

    #[test]
    fn test_prompt_mentions_expression_and_value() {
        let request = JokeRequest::new("2*3", Outcome::Value(6.0));
        let prompt = request.prompt();
        assert!(prompt.contains("expression is 2*3"));
        assert!(prompt.contains("result is 6."));
        assert!(prompt.contains("only one joke"));
    }

    #[test]
    fn test_prompt_mentions_failure() {
        let request = JokeRequest::new("5/0", Outcome::Failure("Error: division by zero".into()));
        assert!(
            request
                .prompt()
                .contains("result is Error: division by zero")
        );
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::Value(2.5).to_string(), "2.5");
        assert_eq!(Outcome::Value(-4.0).to_string(), "-4");
        assert_eq!(Outcome::Failure("Error".into()).to_string(), "Error");
    }

    #[test]
    fn test_request_serializes_plain_result() {
        let json = serde_json::to_value(JokeRequest::new("1+1", Outcome::Value(2.0))).unwrap();
        assert_eq!(json["expression"], "1+1");
        assert_eq!(json["result"], 2.0);
    }

    #[tokio::test]
    async fn test_tell_passes_joke_through() {
        let request = JokeRequest::new("1+1", Outcome::Value(2.0));
        let joke = tell(&Canned(Some("Two is company.")), &request).await;
        assert_eq!(joke, "Two is company.");
    }

    #[tokio::test]
    async fn test_tell_swallows_failures() {
        let request = JokeRequest::new("1+1", Outcome::Value(2.0));
        let joke = tell(&Canned(None), &request).await;
        assert_eq!(joke, APOLOGY);
    }

    #[tokio::test]
    async fn test_drain_waits_for_running_fetches() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let told = Arc::new(AtomicUsize::new(0));
        let mut tasks = JokeTasks::new();
        for _ in 0..3 {
            let told = Arc::clone(&told);
            tasks.spawn(async move {
                let request = JokeRequest::new("2+2", Outcome::Value(4.0));
                tokio::time::sleep(Duration::from_millis(20)).await;
                tell(&Canned(Some("Four!")), &request).await;
                told.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(tasks.drain(Duration::from_secs(5)).await, 0);
        assert_eq!(told.load(Ordering::SeqCst), 3);
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn test_drain_gives_up_after_timeout() {
        let mut tasks = JokeTasks::new();
        tasks.spawn(std::future::pending());
        assert_eq!(tasks.len(), 1);

        assert_eq!(tasks.drain(Duration::from_millis(20)).await, 1);
    }

    #[tokio::test]
    async fn test_spawn_reaps_finished_tasks() {
        let mut tasks = JokeTasks::new();
        tasks.spawn(async {});
        tokio::time::sleep(Duration::from_millis(20)).await;
        tasks.spawn(std::future::pending());
        assert_eq!(tasks.len(), 1);
        tasks.drain(Duration::from_millis(1)).await;
    }

    #[test]
    fn test_gemini_requires_api_key() {
        let config = JokeConfig::default();
        assert!(matches!(
            GeminiJokes::new(&config, "  "),
            Err(JokeError::MissingApiKey)
        ));
    }
}
