//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Fetching a riddle from the configured generator under a time budget
//!   - Classifying a chat message and normalizing the result (never fails)

use std::time::Instant;

use tracing::{info, instrument, warn};

use crate::chat::Classification;
use crate::domain::Riddle;
use crate::error::ServiceError;
use crate::state::Services;
use crate::util::trunc_for_log;

/// One riddle for `constraints`. Timeouts are reported as `Connectivity`.
#[instrument(level = "info", skip(services), fields(generator = services.riddles.name()))]
pub async fn fetch_riddle(services: &Services, constraints: &str) -> Result<Riddle, ServiceError> {
  let start = Instant::now();
  let result = match tokio::time::timeout(services.timeout, services.riddles.generate(constraints)).await {
    Ok(r) => r,
    Err(_) => Err(ServiceError::Connectivity(format!(
      "riddle generation timed out after {}s",
      services.timeout.as_secs()
    ))),
  };
  let elapsed = start.elapsed();
  match &result {
    Ok(r) => info!(target: "riddle", ?elapsed, source = ?r.source, preview = %trunc_for_log(&r.riddle, 40), "Riddle fetched"),
    Err(e) => warn!(target: "riddle", ?elapsed, kind = ?e.kind(), error = %e, "Riddle fetch failed"),
  }
  result
}

/// Classify `message`. Service failures are folded into a fallback classification.
#[instrument(level = "info", skip(services, message), fields(classifier = services.intents.name(), message_len = message.len()))]
pub async fn classify_message(services: &Services, message: &str) -> Classification {
  let raw = match tokio::time::timeout(services.timeout, services.intents.classify(message)).await {
    Ok(r) => r,
    Err(_) => Err(ServiceError::Connectivity(format!(
      "intent classification timed out after {}s",
      services.timeout.as_secs()
    ))),
  };
  let c = Classification::from_service(raw);
  info!(target: "chat", intent = ?c.intent, has_value = c.value.is_some(), "Message classified");
  c
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Intent, RiddleSource};
  use crate::services::{ClassifierReply, IntentClassifier, RiddleGenerator};
  use async_trait::async_trait;
  use std::sync::Arc;
  use std::time::Duration;

  struct Slow;

  #[async_trait]
  impl RiddleGenerator for Slow {
    async fn generate(&self, _c: &str) -> Result<Riddle, ServiceError> {
      tokio::time::sleep(Duration::from_secs(60)).await;
      Riddle::new("r", "a", "h", RiddleSource::Generated)
    }
    fn name(&self) -> &'static str { "slow" }
  }

  #[async_trait]
  impl IntentClassifier for Slow {
    async fn classify(&self, _m: &str) -> Result<Option<ClassifierReply>, ServiceError> {
      tokio::time::sleep(Duration::from_secs(60)).await;
      Ok(None)
    }
    fn name(&self) -> &'static str { "slow" }
  }

  fn slow_services() -> Services {
    Services { riddles: Arc::new(Slow), intents: Arc::new(Slow), timeout: Duration::from_millis(20) }
  }

  #[tokio::test]
  async fn riddle_timeout_is_connectivity() {
    let err = fetch_riddle(&slow_services(), "").await.unwrap_err();
    assert!(matches!(err, ServiceError::Connectivity(ref m) if m.contains("timed out")));
  }

  #[tokio::test]
  async fn classification_timeout_falls_back() {
    let c = classify_message(&slow_services(), "make it harder").await;
    assert_eq!(c.intent, Intent::Unknown);
    assert_eq!(c.response, ServiceError::Connectivity(String::new()).chat_apology());
  }
}
