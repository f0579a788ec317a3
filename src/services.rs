//! Seams for the two external collaborators.
//!
//! `AppState` holds one implementation of each: the OpenAI-backed ones when an API key is
//! configured, the local bank/keyword ones otherwise. Tests plug in scripted fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::Riddle;
use crate::error::ServiceError;

/// Produces one riddle for a constraint string (empty = unconstrained).
#[async_trait]
pub trait RiddleGenerator: Send + Sync {
  async fn generate(&self, constraints: &str) -> Result<Riddle, ServiceError>;

  fn name(&self) -> &'static str;
}

/// Raw classifier output before normalization: `intent` is whatever label the service chose.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassifierReply {
  pub response: String,
  pub intent: String,
  #[serde(default)]
  pub value: Option<String>,
}

/// Classifies a chat message. `Ok(None)` means the service answered with nothing usable.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
  async fn classify(&self, message: &str) -> Result<Option<ClassifierReply>, ServiceError>;

  fn name(&self) -> &'static str;
}
