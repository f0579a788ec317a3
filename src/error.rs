//! Error taxonomy for the two model-backed collaborators and for refused session commands.
//!
//! Classification happens once, where the service is called. Everything downstream
//! matches on the variant and never re-parses error text.

use serde::Serialize;
use thiserror::Error;

/// Failure of a riddle-generation or intent-classification call.
/// All variants are recoverable: the session stays usable and the action can be retried.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
  /// Service-side capacity problem (HTTP 503, "model is overloaded").
  #[error("service overloaded: {0}")]
  Overloaded(String),
  /// The service could not be reached (connect failure, timeout).
  #[error("service unreachable: {0}")]
  Connectivity(String),
  /// Anything else, including malformed or empty responses.
  #[error("unexpected service failure: {0}")]
  Unexpected(String),
}

/// Wire label for a `ServiceError` variant.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  Overloaded,
  Connectivity,
  Unexpected,
}

impl ServiceError {
  /// Classify an error that only exists as text (e.g. a relayed upstream message).
  pub fn from_message(message: impl Into<String>) -> Self {
    let message = message.into();
    let lower = message.to_lowercase();
    if lower.contains("503") || lower.contains("overloaded") {
      ServiceError::Overloaded(message)
    } else if lower.contains("fetch") {
      ServiceError::Connectivity(message)
    } else {
      ServiceError::Unexpected(message)
    }
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      ServiceError::Overloaded(_) => ErrorKind::Overloaded,
      ServiceError::Connectivity(_) => ErrorKind::Connectivity,
      ServiceError::Unexpected(_) => ErrorKind::Unexpected,
    }
  }

  /// Text shown to the player when a riddle could not be produced.
  pub fn riddle_message(&self) -> &'static str {
    match self {
      ServiceError::Overloaded(_) => "Oops! Our riddle generator is very popular right now and seems to be overloaded. Please try again in a moment.",
      ServiceError::Connectivity(_) => "We couldn't reach the riddle generator. Check your connection and try again.",
      ServiceError::Unexpected(_) => "Something unexpected went wrong while making a riddle. Please try again.",
    }
  }

  /// Bot apology appended to the chat when classification fails.
  pub fn chat_apology(&self) -> &'static str {
    match self {
      ServiceError::Overloaded(_) => "Sorry, I'm a little overloaded right now. Please try again in a moment.",
      ServiceError::Connectivity(_) => "Sorry, I can't reach my brain right now. Please check your connection and try again.",
      ServiceError::Unexpected(_) => "Sorry, I encountered an error. Please try again.",
    }
  }
}

impl From<reqwest::Error> for ServiceError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_connect() || e.is_timeout() || e.is_request() {
      ServiceError::Connectivity(e.to_string())
    } else if e.status().map(|s| s.as_u16()) == Some(503) {
      ServiceError::Overloaded(e.to_string())
    } else {
      ServiceError::Unexpected(e.to_string())
    }
  }
}

/// Why a session command was refused. State is untouched when one of these is returned.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum Rejection {
  #[error("a riddle is being fetched")]
  Fetching,
  #[error("no riddle is loaded")]
  NoRiddle,
  #[error("this round is over; ask for a new riddle")]
  RoundOver,
  #[error("the assistant is still answering")]
  ChatBusy,
  #[error("message cannot be empty")]
  EmptyMessage,
  #[error("please enter an answer")]
  EmptyGuess,
  #[error("too many riddle requests in flight; wait for one to finish")]
  TooManyFetches,
}
