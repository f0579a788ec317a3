//! Domain models used by the backend: riddles, chat turns, intents and constraints.

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Number of guesses a player gets for each riddle.
pub const MAX_TRIES: u8 = 3;

/// Where did the riddle come from?
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiddleSource {
  Generated, // produced by the model
  LocalBank, // built-in or TOML bank
}

/// One riddle as produced by a generator. Never patched; replaced wholesale.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Riddle {
  pub riddle: String,
  pub answer: String,
  pub hint: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source: Option<RiddleSource>,
}

impl Riddle {
  /// Build a riddle, rejecting blank fields (a generator must supply all three).
  pub fn new(
    riddle: impl Into<String>,
    answer: impl Into<String>,
    hint: impl Into<String>,
    source: RiddleSource,
  ) -> Result<Self, ServiceError> {
    let r = Self {
      riddle: riddle.into().trim().to_string(),
      answer: answer.into().trim().to_string(),
      hint: hint.into().trim().to_string(),
      source: Some(source),
    };
    let missing: Vec<&str> = [("riddle", &r.riddle), ("answer", &r.answer), ("hint", &r.hint)]
      .iter()
      .filter(|(_, v)| v.is_empty())
      .map(|(k, _)| *k)
      .collect();
    if !missing.is_empty() {
      return Err(ServiceError::Unexpected(format!("generator returned empty field(s): {}", missing.join(", "))));
    }
    Ok(r)
  }

  /// Case-insensitive, whitespace-trimmed exact comparison against the answer.
  pub fn is_correct(&self, guess: &str) -> bool {
    normalize_guess(guess) == normalize_guess(&self.answer)
  }
}

pub fn normalize_guess(s: &str) -> String {
  s.trim().to_lowercase()
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
  User,
  Bot,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
  pub role: ChatRole,
  pub content: String,
}

/// Classified purpose of a chat message.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
  Difficulty,
  Topic,
  ChitChat,
  Unknown,
}

impl Intent {
  /// Anything outside the four recognized labels collapses to `Unknown`. Labels match exactly.
  pub fn from_label(label: &str) -> Self {
    match label {
      "difficulty" => Intent::Difficulty,
      "topic" => Intent::Topic,
      "chit_chat" => Intent::ChitChat,
      _ => Intent::Unknown,
    }
  }
}

/// Which axis a constraint narrows.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
  Difficulty,
  Topic,
}

impl ConstraintKind {
  pub fn label(self) -> &'static str {
    match self {
      ConstraintKind::Difficulty => "difficulty",
      ConstraintKind::Topic => "topic",
    }
  }
}

/// A single "kind: value" directive, e.g. `difficulty: hard`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstraintUpdate {
  pub kind: ConstraintKind,
  pub value: String,
}

impl ConstraintUpdate {
  /// Renders the constraint string handed to the riddle generator.
  pub fn to_constraint_string(&self) -> String {
    format!("{}: {}", self.kind.label(), self.value)
  }

  /// Parse a `kind: value` constraint string. Free-form text yields None.
  pub fn parse(constraint: &str) -> Option<Self> {
    let (kind, value) = constraint.split_once(':')?;
    let kind = match kind.trim().to_ascii_lowercase().as_str() {
      "difficulty" => ConstraintKind::Difficulty,
      "topic" => ConstraintKind::Topic,
      _ => return None,
    };
    let value = value.trim().to_lowercase();
    if value.is_empty() {
      return None;
    }
    Some(Self { kind, value })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn guess_comparison_ignores_case_and_surrounding_space() {
    let r = Riddle::new("I have cities...", "A map", "I show places", RiddleSource::LocalBank).expect("riddle");
    assert!(r.is_correct(" a MAP "));
    assert!(r.is_correct("a map"));
    assert!(!r.is_correct("map"));
    assert!(!r.is_correct("a  map"));
  }

  #[test]
  fn blank_fields_are_rejected_as_unexpected() {
    let err = Riddle::new("What am I?", "  ", "", RiddleSource::Generated).unwrap_err();
    assert!(matches!(err, ServiceError::Unexpected(ref m) if m.contains("answer") && m.contains("hint")));
  }

  #[test]
  fn unrecognized_intent_labels_become_unknown() {
    assert_eq!(Intent::from_label("difficulty"), Intent::Difficulty);
    assert_eq!(Intent::from_label("topic"), Intent::Topic);
    assert_eq!(Intent::from_label("Topic"), Intent::Unknown);
    assert_eq!(Intent::from_label(" topic "), Intent::Unknown);
    assert_eq!(Intent::from_label("chit_chat"), Intent::ChitChat);
    assert_eq!(Intent::from_label("weather"), Intent::Unknown);
    assert_eq!(Intent::from_label(""), Intent::Unknown);
  }

  #[test]
  fn constraint_strings_parse_back() {
    let up = ConstraintUpdate { kind: ConstraintKind::Difficulty, value: "hard".into() };
    assert_eq!(up.to_constraint_string(), "difficulty: hard");
    assert_eq!(ConstraintUpdate::parse("Topic:  Animals"), Some(ConstraintUpdate { kind: ConstraintKind::Topic, value: "animals".into() }));
    assert_eq!(ConstraintUpdate::parse("something about space"), None);
    assert_eq!(ConstraintUpdate::parse("topic:"), None);
  }
}
