//! Chat assistant: transcript bookkeeping and intent-to-constraint mapping.
//!
//! One message may be in flight at a time. The user turn is appended on submit, the bot
//! turn once classification resolves (success or fallback). Difficulty and topic intents
//! with a value are written to the constraint store.

use serde::Serialize;
use tracing::{info, warn};

use crate::constraints::ConstraintStore;
use crate::domain::{ChatRole, ChatTurn, ConstraintKind, ConstraintUpdate, Intent};
use crate::error::{Rejection, ServiceError};
use crate::seeds::GREETING;
use crate::services::ClassifierReply;

/// Normalized classification result.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Classification {
  pub response: String,
  pub intent: Intent,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub value: Option<String>,
}

impl Classification {
  /// Post-process whatever the classifier produced. Failures and empty answers become
  /// a local `Unknown` result carrying an apology.
  pub fn from_service(result: Result<Option<ClassifierReply>, ServiceError>) -> Self {
    match result {
      Ok(Some(reply)) => {
        let intent = Intent::from_label(&reply.intent);
        let value = reply.value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self { response: reply.response, intent, value }
      }
      Ok(None) => {
        warn!(target: "chat", "Classifier returned no result; using fallback");
        Self::fallback(&ServiceError::Unexpected("empty classification".into()))
      }
      Err(e) => {
        warn!(target: "chat", kind = ?e.kind(), error = %e, "Classifier failed; using fallback");
        Self::fallback(&e)
      }
    }
  }

  fn fallback(e: &ServiceError) -> Self {
    Self { response: e.chat_apology().to_string(), intent: Intent::Unknown, value: None }
  }

  /// The constraint this classification asks for, if any.
  pub fn constraint_update(&self) -> Option<ConstraintUpdate> {
    let kind = match self.intent {
      Intent::Difficulty => ConstraintKind::Difficulty,
      Intent::Topic => ConstraintKind::Topic,
      Intent::ChitChat | Intent::Unknown => return None,
    };
    let value = self.value.clone()?;
    Some(ConstraintUpdate { kind, value })
  }
}

#[derive(Debug)]
pub struct ChatAssistant {
  transcript: Vec<ChatTurn>,
  awaiting_reply: bool,
}

impl Default for ChatAssistant {
  fn default() -> Self {
    Self::new()
  }
}

impl ChatAssistant {
  /// New assistant with the greeting already in the transcript.
  pub fn new() -> Self {
    Self {
      transcript: vec![ChatTurn { role: ChatRole::Bot, content: GREETING.into() }],
      awaiting_reply: false,
    }
  }

  pub fn transcript(&self) -> &[ChatTurn] {
    &self.transcript
  }

  pub fn is_busy(&self) -> bool {
    self.awaiting_reply
  }

  /// Accept a user message for classification. Appends the user turn.
  pub fn submit(&mut self, text: &str) -> Result<ChatTurn, Rejection> {
    if self.awaiting_reply {
      return Err(Rejection::ChatBusy);
    }
    let text = text.trim();
    if text.is_empty() {
      return Err(Rejection::EmptyMessage);
    }
    let turn = ChatTurn { role: ChatRole::User, content: text.to_string() };
    self.transcript.push(turn.clone());
    self.awaiting_reply = true;
    Ok(turn)
  }

  /// Record the classifier's answer: append the bot turn and, for difficulty/topic
  /// intents, write the new constraint. Returns the bot turn and the applied update.
  pub fn resolve(&mut self, result: Classification, store: &ConstraintStore) -> (ChatTurn, Option<ConstraintUpdate>) {
    self.awaiting_reply = false;
    let bot = ChatTurn { role: ChatRole::Bot, content: result.response.clone() };
    self.transcript.push(bot.clone());

    let update = result.constraint_update();
    if let Some(up) = &update {
      let constraint = up.to_constraint_string();
      info!(target: "chat", kind = up.kind.label(), value = %up.value, "Constraint requested via chat");
      store.set(constraint);
    }
    (bot, update)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn reply(intent: &str, value: Option<&str>) -> Result<Option<ClassifierReply>, ServiceError> {
    Ok(Some(ClassifierReply {
      response: format!("ok {intent}"),
      intent: intent.into(),
      value: value.map(str::to_string),
    }))
  }

  #[test]
  fn unknown_labels_are_forced_to_unknown() {
    let c = Classification::from_service(reply("set_mood", Some("happy")));
    assert_eq!(c.intent, Intent::Unknown);
    assert_eq!(c.constraint_update(), None);
  }

  #[test]
  fn failures_become_distinct_apologies() {
    let over = Classification::from_service(Err(ServiceError::Overloaded("503".into())));
    let generic = Classification::from_service(Err(ServiceError::Unexpected("boom".into())));
    let empty = Classification::from_service(Ok(None));
    for c in [&over, &generic, &empty] {
      assert_eq!(c.intent, Intent::Unknown);
      assert_eq!(c.value, None);
    }
    assert_ne!(over.response, generic.response);
    assert_eq!(generic.response, empty.response);
  }

  #[test]
  fn difficulty_intent_writes_constraint() {
    let store = ConstraintStore::new();
    let mut chat = ChatAssistant::new();
    chat.submit("make it harder").expect("submit");
    let (bot, update) = chat.resolve(Classification::from_service(reply("difficulty", Some("hard"))), &store);
    assert_eq!(bot.role, ChatRole::Bot);
    assert_eq!(update.map(|u| u.to_constraint_string()).as_deref(), Some("difficulty: hard"));
    assert_eq!(store.get().as_deref(), Some("difficulty: hard"));
  }

  #[test]
  fn topic_without_value_and_chit_chat_leave_store_alone() {
    let store = ConstraintStore::new();
    let mut chat = ChatAssistant::new();

    chat.submit("a topic please").expect("submit");
    let (_, update) = chat.resolve(Classification::from_service(reply("topic", Some("  "))), &store);
    assert_eq!(update, None);

    chat.submit("hello").expect("submit");
    let (_, update) = chat.resolve(Classification::from_service(reply("chit_chat", None)), &store);
    assert_eq!(update, None);
    assert_eq!(store.get(), None);
  }

  #[test]
  fn transcript_order_and_busy_gate() {
    let store = ConstraintStore::new();
    let mut chat = ChatAssistant::new();
    assert_eq!(chat.submit("   "), Err(Rejection::EmptyMessage));
    chat.submit("first").expect("submit");
    assert!(chat.is_busy());
    assert_eq!(chat.submit("second"), Err(Rejection::ChatBusy));
    chat.resolve(Classification::from_service(reply("topic", Some("animals"))), &store);
    assert!(!chat.is_busy());

    let roles: Vec<(ChatRole, &str)> = chat.transcript().iter().map(|t| (t.role, t.content.as_str())).collect();
    assert_eq!(roles, vec![
      (ChatRole::Bot, GREETING),
      (ChatRole::User, "first"),
      (ChatRole::Bot, "ok topic"),
    ]);
  }
}
