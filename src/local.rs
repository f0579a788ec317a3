//! Offline collaborators used when no OPENAI_API_KEY is configured.
//!
//! - `LocalRiddleBank` serves riddles from the built-in seeds plus any TOML entries.
//! - `KeywordClassifier` recognizes difficulty/topic requests with simple word rules.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::domain::{ConstraintKind, ConstraintUpdate, Riddle, RiddleSource};
use crate::error::ServiceError;
use crate::seeds::BankEntry;
use crate::services::{ClassifierReply, IntentClassifier, RiddleGenerator};

pub struct LocalRiddleBank {
  entries: Vec<BankEntry>,
  last: Mutex<Option<usize>>,
}

impl LocalRiddleBank {
  pub fn new(entries: Vec<BankEntry>) -> Self {
    Self { entries, last: Mutex::new(None) }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Indices matching the constraint. Free-form or unmatched constraints use the whole bank.
  fn candidates(&self, constraints: &str) -> Vec<usize> {
    let all: Vec<usize> = (0..self.entries.len()).collect();
    let Some(up) = ConstraintUpdate::parse(constraints) else { return all };
    let hits: Vec<usize> = all
      .iter()
      .copied()
      .filter(|&i| {
        let e = &self.entries[i];
        match up.kind {
          ConstraintKind::Difficulty => e.difficulty == up.value,
          ConstraintKind::Topic => e.topic == up.value,
        }
      })
      .collect();
    if hits.is_empty() {
      warn!(target: "riddle", %constraints, "No bank riddle matches constraint; serving from the whole bank");
      all
    } else {
      hits
    }
  }
}

#[async_trait]
impl RiddleGenerator for LocalRiddleBank {
  #[instrument(level = "debug", skip(self), fields(bank = self.entries.len()))]
  async fn generate(&self, constraints: &str) -> Result<Riddle, ServiceError> {
    let mut pool = self.candidates(constraints);
    if pool.is_empty() {
      return Err(ServiceError::Unexpected("local riddle bank is empty".into()));
    }

    let mut last = self.last.lock().map_err(|_| ServiceError::Unexpected("riddle bank lock poisoned".into()))?;
    if pool.len() > 1 {
      if let Some(prev) = *last {
        pool.retain(|&i| i != prev);
      }
    }
    let chosen = *pool
      .choose(&mut rand::thread_rng())
      .ok_or_else(|| ServiceError::Unexpected("no riddle candidates".into()))?;
    *last = Some(chosen);

    let e = &self.entries[chosen];
    debug!(target: "riddle", index = chosen, topic = %e.topic, difficulty = %e.difficulty, "Bank riddle chosen");
    Riddle::new(&e.riddle, &e.answer, &e.hint, RiddleSource::LocalBank)
  }

  fn name(&self) -> &'static str { "local_bank" }
}

const DIFFICULTY_WORDS: &[(&str, &str)] = &[
  ("harder", "hard"), ("hard", "hard"), ("difficult", "hard"), ("challenging", "hard"), ("tough", "hard"),
  ("easier", "easy"), ("easy", "easy"), ("simpler", "easy"), ("simple", "easy"),
  ("medium", "medium"), ("normal", "medium"), ("moderate", "medium"),
];

const GREETINGS: &[&str] = &["hi", "hello", "hey", "thanks", "thank you", "good morning", "good evening", "how are you"];

const TOPIC_MARKERS: &[&str] = &["about ", "topic ", "topic: ", "riddles on ", "related to "];

/// Words that can follow a topic marker without naming a topic ("tell me about yourself").
const NOT_A_TOPIC: &[&str] = &[
  "you", "yourself", "me", "myself", "it", "this", "that", "them", "us", "him", "her", "anything", "something",
];

const ARTICLES: &[&str] = &["a", "an", "the"];

const FILLERS: &[&str] = &["please", "thanks", "now", "instead"];

const SMALL_TALK: &[&str] = &["you", "yourself", "your"];

/// Word-rule classifier. Good enough for "make it harder" and "riddles about animals".
pub struct KeywordClassifier;

impl KeywordClassifier {
  fn reply(&self, message: &str) -> ClassifierReply {
    let lower = message.trim().to_lowercase();
    let words: Vec<&str> = lower
      .split(|c: char| !c.is_alphanumeric())
      .filter(|w| !w.is_empty())
      .collect();

    for marker in TOPIC_MARKERS {
      if let Some(pos) = lower.find(marker) {
        let mut topic: Vec<&str> = lower[pos + marker.len()..]
          .split(|c: char| !c.is_alphanumeric())
          .filter(|w| !w.is_empty())
          .skip_while(|w| ARTICLES.contains(w))
          .collect();
        while topic.last().is_some_and(|w| FILLERS.contains(w)) {
          topic.pop();
        }
        let rest = topic.join(" ");
        if topic.first().is_some_and(|w| !NOT_A_TOPIC.contains(w)) {
          return ClassifierReply {
            response: format!("Sure thing! The next riddle will be about {rest}."),
            intent: "topic".into(),
            value: Some(rest),
          };
        }
      }
    }

    // The last difficulty word is the request: "too hard, make it easier" means easy.
    let level = words
      .iter()
      .rev()
      .find_map(|w| DIFFICULTY_WORDS.iter().find(|(word, _)| word == w).map(|(_, level)| *level));
    if let Some(level) = level {
      return ClassifierReply {
        response: format!("Okay, I've set the difficulty to {level} for the next riddle!"),
        intent: "difficulty".into(),
        value: Some(level.to_string()),
      };
    }

    let joined = words.join(" ");
    let greeting = GREETINGS.iter().any(|g| joined == *g || joined.starts_with(&format!("{g} ")));
    if greeting || words.iter().any(|w| SMALL_TALK.contains(w)) {
      return ClassifierReply {
        response: "Hi! How can I help you customize your riddles today?".into(),
        intent: "chit_chat".into(),
        value: None,
      };
    }

    ClassifierReply {
      response: "Sorry, I can only help with changing riddle difficulty or topic.".into(),
      intent: "unknown".into(),
      value: None,
    }
  }
}

#[async_trait]
impl IntentClassifier for KeywordClassifier {
  #[instrument(level = "debug", skip(self, message), fields(message_len = message.len()))]
  async fn classify(&self, message: &str) -> Result<Option<ClassifierReply>, ServiceError> {
    Ok(Some(self.reply(message)))
  }

  fn name(&self) -> &'static str { "keyword" }
}
