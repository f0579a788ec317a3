//! Per-connection game: wires the riddle session, chat assistant and constraint store.
//!
//! A `GameSession` is driven by one task (the WebSocket loop). Client commands and
//! finished service calls are handled one at a time; each returns the messages to send.
//! Service calls run on spawned tasks and come back as `Completion`s through the channel
//! returned by `GameSession::new`.

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::chat::{ChatAssistant, Classification};
use crate::constraints::{ConstraintStore, ConstraintSubscription};
use crate::domain::Riddle;
use crate::error::{Rejection, ServiceError};
use crate::logic::{classify_message, fetch_riddle};
use crate::protocol::{to_out, ClientWsMessage, ErrorOut, GuessResult, ServerWsMessage, SnapshotOut};
use crate::session::{FetchResolution, FetchTicket, GuessOutcome, Phase, RiddleSession};
use crate::state::Services;

/// Riddle calls one connection may have running at once. Replacements past this are refused.
pub const MAX_OUTSTANDING_FETCHES: usize = 4;

/// A service call that finished on a background task.
#[derive(Debug)]
pub enum Completion {
  Riddle { ticket: FetchTicket, result: Result<Riddle, ServiceError> },
  Chat { result: Classification },
}

pub struct GameSession {
  pub id: Uuid,
  services: Services,
  riddle: RiddleSession,
  chat: ChatAssistant,
  constraints: ConstraintStore,
  subscription: ConstraintSubscription,
  tx: UnboundedSender<Completion>,
  /// Spawned riddle calls whose completion has not been handled yet, superseded ones included.
  outstanding_fetches: usize,
}

impl GameSession {
  pub fn new(services: Services) -> (Self, UnboundedReceiver<Completion>) {
    let (tx, rx) = unbounded_channel();
    let constraints = ConstraintStore::new();
    let subscription = constraints.subscribe();
    let game = Self {
      id: Uuid::new_v4(),
      services,
      riddle: RiddleSession::new(),
      chat: ChatAssistant::new(),
      constraints,
      subscription,
      tx,
      outstanding_fetches: 0,
    };
    (game, rx)
  }

  /// Greeting plus the initial, unconstrained riddle fetch.
  #[instrument(level = "info", skip(self), fields(session = %self.id))]
  pub fn start(&mut self) -> Vec<ServerWsMessage> {
    let mut out: Vec<ServerWsMessage> = self.chat.transcript().iter().map(ServerWsMessage::chat).collect();
    let ticket = self.riddle.initialize("");
    out.push(ServerWsMessage::Loading { initial: true });
    self.spawn_fetch(ticket);
    out
  }

  #[instrument(level = "debug", skip(self), fields(session = %self.id))]
  pub fn handle_client(&mut self, msg: ClientWsMessage) -> Vec<ServerWsMessage> {
    match msg {
      ClientWsMessage::Ping => vec![ServerWsMessage::Pong],

      ClientWsMessage::NewRiddle { constraints } => {
        let constraint = constraints
          .map(|c| c.trim().to_string())
          .or_else(|| self.constraints.get())
          .unwrap_or_default();
        if self.outstanding_fetches >= MAX_OUTSTANDING_FETCHES {
          warn!(target: "riddle", session = %self.id, outstanding = self.outstanding_fetches, "New riddle refused: too many fetches in flight");
          return vec![ServerWsMessage::rejected(Rejection::TooManyFetches)];
        }
        let initial = !self.riddle.is_initialized();
        let ticket = if initial {
          self.riddle.initialize(&constraint)
        } else {
          self.riddle.request_new_riddle(&constraint)
        };
        info!(target: "riddle", session = %self.id, seq = ticket.seq, %constraint, "New riddle requested");
        self.spawn_fetch(ticket);
        vec![ServerWsMessage::Loading { initial }]
      }

      ClientWsMessage::SubmitGuess { guess } => match self.riddle.submit_guess(&guess) {
        Ok(outcome) => {
          let msg = match outcome {
            GuessOutcome::Correct => ServerWsMessage::GuessResult {
              result: GuessResult::Correct,
              tries_remaining: self.tries_remaining(),
              answer: None,
            },
            GuessOutcome::Incorrect { tries_remaining } => ServerWsMessage::GuessResult {
              result: GuessResult::Incorrect,
              tries_remaining,
              answer: None,
            },
            GuessOutcome::Exhausted { answer } => ServerWsMessage::GuessResult {
              result: GuessResult::Exhausted,
              tries_remaining: 0,
              answer: Some(answer),
            },
          };
          info!(target: "riddle", session = %self.id, phase = ?self.riddle.phase(), "Guess evaluated");
          vec![msg]
        }
        Err(r) => vec![ServerWsMessage::rejected(r)],
      },

      ClientWsMessage::Hint => match self.riddle.request_hint() {
        Ok(text) => vec![ServerWsMessage::Hint { text: text.to_string() }],
        Err(r) => vec![ServerWsMessage::rejected(r)],
      },

      ClientWsMessage::ChatMessage { text } => match self.chat.submit(&text) {
        Ok(turn) => {
          self.spawn_classify(turn.content.clone());
          vec![ServerWsMessage::chat(&turn)]
        }
        Err(r) => vec![ServerWsMessage::rejected(r)],
      },

      ClientWsMessage::State => vec![ServerWsMessage::Snapshot { snapshot: self.snapshot() }],
    }
  }

  #[instrument(level = "debug", skip(self, completion), fields(session = %self.id))]
  pub fn handle_completion(&mut self, completion: Completion) -> Vec<ServerWsMessage> {
    match completion {
      Completion::Riddle { ticket, result } => {
        self.outstanding_fetches = self.outstanding_fetches.saturating_sub(1);
        match self.riddle.complete_fetch(&ticket, result) {
          FetchResolution::Accepted => self.current_riddle().into_iter().collect(),
          FetchResolution::Superseded => Vec::new(),
          FetchResolution::Failed { error, retained } => {
            let mut out = vec![ServerWsMessage::riddle_error(&error, retained)];
            // Put the untouched previous riddle back on screen.
            out.extend(self.current_riddle());
            out
          }
        }
      }

      Completion::Chat { result } => {
        let (bot, update) = self.chat.resolve(result, &self.constraints);
        let mut out = vec![ServerWsMessage::chat(&bot)];
        if let Some(up) = update {
          out.push(ServerWsMessage::ConstraintUpdated {
            kind: up.kind,
            value: up.value.clone(),
            constraint: up.to_constraint_string(),
          });
        }
        self.pump_constraints(&mut out);
        out
      }
    }
  }

  /// Deliver pending constraint-store notifications to the riddle session.
  fn pump_constraints(&mut self, out: &mut Vec<ServerWsMessage>) {
    while let Some(constraint) = self.subscription.try_next() {
      if let Some(ticket) = self.riddle.on_constraint_changed(&constraint) {
        info!(target: "riddle", session = %self.id, seq = ticket.seq, %constraint, "Constraint changed; fetching replacement riddle");
        out.push(ServerWsMessage::Loading { initial: false });
        self.spawn_fetch(ticket);
      }
    }
  }

  fn current_riddle(&self) -> Option<ServerWsMessage> {
    self.riddle.round().map(|r| ServerWsMessage::Riddle { riddle: to_out(r) })
  }

  fn tries_remaining(&self) -> u8 {
    self.riddle.round().map(|r| r.tries_remaining).unwrap_or(0)
  }

  pub fn snapshot(&self) -> SnapshotOut {
    let round = self.riddle.round();
    SnapshotOut {
      phase: self.riddle.phase(),
      fetching: self.riddle.is_fetching(),
      riddle: round.map(to_out),
      answer: round
        .filter(|_| self.riddle.phase() == Phase::Lost)
        .map(|r| r.riddle.answer.clone()),
      constraint: self.constraints.get(),
      error: self.riddle.last_error().map(|e| ErrorOut { error: e.kind(), message: e.riddle_message().to_string() }),
      chat_busy: self.chat.is_busy(),
      transcript: self.chat.transcript().to_vec(),
    }
  }

  fn spawn_fetch(&mut self, ticket: FetchTicket) {
    self.outstanding_fetches += 1;
    if self.outstanding_fetches > 1 {
      debug!(target: "riddle", session = %self.id, outstanding = self.outstanding_fetches, "Riddle fetches overlapping");
    }
    let services = self.services.clone();
    let tx = self.tx.clone();
    tokio::spawn(async move {
      let result = fetch_riddle(&services, &ticket.constraint).await;
      if tx.send(Completion::Riddle { ticket, result }).is_err() {
        debug!(target: "riddle", "Connection closed before riddle fetch finished");
      }
    });
  }

  fn spawn_classify(&self, text: String) {
    let services = self.services.clone();
    let tx = self.tx.clone();
    tokio::spawn(async move {
      let result = classify_message(&services, &text).await;
      if tx.send(Completion::Chat { result }).is_err() {
        debug!(target: "chat", "Connection closed before classification finished");
      }
    });
  }
}
