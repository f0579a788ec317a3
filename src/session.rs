//! Riddle session: the one-riddle-at-a-time state machine behind a connected player.
//!
//! States: `Loading` (first fetch or replacement in flight), `Failed` (no riddle and the
//! last fetch failed), `Active`, `Won`, `Lost`.
//!
//! Fetches are split into `begin_fetch` / `complete_fetch` so the async call can run
//! elsewhere. Every fetch gets a ticket from a monotonic counter; only the newest ticket's
//! completion is applied (last-wins), older completions are discarded. A failed
//! replacement leaves the previous round exactly as it was.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{Riddle, MAX_TRIES};
use crate::error::{Rejection, ServiceError};

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
  Pending,
  Correct,
  Exhausted,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  Loading,
  Failed,
  Active,
  Won,
  Lost,
}

/// One displayed riddle and its guess budget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Round {
  pub riddle: Riddle,
  pub tries_remaining: u8,
  pub outcome: Outcome,
}

impl Round {
  fn fresh(riddle: Riddle) -> Self {
    Self { riddle, tries_remaining: MAX_TRIES, outcome: Outcome::Pending }
  }

  fn playable(&self) -> bool {
    self.outcome == Outcome::Pending && self.tries_remaining > 0
  }
}

/// Result of a guess that was accepted for evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuessOutcome {
  Correct,
  /// Wrong, but tries remain. Reported once; not stored.
  Incorrect { tries_remaining: u8 },
  /// Wrong and out of tries; the answer is revealed.
  Exhausted { answer: String },
}

/// Identifies one fetch. Hand it back to `complete_fetch`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchTicket {
  pub seq: u64,
  pub constraint: String,
}

/// What `complete_fetch` did with a result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchResolution {
  /// New riddle is in play with a full guess budget.
  Accepted,
  /// A newer fetch was started after this one; result ignored.
  Superseded,
  /// The fetch failed. `retained` is true when the previous round is still in play.
  Failed { error: ServiceError, retained: bool },
}

#[derive(Debug, Default)]
pub struct RiddleSession {
  round: Option<Round>,
  in_flight: Option<FetchTicket>,
  last_error: Option<ServiceError>,
  next_seq: u64,
  initialized: bool,
  last_constraint: Option<String>,
}

impl RiddleSession {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn phase(&self) -> Phase {
    if self.in_flight.is_some() {
      return Phase::Loading;
    }
    match &self.round {
      None if self.last_error.is_some() => Phase::Failed,
      None => Phase::Loading,
      Some(r) => match r.outcome {
        Outcome::Pending => Phase::Active,
        Outcome::Correct => Phase::Won,
        Outcome::Exhausted => Phase::Lost,
      },
    }
  }

  pub fn round(&self) -> Option<&Round> {
    self.round.as_ref()
  }

  pub fn is_fetching(&self) -> bool {
    self.in_flight.is_some()
  }

  /// True once a first riddle has been accepted.
  pub fn is_initialized(&self) -> bool {
    self.initialized
  }

  pub fn last_error(&self) -> Option<&ServiceError> {
    self.last_error.as_ref()
  }

  /// Start the very first fetch. Also used to retry after a failed first fetch.
  pub fn initialize(&mut self, constraint: &str) -> FetchTicket {
    self.begin_fetch(constraint)
  }

  /// Start a replacement fetch. Supersedes any fetch already in flight.
  pub fn request_new_riddle(&mut self, constraint: &str) -> FetchTicket {
    self.begin_fetch(constraint)
  }

  /// Notification from the constraint store. Returns a ticket when a fetch should start:
  /// never before the first riddle is in, and never twice for the same value.
  pub fn on_constraint_changed(&mut self, constraint: &str) -> Option<FetchTicket> {
    if !self.initialized {
      debug!(target: "riddle", %constraint, "Constraint change ignored: session not initialized");
      return None;
    }
    if self.last_constraint.as_deref() == Some(constraint) {
      debug!(target: "riddle", %constraint, "Constraint change ignored: already applied");
      return None;
    }
    Some(self.begin_fetch(constraint))
  }

  fn begin_fetch(&mut self, constraint: &str) -> FetchTicket {
    self.next_seq += 1;
    let ticket = FetchTicket { seq: self.next_seq, constraint: constraint.to_string() };
    if let Some(prev) = self.in_flight.replace(ticket.clone()) {
      debug!(target: "riddle", superseded = prev.seq, by = ticket.seq, "Fetch superseded");
    }
    self.last_constraint = Some(ticket.constraint.clone());
    ticket
  }

  /// Apply a finished fetch. Only the newest outstanding ticket is honored.
  pub fn complete_fetch(&mut self, ticket: &FetchTicket, result: Result<Riddle, ServiceError>) -> FetchResolution {
    if self.in_flight.as_ref().map(|t| t.seq) != Some(ticket.seq) {
      debug!(target: "riddle", seq = ticket.seq, "Stale fetch result discarded");
      return FetchResolution::Superseded;
    }
    self.in_flight = None;

    match result {
      Ok(riddle) => {
        self.round = Some(Round::fresh(riddle));
        self.last_error = None;
        self.initialized = true;
        info!(target: "riddle", seq = ticket.seq, constraint = %ticket.constraint, "New riddle in play");
        FetchResolution::Accepted
      }
      Err(error) => {
        let retained = self.round.is_some();
        if !retained {
          self.last_error = Some(error.clone());
        }
        warn!(target: "riddle", seq = ticket.seq, kind = ?error.kind(), error = %error, retained, "Riddle fetch failed");
        FetchResolution::Failed { error, retained }
      }
    }
  }

  /// Check a guess. Refused (state untouched) while fetching, once the round is over,
  /// or when the guess is blank.
  pub fn submit_guess(&mut self, guess: &str) -> Result<GuessOutcome, Rejection> {
    if self.in_flight.is_some() {
      return Err(Rejection::Fetching);
    }
    let round = self.round.as_mut().ok_or(Rejection::NoRiddle)?;
    if !round.playable() {
      return Err(Rejection::RoundOver);
    }
    if guess.trim().is_empty() {
      return Err(Rejection::EmptyGuess);
    }

    if round.riddle.is_correct(guess) {
      round.outcome = Outcome::Correct;
      return Ok(GuessOutcome::Correct);
    }

    round.tries_remaining -= 1;
    if round.tries_remaining == 0 {
      round.outcome = Outcome::Exhausted;
      Ok(GuessOutcome::Exhausted { answer: round.riddle.answer.clone() })
    } else {
      Ok(GuessOutcome::Incorrect { tries_remaining: round.tries_remaining })
    }
  }

  /// Read the hint. Never costs a try.
  pub fn request_hint(&self) -> Result<&str, Rejection> {
    if self.in_flight.is_some() {
      return Err(Rejection::Fetching);
    }
    let round = self.round.as_ref().ok_or(Rejection::NoRiddle)?;
    if !round.playable() {
      return Err(Rejection::RoundOver);
    }
    Ok(&round.riddle.hint)
  }
}
