//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::chat::Classification;
use crate::domain::{ChatRole, ChatTurn, ConstraintKind, Intent, Riddle, RiddleSource, MAX_TRIES};
use crate::error::{ErrorKind, Rejection, ServiceError};
use crate::session::{Phase, Round};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    /// `constraints` absent: use the session's current constraint.
    NewRiddle {
        #[serde(default)]
        constraints: Option<String>,
    },
    SubmitGuess {
        guess: String,
    },
    Hint,
    ChatMessage {
        text: String,
    },
    State,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GuessResult {
    Correct,
    Incorrect,
    Exhausted,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Loading {
        initial: bool,
    },
    Riddle {
        riddle: RiddleOut,
    },
    GuessResult {
        result: GuessResult,
        tries_remaining: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        answer: Option<String>,
    },
    Hint {
        text: String,
    },
    RiddleError {
        kind: ErrorKind,
        message: String,
        retained: bool,
    },
    ChatTurn {
        role: ChatRole,
        content: String,
    },
    ConstraintUpdated {
        kind: ConstraintKind,
        value: String,
        constraint: String,
    },
    Rejected {
        reason: String,
    },
    Snapshot {
        snapshot: SnapshotOut,
    },
    Error {
        message: String,
    },
}

impl ServerWsMessage {
    pub fn chat(turn: &ChatTurn) -> Self {
        ServerWsMessage::ChatTurn { role: turn.role, content: turn.content.clone() }
    }

    pub fn rejected(r: Rejection) -> Self {
        ServerWsMessage::Rejected { reason: r.to_string() }
    }

    pub fn riddle_error(e: &ServiceError, retained: bool) -> Self {
        ServerWsMessage::RiddleError { kind: e.kind(), message: e.riddle_message().to_string(), retained }
    }
}

/// Riddle as shown to a player mid-round: the answer stays on the server.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RiddleOut {
    pub riddle: String,
    pub tries_remaining: u8,
    pub max_tries: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<RiddleSource>,
}

pub fn to_out(r: &Round) -> RiddleOut {
    RiddleOut {
        riddle: r.riddle.riddle.clone(),
        tries_remaining: r.tries_remaining,
        max_tries: MAX_TRIES,
        source: r.riddle.source,
    }
}

/// Full view of one connection's game, sent in reply to `state`.
#[derive(Debug, Serialize, PartialEq)]
pub struct SnapshotOut {
    pub phase: Phase,
    pub fetching: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub riddle: Option<RiddleOut>,
    /// Revealed only once the round is lost.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorOut>,
    pub chat_busy: bool,
    pub transcript: Vec<ChatTurn>,
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct RiddleQuery {
    #[serde(default)]
    pub constraints: Option<String>,
}

/// Stateless generation result; includes the answer.
#[derive(Debug, Serialize)]
pub struct GeneratedRiddleOut {
    pub riddle: String,
    pub answer: String,
    pub hint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<RiddleSource>,
}

impl From<Riddle> for GeneratedRiddleOut {
    fn from(r: Riddle) -> Self {
        Self { riddle: r.riddle, answer: r.answer, hint: r.hint, source: r.source }
    }
}

#[derive(Deserialize)]
pub struct ChatIn {
    pub message: String,
}

#[derive(Serialize)]
pub struct ChatOut {
    pub response: String,
    pub intent: Intent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Constraint string the intent maps to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
}

impl From<Classification> for ChatOut {
    fn from(c: Classification) -> Self {
        let constraint = c.constraint_update().map(|u| u.to_constraint_string());
        Self { response: c.response, intent: c.intent, value: c.value, constraint }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ErrorOut {
    pub error: ErrorKind,
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
