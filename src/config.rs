//! Loading agent configuration (prompts, limits, optional riddle bank) from TOML.
//!
//! See `AgentConfig` and `Prompts` for expected schema.

use serde::Deserialize;
use tracing::{info, error};

/// Default per-call budget for model requests (seconds).
pub const DEFAULT_SERVICE_TIMEOUT_SECS: u64 = 20;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub limits: Limits,
  #[serde(default)]
  pub riddles: Vec<RiddleCfg>,
}

/// Riddle entry accepted in TOML configuration. Added to the local bank.
#[derive(Clone, Debug, Deserialize)]
pub struct RiddleCfg {
  pub riddle: String,
  pub answer: String,
  pub hint: String,
  #[serde(default)] pub difficulty: Option<String>,
  #[serde(default)] pub topic: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Limits {
  #[serde(default = "default_timeout")]
  pub service_timeout_secs: u64,
}

fn default_timeout() -> u64 { DEFAULT_SERVICE_TIMEOUT_SECS }

impl Default for Limits {
  fn default() -> Self {
    Self { service_timeout_secs: DEFAULT_SERVICE_TIMEOUT_SECS }
  }
}

/// Prompts used by the OpenAI client. `{constraints}` and `{message}` are substituted.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub riddle_system: String,
  pub riddle_user_template: String,
  pub intent_system: String,
  pub intent_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      riddle_system: "You are a master riddle generator. Respond ONLY with strict JSON.".into(),
      riddle_user_template: "Generate a single, engaging riddle with its answer and a helpful hint.\n\
Constraints: {constraints}\n\
- If a difficulty (easy, medium, hard) is given, match it. 'easy' suits children; 'hard' should be challenging. Default to medium.\n\
- If a topic is given, the riddle MUST be about that topic.\n\
- The answer should be short (a word or short phrase). The hint must not give the answer away.\n\
Return JSON with fields: riddle, answer, hint.".into(),
      intent_system: "You are a friendly assistant for a riddle game. You help players change riddle difficulty or topic. Respond ONLY with strict JSON.".into(),
      intent_user_template: "User message: \"{message}\"\n\
Return JSON {\"response\": string, \"intent\": \"difficulty\"|\"topic\"|\"chit_chat\"|\"unknown\", \"value\": string (optional)}.\n\
- Difficulty change: intent \"difficulty\", value one of easy, medium, hard.\n\
- Topic request: intent \"topic\", value the topic in lowercase.\n\
- Greetings or small talk: intent \"chit_chat\" with a friendly response.\n\
- Anything else: intent \"unknown\"; say you can only change difficulty or topic.".into(),
    }
  }
}

/// Text used when the generator is called without constraints.
pub const NO_CONSTRAINTS: &str = "None provided (generate a general riddle of medium difficulty).";

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_agent_config(&s) {
      Ok(cfg) => {
        info!(target: "riddle_backend", %path, riddles = cfg.riddles.len(), "Loaded agent config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "riddle_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "riddle_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_agent_config(s: &str) -> Result<AgentConfig, toml::de::Error> {
  toml::from_str::<AgentConfig>(s)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_document_uses_defaults() {
    let cfg = parse_agent_config("").expect("parse");
    assert_eq!(cfg.limits.service_timeout_secs, DEFAULT_SERVICE_TIMEOUT_SECS);
    assert!(cfg.riddles.is_empty());
    assert!(cfg.prompts.riddle_user_template.contains("{constraints}"));
    assert!(cfg.prompts.intent_user_template.contains("{message}"));
  }

  #[test]
  fn partial_prompts_keep_remaining_defaults() {
    let cfg = parse_agent_config(
      r#"
[prompts]
riddle_system = "Be terse."

[limits]
service_timeout_secs = 5

[[riddles]]
riddle = "What has keys but can't open locks?"
answer = "A piano"
hint = "It makes music."
topic = "music"
"#,
    )
    .expect("parse");
    assert_eq!(cfg.prompts.riddle_system, "Be terse.");
    assert_eq!(cfg.prompts.intent_system, Prompts::default().intent_system);
    assert_eq!(cfg.limits.service_timeout_secs, 5);
    assert_eq!(cfg.riddles.len(), 1);
    assert_eq!(cfg.riddles[0].topic.as_deref(), Some("music"));
    assert_eq!(cfg.riddles[0].difficulty, None);
  }
}
