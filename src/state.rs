//! Application state: the configured collaborators and limits.
//!
//! This module owns:
//!   - the riddle generator (OpenAI when OPENAI_API_KEY is set, local bank otherwise)
//!   - the intent classifier (OpenAI or keyword rules, same switch)
//!   - the per-call time budget
//!
//! Game state is not here: each WebSocket connection owns its own `GameSession`.

use std::{sync::Arc, time::Duration};
use tracing::{info, instrument};

use crate::config::{load_agent_config_from_env, AgentConfig};
use crate::local::{KeywordClassifier, LocalRiddleBank};
use crate::openai::OpenAI;
use crate::seeds::{seed_riddles, BankEntry};
use crate::services::{IntentClassifier, RiddleGenerator};

/// Collaborators handed to service calls. Cheap to clone into spawned tasks.
#[derive(Clone)]
pub struct Services {
    pub riddles: Arc<dyn RiddleGenerator>,
    pub intents: Arc<dyn IntentClassifier>,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
}

impl AppState {
    /// Build state from env: load config, build the local bank, init OpenAI if possible.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_agent_config_from_env().unwrap_or_default();
        Self::from_config(cfg, OpenAI::from_env)
    }

    fn from_config(
        cfg: AgentConfig,
        openai: impl FnOnce(crate::config::Prompts, Duration) -> Option<OpenAI>,
    ) -> Self {
        let timeout = Duration::from_secs(cfg.limits.service_timeout_secs.max(1));

        // Config riddles first, then the built-in seeds.
        let mut bank: Vec<BankEntry> = cfg.riddles.iter().map(BankEntry::from).collect();
        let from_config = bank.len();
        bank.extend(seed_riddles());

        let services = match openai(cfg.prompts.clone(), timeout) {
            Some(oa) => {
                info!(target: "riddle_backend", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
                let oa = Arc::new(oa);
                Services { riddles: oa.clone(), intents: oa, timeout }
            }
            None => {
                let bank = LocalRiddleBank::new(bank);
                info!(target: "riddle_backend", riddles = bank.len(), from_config, "OpenAI disabled (no OPENAI_API_KEY). Using local riddle bank and keyword classifier.");
                Services {
                    riddles: Arc::new(bank),
                    intents: Arc::new(KeywordClassifier),
                    timeout,
                }
            }
        };
        info!(target: "riddle_backend", timeout_secs = timeout.as_secs(), "Service time budget");

        Self { services }
    }

    #[cfg(test)]
    pub fn with_services(services: Services) -> Self {
        Self { services }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_agent_config;

    #[tokio::test]
    async fn without_openai_uses_local_collaborators() {
        let cfg = parse_agent_config(
            r#"
[limits]
service_timeout_secs = 7

[[riddles]]
riddle = "What has keys but can't open locks?"
answer = "A piano"
hint = "It makes music."
topic = "music"
"#,
        )
        .expect("parse");
        let state = AppState::from_config(cfg, |_, _| None);
        assert_eq!(state.services.riddles.name(), "local_bank");
        assert_eq!(state.services.intents.name(), "keyword");
        assert_eq!(state.services.timeout, Duration::from_secs(7));

        let r = state.services.riddles.generate("topic: music").await.expect("riddle");
        assert_eq!(r.answer, "A piano");
    }
}
