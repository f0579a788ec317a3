//! Minimal OpenAI client for our use-cases.
//!
//! We only call chat.completions and request a strict JSON object back.
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//! Every failure is classified into `ServiceError` here, once.
//!
//! NOTE: We never log the API key or riddle answers.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::{Prompts, NO_CONSTRAINTS};
use crate::domain::{Riddle, RiddleSource};
use crate::error::ServiceError;
use crate::services::{ClassifierReply, IntentClassifier, RiddleGenerator};
use crate::util::{fill_template, trunc_for_log};

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub prompts: Prompts,
}

#[derive(Deserialize)]
struct Gen {
  #[serde(default)] riddle: String,
  #[serde(default)] answer: String,
  #[serde(default)] hint: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env(prompts: Prompts, timeout: Duration) -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model =
      std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());

    match Self::new(api_key, base_url, model, prompts, timeout) {
      Ok(oa) => Some(oa),
      Err(e) => {
        error!(target: "riddle_backend", error = %e, "Failed to build HTTP client; OpenAI disabled");
        None
      }
    }
  }

  pub fn new(
    api_key: String,
    base_url: String,
    model: String,
    prompts: Prompts,
    timeout: Duration,
  ) -> Result<Self, reqwest::Error> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string(), model, prompts })
  }

  /// JSON-object chat completion. Returns the raw message text (possibly empty).
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model))]
  async fn chat_json_text(&self, system: &str, user: &str, temperature: f32) -> Result<String, ServiceError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "riddle-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      return Err(classify_http_failure(status, &msg));
    }

    let body: ChatCompletionResponse = res
      .json()
      .await
      .map_err(|e| ServiceError::Unexpected(format!("invalid completion body: {e}")))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    Ok(body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default()
      .trim()
      .to_string())
  }
}

/// Map a non-2xx completion response onto the taxonomy.
fn classify_http_failure(status: StatusCode, msg: &str) -> ServiceError {
  let detail = format!("OpenAI HTTP {}: {}", status, trunc_for_log(msg, 200));
  if status == StatusCode::SERVICE_UNAVAILABLE {
    ServiceError::Overloaded(detail)
  } else {
    ServiceError::from_message(detail)
  }
}

#[async_trait]
impl RiddleGenerator for OpenAI {
  #[instrument(level = "info", skip(self, constraints), fields(constraints_len = constraints.len(), model = %self.model))]
  async fn generate(&self, constraints: &str) -> Result<Riddle, ServiceError> {
    let constraints = if constraints.trim().is_empty() { NO_CONSTRAINTS } else { constraints.trim() };
    let user = fill_template(&self.prompts.riddle_user_template, &[("constraints", constraints)]);
    let start = Instant::now();
    let result = self.chat_json_text(&self.prompts.riddle_system, &user, 0.9).await;
    let elapsed = start.elapsed();

    let text = match result {
      Ok(t) => t,
      Err(e) => {
        error!(?elapsed, error = %e, "Model call failed during riddle generation");
        return Err(e);
      }
    };
    if text.is_empty() {
      return Err(ServiceError::Unexpected("model returned an empty riddle".into()));
    }
    let gen: Gen = serde_json::from_str(&text)
      .map_err(|e| ServiceError::Unexpected(format!("riddle JSON parse error: {e}")))?;
    let riddle = Riddle::new(gen.riddle, gen.answer, gen.hint, RiddleSource::Generated)?;

    info!(
      ?elapsed,
      riddle_preview = %trunc_for_log(&riddle.riddle, 40),
      "Riddle successfully generated"
    );
    Ok(riddle)
  }

  fn name(&self) -> &'static str { "openai" }
}

#[async_trait]
impl IntentClassifier for OpenAI {
  #[instrument(level = "info", skip(self, message), fields(message_len = message.len(), model = %self.model))]
  async fn classify(&self, message: &str) -> Result<Option<ClassifierReply>, ServiceError> {
    let user = fill_template(&self.prompts.intent_user_template, &[("message", message)]);
    let text = self.chat_json_text(&self.prompts.intent_system, &user, 0.2).await?;
    if text.is_empty() {
      return Ok(None);
    }
    let reply: ClassifierReply = serde_json::from_str(&text)
      .map_err(|e| ServiceError::Unexpected(format!("intent JSON parse error: {e}")))?;
    Ok(Some(reply))
  }

  fn name(&self) -> &'static str { "openai" }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use wiremock::matchers::{header, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn client_for(base_url: String) -> OpenAI {
    OpenAI::new("test-key".into(), base_url, "test-model".into(), Prompts::default(), Duration::from_secs(5))
      .expect("client")
  }

  fn completion(content: &str) -> serde_json::Value {
    json!({
      "choices": [{ "message": { "content": content } }],
      "usage": { "prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30 }
    })
  }

  #[tokio::test]
  async fn generates_riddle_from_json_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .and(header("authorization", "Bearer test-key"))
      .respond_with(ResponseTemplate::new(200).set_body_json(completion(
        r#"{"riddle":"What has hands but can't clap?","answer":"A clock","hint":"Tick tock."}"#,
      )))
      .mount(&server)
      .await;

    let r = client_for(server.uri()).generate("topic: time").await.expect("riddle");
    assert_eq!(r.answer, "A clock");
    assert_eq!(r.source, Some(RiddleSource::Generated));
  }

  #[tokio::test]
  async fn http_503_is_overloaded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "error": { "message": "busy" } })))
      .mount(&server)
      .await;

    let err = client_for(server.uri()).generate("").await.unwrap_err();
    assert!(matches!(err, ServiceError::Overloaded(_)), "got {err:?}");
  }

  #[tokio::test]
  async fn overloaded_body_is_overloaded_even_without_503() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": { "message": "The model is overloaded." } })))
      .mount(&server)
      .await;

    let err = client_for(server.uri()).classify("hi").await.unwrap_err();
    assert!(matches!(err, ServiceError::Overloaded(_)), "got {err:?}");
  }

  #[tokio::test]
  async fn other_statuses_and_bad_json_are_unexpected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
      .mount(&server)
      .await;
    let err = client_for(server.uri()).generate("").await.unwrap_err();
    assert!(matches!(err, ServiceError::Unexpected(_)), "got {err:?}");

    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(200).set_body_json(completion(r#"{"riddle":"only this"}"#)))
      .mount(&server)
      .await;
    let err = client_for(server.uri()).generate("").await.unwrap_err();
    assert!(matches!(err, ServiceError::Unexpected(_)), "got {err:?}");
  }

  #[tokio::test]
  async fn unreachable_host_is_connectivity() {
    // Port 9 (discard) is not served locally.
    let err = client_for("http://127.0.0.1:9".into()).generate("").await.unwrap_err();
    assert!(matches!(err, ServiceError::Connectivity(_)), "got {err:?}");
  }

  #[tokio::test]
  async fn empty_classification_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(200).set_body_json(completion("")))
      .mount(&server)
      .await;
    let out = client_for(server.uri()).classify("hello").await.expect("ok");
    assert_eq!(out, None);
  }
}
