//! AI-assist proxy.
//!
//! Forwards a prompt to a chat-completion API with a fixed system persona and hands
//! back the reply text. Upstream failures never reach the caller: a missing key, a
//! network error or an empty completion all turn into [`ASSISTANT_UNAVAILABLE`].

use crate::{
    config::settings::AssistantConfig,
    core::quiz::{QuizQuestion, parse_quiz},
    errors::Result,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Reply shown when the upstream model cannot be reached.
pub const ASSISTANT_UNAVAILABLE: &str =
    "The assistant is unavailable right now. Please try again in a little while.";

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Client for the chat-completion API.
#[derive(Debug, Clone)]
pub struct AssistantClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    persona: String,
    api_key: Option<String>,
    quiz_max_questions: usize,
}

impl AssistantClient {
    /// Creates a client from the `[assistant]` settings and an optional API key.
    #[must_use]
    pub fn new(config: &AssistantConfig, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            persona: config.persona.clone(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            quiz_max_questions: config.quiz_max_questions,
        }
    }

    /// Creates a client reading the key from `ASSISTANT_API_KEY`.
    #[must_use]
    pub fn from_env(config: &AssistantConfig) -> Self {
        let api_key = std::env::var("ASSISTANT_API_KEY").ok();
        if api_key.is_none() {
            warn!("ASSISTANT_API_KEY not set; assistant replies will be unavailable");
        }
        Self::new(config, api_key)
    }

    async fn complete(&self, api_key: &str, prompt: &str) -> Result<Option<String>> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &self.persona,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };
        let response: ChatResponse = self
            .http
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty()))
    }

    /// Sends `prompt` under the configured persona and returns the reply.
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    pub async fn generate_reply(&self, prompt: &str) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            debug!("No assistant key configured");
            return ASSISTANT_UNAVAILABLE.to_string();
        };
        match self.complete(api_key, prompt).await {
            Ok(Some(reply)) => reply,
            Ok(None) => {
                warn!("Assistant returned an empty completion");
                ASSISTANT_UNAVAILABLE.to_string()
            }
            Err(e) => {
                warn!("Assistant request failed: {}", e);
                ASSISTANT_UNAVAILABLE.to_string()
            }
        }
    }

    /// Asks for `count` questions on `topic` and parses the reply.
    ///
    /// `count` is clamped to `1..=quiz_max_questions`. An unavailable assistant or an
    /// unparsable reply yields an empty quiz.
    #[instrument(skip(self))]
    pub async fn generate_quiz(&self, topic: &str, count: usize) -> Vec<QuizQuestion> {
        let count = count.clamp(1, self.quiz_max_questions.max(1));
        let reply = self.generate_reply(&quiz_prompt(topic, count)).await;
        if reply == ASSISTANT_UNAVAILABLE {
            return Vec::new();
        }
        let questions = parse_quiz(&reply, count);
        debug!("Parsed {} of {} requested questions", questions.len(), count);
        questions
    }
}

/// Prompt asking for a quiz in the template the quiz parser understands.
#[must_use]
pub fn quiz_prompt(topic: &str, count: usize) -> String {
    format!(
        "Write {count} multiple-choice questions about {topic} for school students.\n\
         Use exactly this format for every question and leave a blank line between questions:\n\
         \n\
         1. Question text\n\
         A) option\n\
         B) option\n\
         C) option\n\
         D) option\n\
         Answer: <letter>"
    )
}
