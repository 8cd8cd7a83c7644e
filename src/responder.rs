use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use thiserror::Error;

use crate::core::event::{Message, MessageRole};

#[derive(Error, Debug)]
pub enum ResponderError {
    #[error("Responder unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for ResponderError {
    fn from(err: reqwest::Error) -> Self {
        ResponderError::Unavailable(err.to_string())
    }
}

/// Everything a responder needs to stay in character for one reply.
#[derive(Debug, Clone)]
pub struct ReplyRequest {
    pub persona_id: String,
    pub persona_name: String,
    pub core_identity: String,
    pub speech_patterns: Vec<String>,
    pub quirks: Vec<String>,
    pub multi_part: bool,
    pub topic_title: String,
    pub emotion_value: i32,
    pub style_hint: String,
    pub relationship_description: String,
    pub other_persona_name: String,
    pub recent_history: Vec<Message>,
    pub user_text: String,
}

/// The persona's voice. Swappable at session construction: scripted for
/// offline/demo use, HTTP-backed for a real model.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn reply(&self, request: &ReplyRequest) -> Result<String, ResponderError>;
}

/// Canned replies assembled from the persona's own speech patterns. Rotates
/// through templates so repeated turns don't repeat lines; fully
/// deterministic, which keeps the orchestrator's seeded rng the only source
/// of randomness in a session.
pub struct ScriptedResponder {
    counter: AtomicUsize,
}

impl ScriptedResponder {
    pub fn new() -> Self {
        ScriptedResponder {
            counter: AtomicUsize::new(0),
        }
    }
}

impl Default for ScriptedResponder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Responder for ScriptedResponder {
    async fn reply(&self, request: &ReplyRequest) -> Result<String, ResponderError> {
        let tick = self.counter.fetch_add(1, Ordering::Relaxed);

        let pattern = request
            .speech_patterns
            .get(tick % request.speech_patterns.len().max(1))
            .cloned()
            .unwrap_or_default();

        let line = match tick % 4 {
            0 => format!("{} {}", pattern, comment_on(&request.user_text)),
            1 => format!(
                "{} and about \"{}\"... {}",
                pattern,
                request.topic_title,
                comment_on(&request.user_text)
            ),
            2 => format!(
                "{} ({} would disagree, but still)",
                comment_on(&request.user_text),
                request.other_persona_name
            ),
            _ => pattern,
        };

        // Bursty personas answer in short stacked bubbles now and then.
        if request.multi_part && tick % 3 == 0 {
            Ok(format!("{}\nanyway. thoughts?", line))
        } else {
            Ok(line)
        }
    }
}

fn comment_on(user_text: &str) -> String {
    let trimmed = user_text.trim();
    if trimmed.len() > 40 {
        "that's a lot to unpack".to_string()
    } else if trimmed.ends_with('?') {
        "good question, actually".to_string()
    } else {
        "I hear you".to_string()
    }
}

/// OpenAI-style chat completion client. Thin on purpose: any transport or
/// schema problem is folded into `ResponderError::Unavailable` and handled
/// by the orchestrator's fallback path.
pub struct HttpResponder {
    base_url: String,
    api_key: Option<String>,
    model: String,
    http_client: reqwest::Client,
}

impl HttpResponder {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        HttpResponder {
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            http_client: reqwest::Client::new(),
        }
    }

    fn system_prompt(request: &ReplyRequest) -> String {
        let mut prompt = format!(
            "You are the personified social platform \"{}\".\n\nIdentity: {}\nTypical phrases: {}\nQuirks: {}\n",
            request.persona_name,
            request.core_identity,
            request.speech_patterns.join(", "),
            request.quirks.join(", "),
        );
        prompt.push_str(&format!(
            "\nCurrent mood: {}/100 ({})\nTopic under discussion: {}\nThe other participant: {} ({})\n",
            request.emotion_value,
            request.style_hint,
            request.topic_title,
            request.other_persona_name,
            request.relationship_description,
        ));
        prompt.push_str("\nStay in character. Keep replies short and punchy (under 50 words).");
        if request.multi_part {
            prompt.push_str(" Split your reply into 2-3 short lines separated by newlines.");
        }
        prompt
    }
}

#[async_trait]
impl Responder for HttpResponder {
    async fn reply(&self, request: &ReplyRequest) -> Result<String, ResponderError> {
        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": Self::system_prompt(request)
        })];

        for msg in &request.recent_history {
            let role = match msg.role {
                MessageRole::Persona if msg.persona_id.as_deref() == Some(&request.persona_id) => {
                    "assistant"
                }
                MessageRole::Persona | MessageRole::System => continue,
                MessageRole::User => "user",
            };
            messages.push(serde_json::json!({
                "role": role,
                "content": msg.text
            }));
        }

        messages.push(serde_json::json!({
            "role": "user",
            "content": format!(
                "The user says: {}\n\nReply as {}:",
                request.user_text, request.persona_name
            )
        }));

        let request_body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0.85,
            "max_tokens": 200
        });

        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let mut http_request = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request_body);
        if let Some(api_key) = &self.api_key {
            http_request = http_request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = http_request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(ResponderError::Unavailable(format!(
                "upstream returned {}",
                status
            )));
        }

        let response_json: serde_json::Value = response.json().await?;
        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ResponderError::Unavailable("malformed completion response".to_string()))?
            .trim()
            .to_string();

        Ok(content)
    }
}
