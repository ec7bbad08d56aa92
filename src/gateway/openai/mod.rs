use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{json, Value};
use std::env;
use thiserror::Error;

use crate::gateway::AiGateway;
use crate::pool::grade::GradeEntry;
use crate::pool::{Pool, Question};


const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4.1-mini";
const PROMPT_PAYLOAD_LIMIT: usize = 30_000;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("no API key is configured")]
    MissingKey,
    #[error("model endpoint returned status {status}")]
    ServerError { status: u16 },
    #[error("http transport error: {0}")]
    Transport(ureq::Error),
}

#[derive(Clone)]
pub struct OpenAiGateway {
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl OpenAiGateway {
    pub fn new(api_key: Option<String>, model: String, base_url: String) -> Self {
        OpenAiGateway {
            api_key: api_key.filter(|key| !key.is_empty()),
            model,
            base_url,
        }
    }

    pub fn from_env() -> Self {
        OpenAiGateway::new(
            env::var("OPENAI_API_KEY").ok(),
            env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_owned()),
            env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned()),
        )
    }

    fn complete(&self, prompt: String) -> Result<Value> {
        let api_key = self.api_key.as_deref().ok_or(RequestError::MissingKey)?;
        let body = json!({
            "model": self.model,
            "temperature": 0.2,
            "messages": [{ "role": "user", "content": prompt }],
        });
        let response = ureq::post(&format!("{}/chat/completions", self.base_url))
            .set("Authorization", &format!("Bearer {api_key}"))
            .send_json(body)
            .map_err(|err| match err {
                ureq::Error::Status(status, _) => RequestError::ServerError { status },
                other => RequestError::Transport(other),
            })
            .context("model request failed")?;
        let reply: Value = response
            .into_json()
            .context("model response body is not JSON")?;
        let content = reply
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or("");
        Ok(tolerant_parse(content))
    }
}

impl AiGateway for OpenAiGateway {
    fn probe(&self) -> bool {
        self.api_key.is_some()
    }

    fn augment(&self, pool: &Pool, count: usize) -> Result<Value> {
        self.complete(augment_prompt(pool, count)?)
    }

    fn explain(&self, mistakes: &[GradeEntry], questions: &[Question]) -> Result<Value> {
        self.complete(explain_prompt(mistakes, questions)?)
    }
}

// The model is asked for pure JSON but often wraps it in prose; parse from
// the first bracket. Callers receive {"raw": ...} when that fails so the
// normalizer can retry its own extraction.
fn tolerant_parse(content: &str) -> Value {
    if let Some(start) = content.find(|c| c == '[' || c == '{') {
        if let Ok(value) = serde_json::from_str(&content[start..]) {
            return value;
        }
    }
    json!({ "raw": content })
}

fn augment_prompt(pool: &Pool, count: usize) -> Result<String> {
    let pool_json = truncated_json(pool)?;
    Ok(format!(
        "Genera {count} preguntas MCQ en JSON PURO (array).\n\
         Esquema por item: {{ \"id\": string, \"type\": \"radio\"|\"checkbox\", \"prompt\": string, \
         \"options\": [{{\"id\": string, \"text\": string}}, ...], \"answer\": [string], \
         \"explanation\"?: string }}.\n\
         No repitas IDs, cuida rigor técnico y claridad.\n\
         Pool base:\n{pool_json}"
    ))
}

fn explain_prompt(mistakes: &[GradeEntry], questions: &[Question]) -> Result<String> {
    let pool_json = truncated_json(&json!({ "questions": questions }))?;
    let mistakes_json = truncated_json(&mistakes)?;
    Ok(format!(
        "Eres tutor. Explica SOLO las preguntas que el alumno respondió incorrectamente.\n\
         Devuelve JSON con shape: {{ \"explanations\": {{ [questionId: string]: string }} }}.\n\
         Haz la explicación breve, clara y enfocada en por qué la respuesta correcta lo es.\n\
         Preguntas del bloque:\n{pool_json}\n\
         Errores del alumno:\n{mistakes_json}"
    ))
}

fn truncated_json<T: Serialize>(value: &T) -> Result<String> {
    let mut text = serde_json::to_string(value).context("payload serialization failed")?;
    if text.len() > PROMPT_PAYLOAD_LIMIT {
        let mut cut = PROMPT_PAYLOAD_LIMIT;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }
    Ok(text)
}
