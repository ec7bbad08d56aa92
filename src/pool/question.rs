use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: String,
    pub text: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum QuestionKind {
    #[serde(rename = "radio")]
    Single,
    #[serde(rename = "checkbox")]
    Multi,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum Source {
    #[default]
    #[serde(rename = "base")]
    Base,
    #[serde(rename = "generated")]
    Generated,
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum QuestionDefect {
    #[error("prompt is empty")]
    EmptyPrompt,
    #[error("fewer than two options")]
    NotEnoughOptions,
    #[error("duplicate option id `{0}`")]
    DuplicateOptionId(String),
    #[error("no answer entries")]
    EmptyAnswer,
    #[error("answer id `{0}` does not match any option")]
    UnknownAnswerId(String),
    #[error("single-select questions take exactly one answer")]
    SingleSelectArity,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub prompt: String,
    pub options: Vec<QuestionOption>,
    pub answer: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub source: Source,
}

impl Question {
    // Enforced at ingestion for base and generated questions alike; a
    // question that fails here never enters the pool.
    pub fn validate(&self) -> Result<(), QuestionDefect> {
        if self.prompt.trim().is_empty() {
            return Err(QuestionDefect::EmptyPrompt);
        }
        if self.options.len() < 2 {
            return Err(QuestionDefect::NotEnoughOptions);
        }
        let mut option_ids = HashSet::new();
        for option in &self.options {
            if !option_ids.insert(option.id.as_str()) {
                return Err(QuestionDefect::DuplicateOptionId(option.id.clone()));
            }
        }
        if self.answer.is_empty() {
            return Err(QuestionDefect::EmptyAnswer);
        }
        for answer in &self.answer {
            if !option_ids.contains(answer.as_str()) {
                return Err(QuestionDefect::UnknownAnswerId(answer.clone()));
            }
        }
        if self.kind == QuestionKind::Single && self.answer.len() != 1 {
            return Err(QuestionDefect::SingleSelectArity);
        }
        Ok(())
    }

    pub fn answer_set(&self) -> HashSet<&str> {
        self.answer.iter().map(String::as_str).collect()
    }
}
