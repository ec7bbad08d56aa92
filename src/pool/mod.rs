use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

pub mod blocks;
pub mod grade;
pub mod normalize;
pub mod question;

#[cfg(test)]
mod tests;

pub use question::{Question, QuestionDefect, QuestionKind, QuestionOption, Source};

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Pool {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub questions: Vec<Question>,
}

#[derive(Deserialize)]
struct RawPool {
    title: Option<String>,
    version: Option<String>,
    #[serde(default)]
    questions: Vec<Value>,
}

impl Pool {
    pub fn from_json(raw: &str) -> Result<Pool> {
        let document: RawPool = serde_json::from_str(raw).context("pool file is not valid JSON")?;

        let mut questions: Vec<Question> = Vec::new();
        let mut seen_ids = HashSet::new();
        for (index, value) in document.questions.into_iter().enumerate() {
            let mut question: Question = match serde_json::from_value(value) {
                Ok(question) => question,
                Err(err) => {
                    warn!("dropping malformed question #{}: {}", index + 1, err);
                    continue;
                }
            };
            question.source = Source::Base;
            if let Err(defect) = question.validate() {
                warn!("dropping question `{}`: {}", question.id, defect);
                continue;
            }
            if !seen_ids.insert(question.id.clone()) {
                warn!("dropping question with duplicate id `{}`", question.id);
                continue;
            }
            questions.push(question);
        }

        Ok(Pool {
            title: document.title,
            version: document.version,
            questions,
        })
    }

    pub fn append(&mut self, extra: Vec<Question>) {
        self.questions.extend(extra);
    }

    pub fn ids(&self) -> HashSet<String> {
        self.questions.iter().map(|q| q.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn generated_count(&self) -> usize {
        self.questions
            .iter()
            .filter(|q| q.source == Source::Generated)
            .count()
    }
}
