use anyhow::Result;
use serde_json::Value;

use crate::pool::grade::GradeEntry;
use crate::pool::{Pool, Question};

pub mod openai;

#[cfg(test)]
pub mod mock;

// Boundary to the external text-generation collaborator. Implementations
// return raw JSON-ish output; sanitizing it is the normalizer's job.
pub trait AiGateway {
    fn probe(&self) -> bool;

    fn augment(&self, pool: &Pool, count: usize) -> Result<Value>;

    fn explain(&self, mistakes: &[GradeEntry], questions: &[Question]) -> Result<Value>;
}
