use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::pool::Question;


pub type AnswerMap = HashMap<String, HashSet<String>>;

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeEntry {
    pub id: String,
    pub is_correct: bool,
    pub chosen: Vec<String>,
    pub correct: Vec<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Score {
    pub score: usize,
    pub total: usize,
    pub percentage: u32,
}

pub fn grade(questions: &[Question], answers: &AnswerMap) -> Vec<GradeEntry> {
    questions
        .iter()
        .map(|question| {
            let chosen = answers.get(&question.id).cloned().unwrap_or_default();
            let correct = question.answer_set();
            let is_correct =
                chosen.len() == correct.len() && correct.iter().all(|id| chosen.contains(*id));
            GradeEntry {
                id: question.id.clone(),
                is_correct,
                chosen: sorted(chosen.iter().map(String::as_str)),
                correct: sorted(correct.into_iter()),
            }
        })
        .collect()
}

pub fn tally(results: &[GradeEntry]) -> Score {
    let total = results.len();
    let score = results.iter().filter(|entry| entry.is_correct).count();
    let percentage = if total == 0 {
        0
    } else {
        (100.0 * score as f64 / total as f64).round() as u32
    };
    Score {
        score,
        total,
        percentage,
    }
}

fn sorted<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut ids: Vec<String> = ids.map(str::to_owned).collect();
    ids.sort();
    ids
}
