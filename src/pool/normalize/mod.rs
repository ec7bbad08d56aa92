use log::debug;
use serde_json::Value;
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::pool::question::{Question, QuestionDefect, QuestionKind, QuestionOption, Source};
use crate::pool::Pool;


pub fn normalize_generated(pool: &Pool, raw: &Value) -> Vec<Question> {
    let mut reserved = pool.ids();
    let mut accepted = Vec::new();
    for (index, item) in candidate_items(raw).iter().enumerate() {
        match coerce_question(item, index, &mut reserved) {
            Ok(question) => accepted.push(question),
            Err(defect) => debug!("discarding generated question #{}: {}", index + 1, defect),
        }
    }
    accepted
}

fn candidate_items(raw: &Value) -> Vec<Value> {
    if let Some(items) = raw.as_array() {
        return items.clone();
    }
    if let Some(items) = raw.get("questions").and_then(Value::as_array) {
        return items.clone();
    }
    if let Some(text) = raw.get("raw").and_then(Value::as_str) {
        return extract_embedded_array(text);
    }
    Vec::new()
}

// Models are asked for a pure JSON array but tend to wrap it in prose; parse
// from the first bracket onwards.
fn extract_embedded_array(text: &str) -> Vec<Value> {
    let Some(start) = text.find('[') else {
        return Vec::new();
    };
    match serde_json::from_str::<Value>(&text[start..]) {
        Ok(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

fn coerce_question(
    item: &Value,
    index: usize,
    reserved: &mut HashSet<String>,
) -> Result<Question, QuestionDefect> {
    let question = Question {
        id: unique_id(item.get("id"), index, reserved),
        kind: match item.get("type").and_then(Value::as_str) {
            Some("checkbox") => QuestionKind::Multi,
            _ => QuestionKind::Single,
        },
        prompt: item
            .get("prompt")
            .and_then(scalar_to_string)
            .map(|prompt| prompt.trim().to_owned())
            .filter(|prompt| !prompt.is_empty())
            .unwrap_or_else(|| format!("Pregunta generada #{}", index + 1)),
        options: coerce_options(item.get("options")),
        answer: item
            .get("answer")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(scalar_to_string).collect())
            .unwrap_or_default(),
        explanation: item
            .get("explanation")
            .and_then(Value::as_str)
            .map(str::to_owned),
        tags: Vec::new(),
        source: Source::Generated,
    };
    question.validate()?;
    Ok(question)
}

fn coerce_options(value: Option<&Value>) -> Vec<QuestionOption> {
    let Some(entries) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .enumerate()
        .map(|(position, entry)| QuestionOption {
            id: entry
                .get("id")
                .and_then(scalar_to_string)
                .unwrap_or_else(|| format!("opt-{position}")),
            text: entry
                .get("text")
                .and_then(scalar_to_string)
                .unwrap_or_else(|| format!("Opción {}", position + 1)),
        })
        .filter(|option| !option.text.is_empty())
        .collect()
}

// The chosen id is reserved even if the item is later rejected; the wasted
// reservation is harmless.
fn unique_id(value: Option<&Value>, index: usize, reserved: &mut HashSet<String>) -> String {
    let base = value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| format!("ai-{}-{}", timestamp_millis(), index));

    let mut id = base.clone();
    let mut suffix = 1;
    while reserved.contains(&id) {
        id = format!("{base}-{suffix}");
        suffix += 1;
    }
    reserved.insert(id.clone());
    id
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or(0)
}
