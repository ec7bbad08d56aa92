use serde_json::json;

use super::*;
use crate::pool::question::QuestionDefect;

fn valid_question(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "type": "radio",
        "prompt": format!("Prompt {id}"),
        "options": [
            { "id": "a", "text": "Alpha" },
            { "id": "b", "text": "Beta" },
        ],
        "answer": ["a"],
    })
}

fn document(questions: Vec<serde_json::Value>) -> String {
    json!({ "title": "Fixture", "version": "1", "questions": questions }).to_string()
}

#[test]
fn parses_wire_vocabulary() {
    let mut checkbox = valid_question("q2");
    checkbox["type"] = json!("checkbox");
    checkbox["answer"] = json!(["a", "b"]);
    let pool = Pool::from_json(&document(vec![valid_question("q1"), checkbox])).unwrap();

    assert_eq!(pool.questions[0].kind, QuestionKind::Single);
    assert_eq!(pool.questions[1].kind, QuestionKind::Multi);
}

#[test]
fn title_and_version_pass_through() {
    let pool = Pool::from_json(&document(vec![valid_question("q1")])).unwrap();
    assert_eq!(pool.title.as_deref(), Some("Fixture"));
    assert_eq!(pool.version.as_deref(), Some("1"));
}

#[test]
fn forces_base_source() {
    let mut question = valid_question("q1");
    question["source"] = json!("generated");
    let pool = Pool::from_json(&document(vec![question])).unwrap();
    assert_eq!(pool.questions[0].source, Source::Base);
}

#[test]
fn invalid_json_is_an_error() {
    assert!(Pool::from_json("{ not json").is_err());
}

#[test]
fn drops_malformed_items() {
    let mut broken = valid_question("q2");
    broken.as_object_mut().unwrap().remove("prompt");
    let pool = Pool::from_json(&document(vec![valid_question("q1"), broken])).unwrap();

    assert_eq!(pool.len(), 1);
    assert_eq!(pool.questions[0].id, "q1");
}

#[test]
fn drops_single_select_with_multiple_answers() {
    let mut violator = valid_question("q2");
    violator["answer"] = json!(["a", "b"]);
    let pool = Pool::from_json(&document(vec![valid_question("q1"), violator])).unwrap();

    assert_eq!(pool.len(), 1);
}

#[test]
fn drops_answers_that_match_no_option() {
    let mut violator = valid_question("q2");
    violator["answer"] = json!(["z"]);
    let pool = Pool::from_json(&document(vec![valid_question("q1"), violator])).unwrap();

    assert_eq!(pool.len(), 1);
}

#[test]
fn drops_duplicate_ids() {
    let pool =
        Pool::from_json(&document(vec![valid_question("q1"), valid_question("q1")])).unwrap();
    assert_eq!(pool.len(), 1);
}

#[test]
fn ignores_unknown_fields() {
    let mut question = valid_question("q1");
    question["meta"] = json!({ "difficulty": "hard" });
    let pool = Pool::from_json(&document(vec![question])).unwrap();
    assert_eq!(pool.len(), 1);
}

#[test]
fn loading_twice_is_idempotent() {
    let raw = document(vec![valid_question("q1"), valid_question("q2")]);
    let first = Pool::from_json(&raw).unwrap();
    let second = Pool::from_json(&raw).unwrap();
    assert_eq!(first, second);
}

#[test]
fn validate_names_the_defect() {
    let pool = Pool::from_json(&document(vec![valid_question("q1")])).unwrap();
    let mut question = pool.questions[0].clone();
    question.options.truncate(1);
    question.answer = vec!["a".to_owned()];
    assert_eq!(question.validate(), Err(QuestionDefect::NotEnoughOptions));

    let mut question = pool.questions[0].clone();
    question.answer.clear();
    assert_eq!(question.validate(), Err(QuestionDefect::EmptyAnswer));

    let mut question = pool.questions[0].clone();
    question.options[1].id = "a".to_owned();
    assert_eq!(
        question.validate(),
        Err(QuestionDefect::DuplicateOptionId("a".to_owned()))
    );
}
