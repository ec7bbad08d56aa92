use itertools::Itertools;
use rand::seq::SliceRandom;

use crate::pool::{Pool, Question};
use crate::session::settings::Settings;


pub fn build_blocks(pool: Option<&Pool>, settings: &Settings) -> Vec<Vec<Question>> {
    let Some(pool) = pool else {
        return Vec::new();
    };
    let mut questions = pool.questions.clone();
    if settings.shuffle_enabled {
        questions.shuffle(&mut rand::thread_rng());
    }
    let size = settings.block_size.max(1);
    let chunks = questions.into_iter().chunks(size);
    chunks.into_iter().map(|chunk| chunk.collect()).collect()
}

// Display-only derivation; stored pool and block data keep their order.
pub fn shuffled_options(questions: &[Question]) -> Vec<Question> {
    let mut rng = rand::thread_rng();
    questions
        .iter()
        .map(|question| {
            let mut question = question.clone();
            question.options.shuffle(&mut rng);
            question
        })
        .collect()
}
