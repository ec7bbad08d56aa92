use anyhow::{anyhow, Result};
use log::{debug, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

use crate::gateway::AiGateway;
use crate::pool::blocks::{build_blocks, shuffled_options};
use crate::pool::grade::{grade, AnswerMap, GradeEntry};
use crate::pool::normalize::normalize_generated;
use crate::pool::{Pool, Question, QuestionKind};

pub mod settings;


pub use settings::{Settings, SettingsOverrides};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Setup,
    Quiz,
    Results,
    Final,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum RequestKind {
    Augment,
    Explain,
}

struct PendingRequest {
    epoch: u64,
    kind: RequestKind,
    reply: Receiver<Result<Value>>,
    worker: Option<JoinHandle<()>>,
}

// Sole owner and writer of all quiz session state. Gateway work runs on a
// worker thread; replies are applied by poll_gateway/wait_gateway and only
// when their epoch still matches the session.
pub struct Session<G: AiGateway> {
    gateway: G,
    has_ai: bool,
    phase: Phase,
    pool: Option<Pool>,
    settings: Settings,
    initial_overrides: SettingsOverrides,
    blocks: Vec<Vec<Question>>,
    current_block: usize,
    answers: AnswerMap,
    explanations: Option<HashMap<String, String>>,
    epoch: u64,
    pending: Option<PendingRequest>,
}

impl<G> Session<G>
where
    G: AiGateway + Clone + Send + 'static,
{
    pub fn new(gateway: G, overrides: SettingsOverrides) -> Session<G> {
        let has_ai = gateway.probe();
        Session {
            gateway,
            has_ai,
            phase: Phase::Setup,
            pool: None,
            settings: Settings::with_overrides(&overrides),
            initial_overrides: overrides,
            blocks: Vec::new(),
            current_block: 0,
            answers: AnswerMap::new(),
            explanations: None,
            epoch: 0,
            pending: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn has_ai(&self) -> bool {
        self.has_ai
    }

    pub fn loading_ai(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pool(&self) -> Option<&Pool> {
        self.pool.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn explanations(&self) -> Option<&HashMap<String, String>> {
        self.explanations.as_ref()
    }

    pub fn blocks(&self) -> &[Vec<Question>] {
        &self.blocks
    }

    pub fn current_block(&self) -> usize {
        self.current_block
    }

    pub fn total(&self) -> usize {
        self.pool.as_ref().map_or(0, Pool::len)
    }

    pub fn ai_count(&self) -> usize {
        self.pool.as_ref().map_or(0, Pool::generated_count)
    }

    pub fn base_count(&self) -> usize {
        self.total() - self.ai_count()
    }

    pub fn active_block(&self) -> &[Question] {
        match self.blocks.get(self.current_block) {
            Some(block) => block,
            None => &[],
        }
    }

    pub fn active_questions(&self) -> Vec<Question> {
        let block = self.active_block();
        if self.settings.shuffle_question_enabled {
            shuffled_options(block)
        } else {
            block.to_vec()
        }
    }

    pub fn block_results(&self) -> Vec<GradeEntry> {
        grade(self.active_block(), &self.answers)
    }

    // Aggregate over the whole pool, visited or not.
    pub fn final_results(&self) -> Vec<GradeEntry> {
        match &self.pool {
            Some(pool) => grade(&pool.questions, &self.answers),
            None => Vec::new(),
        }
    }

    pub fn load_pool(&mut self, raw: &str) -> Result<()> {
        if self.phase != Phase::Setup {
            return Err(anyhow!("Cannot load a pool outside of setup"));
        }
        let pool = Pool::from_json(raw)?;
        self.pool = Some(pool);
        self.answers.clear();
        self.explanations = None;
        self.current_block = 0;
        self.epoch += 1;
        self.rebuild_blocks();
        Ok(())
    }

    pub fn set_settings(&mut self, settings: Settings) -> Result<()> {
        if self.phase != Phase::Setup {
            return Err(anyhow!("Settings can only change during setup"));
        }
        self.settings = settings;
        self.rebuild_blocks();
        Ok(())
    }

    pub fn start_quiz(&mut self) -> Result<()> {
        if self.phase != Phase::Setup {
            return Err(anyhow!("Cannot start a quiz outside of setup"));
        }
        if self.pool.is_none() {
            return Err(anyhow!("No question pool is loaded"));
        }
        if self.settings.allow_ai_augment && self.has_ai {
            // The pool must be extended before the quiz is entered, so this
            // request is drained within the transition.
            let pool = self.pool.clone().unwrap_or_default();
            let count = self.settings.ai_augment_count;
            self.dispatch(RequestKind::Augment, move |gateway| {
                gateway.augment(&pool, count)
            });
            self.wait_gateway();
        }
        self.phase = Phase::Quiz;
        Ok(())
    }

    pub fn toggle_answer(&mut self, question_id: &str, option_id: &str, checked: bool) -> Result<()> {
        if self.phase != Phase::Quiz {
            return Err(anyhow!("Cannot answer outside of an active quiz"));
        }
        let kind = self
            .pool
            .as_ref()
            .and_then(|pool| pool.questions.iter().find(|q| q.id == question_id))
            .map(|question| question.kind)
            .ok_or_else(|| anyhow!("Unknown question `{question_id}`"))?;
        let selection = self.answers.entry(question_id.to_owned()).or_default();
        match kind {
            // Radio semantics: selecting always replaces, never deselects.
            QuestionKind::Single => {
                selection.clear();
                selection.insert(option_id.to_owned());
            }
            QuestionKind::Multi => {
                if checked {
                    selection.insert(option_id.to_owned());
                } else {
                    selection.remove(option_id);
                }
            }
        }
        Ok(())
    }

    pub fn finish_block(&mut self) -> Result<()> {
        if self.phase != Phase::Quiz {
            return Err(anyhow!("There is no active block to finish"));
        }
        self.phase = Phase::Results;

        if !(self.settings.allow_ai_explain && self.has_ai) {
            return Ok(());
        }
        let questions = self.active_block().to_vec();
        let mistakes: Vec<GradeEntry> = grade(&questions, &self.answers)
            .into_iter()
            .filter(|entry| !entry.is_correct)
            .collect();
        if mistakes.is_empty() {
            return Ok(());
        }
        self.dispatch(RequestKind::Explain, move |gateway| {
            gateway.explain(&mistakes, &questions)
        });
        Ok(())
    }

    pub fn back_from_quiz(&mut self) -> Result<()> {
        if self.phase != Phase::Quiz {
            return Err(anyhow!("Not in a quiz block"));
        }
        self.current_block = self.current_block.saturating_sub(1);
        Ok(())
    }

    pub fn back_from_results(&mut self) -> Result<()> {
        if self.phase != Phase::Results {
            return Err(anyhow!("There are no results to leave"));
        }
        self.phase = Phase::Quiz;
        Ok(())
    }

    pub fn next_from_results(&mut self) -> Result<()> {
        if self.phase != Phase::Results {
            return Err(anyhow!("There are no results to advance from"));
        }
        if self.current_block + 1 < self.blocks.len() {
            self.current_block += 1;
            self.phase = Phase::Quiz;
        } else {
            self.phase = Phase::Final;
        }
        Ok(())
    }

    pub fn back_from_final(&mut self) -> Result<()> {
        if self.phase != Phase::Final {
            return Err(anyhow!("Not on the final screen"));
        }
        self.phase = Phase::Quiz;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.pool = None;
        self.phase = Phase::Setup;
        self.answers.clear();
        self.explanations = None;
        self.current_block = 0;
        self.settings = Settings::with_overrides(&self.initial_overrides);
        self.blocks.clear();
        self.epoch += 1;
    }

    pub fn poll_gateway(&mut self) {
        let Some(pending) = self.pending.as_ref() else {
            return;
        };
        let reply = match pending.reply.try_recv() {
            Ok(reply) => reply,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                warn!("AI worker vanished without a reply");
                self.pending = None;
                return;
            }
        };
        self.finish_request(reply);
    }

    pub fn wait_gateway(&mut self) {
        let Some(pending) = self.pending.as_ref() else {
            return;
        };
        match pending.reply.recv() {
            Ok(reply) => self.finish_request(reply),
            Err(_) => {
                warn!("AI worker vanished without a reply");
                self.pending = None;
            }
        }
    }

    fn dispatch<F>(&mut self, kind: RequestKind, job: F)
    where
        F: FnOnce(&G) -> Result<Value> + Send + 'static,
    {
        self.poll_gateway();
        if self.pending.is_some() {
            warn!("AI request already in flight, dropping {kind:?} trigger");
            return;
        }
        let gateway = self.gateway.clone();
        let (sender, reply) = mpsc::channel();
        let worker = thread::spawn(move || {
            let _ = sender.send(job(&gateway));
        });
        self.pending = Some(PendingRequest {
            epoch: self.epoch,
            kind,
            reply,
            worker: Some(worker),
        });
    }

    fn finish_request(&mut self, reply: Result<Value>) {
        let Some(mut pending) = self.pending.take() else {
            return;
        };
        if let Some(worker) = pending.worker.take() {
            let _ = worker.join();
        }
        if pending.epoch != self.epoch {
            debug!("discarding stale {:?} reply", pending.kind);
            return;
        }
        match (pending.kind, reply) {
            (RequestKind::Augment, Ok(value)) => self.apply_augment(value),
            (RequestKind::Explain, Ok(value)) => self.apply_explanations(value),
            // Best effort only: failures never roll back a phase change.
            (kind, Err(err)) => warn!("AI {:?} request failed: {:#}", kind, err),
        }
    }

    fn apply_augment(&mut self, value: Value) {
        let Some(pool) = self.pool.as_mut() else {
            return;
        };
        let extras = normalize_generated(pool, &value);
        if extras.is_empty() {
            return;
        }
        pool.append(extras);
        self.rebuild_blocks();
    }

    fn apply_explanations(&mut self, value: Value) {
        let Some(map) = value.get("explanations").and_then(Value::as_object) else {
            debug!("explain reply carried no explanations object");
            return;
        };
        let explanations = map
            .iter()
            .filter_map(|(id, text)| text.as_str().map(|text| (id.clone(), text.to_owned())))
            .collect();
        self.explanations = Some(explanations);
    }

    fn rebuild_blocks(&mut self) {
        self.blocks = build_blocks(self.pool.as_ref(), &self.settings);
    }
}
