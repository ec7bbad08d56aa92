use anyhow::{anyhow, Result};
use parking_lot::{Condvar, Mutex};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::gateway::AiGateway;
use crate::pool::grade::GradeEntry;
use crate::pool::{Pool, Question};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GatewayCall {
    Augment { pool_size: usize, count: usize },
    Explain { mistake_ids: Vec<String> },
}

#[derive(Clone)]
pub struct MockGateway {
    state: Arc<Mutex<MockState>>,
    released: Arc<Condvar>,
}

#[derive(Default)]
struct MockState {
    has_key: bool,
    held: bool,
    calls: Vec<GatewayCall>,
    augment_replies: VecDeque<Result<Value>>,
    explain_replies: VecDeque<Result<Value>>,
}

impl MockGateway {
    pub fn new() -> Self {
        MockGateway {
            state: Arc::new(Mutex::new(MockState {
                has_key: true,
                ..Default::default()
            })),
            released: Arc::new(Condvar::new()),
        }
    }

    pub fn without_key() -> Self {
        MockGateway {
            state: Arc::new(Mutex::new(MockState::default())),
            released: Arc::new(Condvar::new()),
        }
    }

    pub fn queue_augment(&self, reply: Result<Value>) {
        self.state.lock().augment_replies.push_back(reply);
    }

    pub fn queue_explain(&self, reply: Result<Value>) {
        self.state.lock().explain_replies.push_back(reply);
    }

    // Block gateway calls until release(), to keep a request pending.
    pub fn hold(&self) {
        self.state.lock().held = true;
    }

    pub fn release(&self) {
        self.state.lock().held = false;
        self.released.notify_all();
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state.lock().calls.clone()
    }
}

impl AiGateway for MockGateway {
    fn probe(&self) -> bool {
        self.state.lock().has_key
    }

    fn augment(&self, pool: &Pool, count: usize) -> Result<Value> {
        let mut state = self.state.lock();
        while state.held {
            self.released.wait(&mut state);
        }
        state.calls.push(GatewayCall::Augment {
            pool_size: pool.len(),
            count,
        });
        state
            .augment_replies
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("no canned augment reply")))
    }

    fn explain(&self, mistakes: &[GradeEntry], _questions: &[Question]) -> Result<Value> {
        let mut state = self.state.lock();
        while state.held {
            self.released.wait(&mut state);
        }
        state.calls.push(GatewayCall::Explain {
            mistake_ids: mistakes.iter().map(|entry| entry.id.clone()).collect(),
        });
        state
            .explain_replies
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("no canned explain reply")))
    }
}
