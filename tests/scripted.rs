#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::rc::Rc;

use console_api::{ConsoleApiError, FeedRequest, FeedResponse, FeedTransport};
use tokio::sync::mpsc::UnboundedSender;

/// What the fake console router does for one request.
#[derive(Debug, Clone)]
pub enum Step {
    Output(Vec<u8>),
    Close(String),
    Fail,
    /// Never answer; the request stays in flight until dropped.
    Hang,
}

impl Step {
    pub fn output(bytes: &[u8]) -> Self {
        Step::Output(bytes.to_vec())
    }
}

#[derive(Default)]
struct Script {
    steps: VecDeque<Step>,
    requests: Vec<FeedRequest>,
    /// Keys typed while the request with this index is in flight.
    typed: HashMap<usize, Vec<u8>>,
    keyboard: Option<UnboundedSender<Vec<u8>>>,
    in_flight: usize,
    max_in_flight: usize,
    dropped: usize,
}

/// Single-threaded stand-in for the console router.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Rc<RefCell<Script>>,
}

impl ScriptedTransport {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        let transport = Self::default();
        transport.script.borrow_mut().steps = steps.into_iter().collect();
        transport
    }

    /// Type `keys` on the keyboard while request number `index` (0-based) is in flight.
    pub fn type_during(self, index: usize, keys: &[u8]) -> Self {
        self.script.borrow_mut().typed.insert(index, keys.to_vec());
        self
    }

    pub fn attach_keyboard(&self, sender: UnboundedSender<Vec<u8>>) {
        self.script.borrow_mut().keyboard = Some(sender);
    }

    pub fn requests(&self) -> Vec<FeedRequest> {
        self.script.borrow().requests.clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.script.borrow().max_in_flight
    }

    /// Requests abandoned before they answered.
    pub fn dropped(&self) -> usize {
        self.script.borrow().dropped
    }
}

struct InFlight {
    script: Rc<RefCell<Script>>,
    answered: bool,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut script = self.script.borrow_mut();
        script.in_flight -= 1;
        if !self.answered {
            script.dropped += 1;
        }
    }
}

impl FeedTransport for ScriptedTransport {
    fn feed(
        &self,
        request: FeedRequest,
    ) -> impl Future<Output = Result<FeedResponse, ConsoleApiError>> {
        let script = Rc::clone(&self.script);
        async move {
            let (step, typed) = {
                let mut state = script.borrow_mut();
                let index = state.requests.len();
                state.requests.push(request);
                state.in_flight += 1;
                state.max_in_flight = state.max_in_flight.max(state.in_flight);
                let step = state.steps.pop_front().unwrap_or(Step::Hang);
                let typed = state.typed.remove(&index);
                if let (Some(keys), Some(keyboard)) = (&typed, &state.keyboard) {
                    let _ = keyboard.send(keys.clone());
                }
                (step, typed.is_some())
            };
            let mut guard = InFlight {
                script,
                answered: false,
            };

            if typed {
                // Let the loop see the keystrokes before the answer arrives.
                tokio::task::yield_now().await;
            }

            let result = match step {
                Step::Output(bytes) => Ok(FeedResponse::Output(bytes)),
                Step::Close(message) => Ok(FeedResponse::Closed(message)),
                Step::Fail => Err(ConsoleApiError::InvalidPayload(
                    "scripted failure".to_string(),
                )),
                Step::Hang => std::future::pending().await,
            };
            guard.answered = true;
            result
        }
    }
}
