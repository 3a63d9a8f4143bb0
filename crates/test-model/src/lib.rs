//! A local fake model for testing purpose.

mod preset;

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use adventure_tale_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent, Role, TextPart, Turn,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Error {
    #[inline]
    pub fn message(&self) -> &'static str {
        self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    provider: TestModelProvider,
    request: ModelRequest,
    event_idx: usize,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl TestModelResponse {
    fn preset_events(&self) -> Result<&[PresetEvent], Error> {
        let step_idx = self.request.turn_count();
        let Some(step) = self.provider.conversation_script.get(step_idx) else {
            return Err(Error {
                message: "no enough steps",
                kind: ErrorKind::RateLimitExceeded,
            });
        };
        match step {
            ConversationStep::UserInput => Err(Error {
                message: "not an assistant response step",
                kind: ErrorKind::Moderated,
            }),
            ConversationStep::AssistantResponse(response) => {
                Ok(&response.events)
            }
        }
    }
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        let event_count = match this.preset_events() {
            Ok(events) => events.len(),
            Err(err) => return Poll::Ready(Err(err)),
        };

        if let Some(sleep) = &mut this.sleep {
            let sleep = sleep.as_mut();
            ready!(sleep.poll(cx));
            this.sleep = None;

            if this.event_idx < event_count {
                let event = match this.preset_events() {
                    Ok(events) => match &events[this.event_idx] {
                        PresetEvent::MessageDelta(msg) => {
                            ModelResponseEvent::MessageDelta(msg.clone())
                        }
                    },
                    Err(err) => return Poll::Ready(Err(err)),
                };
                this.event_idx += 1;
                return Poll::Ready(Ok(Some(event)));
            } else if this.event_idx == event_count {
                this.event_idx += 1;
                return Poll::Ready(Ok(Some(ModelResponseEvent::Completed(
                    ModelFinishReason::Stop,
                ))));
            } else {
                // In case this method is called after completion.
                return Poll::Ready(Ok(None));
            }
        }
        this.sleep = Some(Box::pin(sleep(
            this.provider.delay.unwrap_or(Duration::from_millis(1)),
        )));
        Pin::new(this).poll_next_event(cx)
    }

    /// Every message delta becomes its own part, the way a chat SDK keeps
    /// the chunks it received.
    fn make_turn(&self) -> Option<Turn> {
        let events = self.preset_events().ok()?;
        let parts = events
            .iter()
            .map(|event| match event {
                PresetEvent::MessageDelta(msg) => TextPart::new(msg.clone()),
            })
            .collect();
        Some(Turn {
            role: Role::Model,
            parts,
        })
    }
}

#[derive(Clone)]
enum ConversationStep {
    UserInput,
    AssistantResponse(PresetResponse),
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the conversation script, which
/// is how the model should respond to a request. The added steps will be
/// selected according to the number of turns in your request (history plus
/// the new message). If there are no enough steps in the script, an error
/// will be returned.
///
/// Every request is recorded and can be inspected with
/// [`TestModelProvider::received_requests`].
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    conversation_script: Vec<ConversationStep>,
    delay: Option<Duration>,
    attempts: Arc<Mutex<HashMap<usize, u64>>>,
    received: Arc<Mutex<Vec<ModelRequest>>>,
}

impl TestModelProvider {
    #[inline]
    pub fn add_assistant_response_step(&mut self, preset: PresetResponse) {
        self.conversation_script
            .push(ConversationStep::AssistantResponse(preset));
    }

    #[inline]
    pub fn add_user_input_step(&mut self) {
        self.conversation_script.push(ConversationStep::UserInput);
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns the requests this provider (and its clones) has received.
    pub fn received_requests(&self) -> Vec<ModelRequest> {
        self.received
            .lock()
            .map(|received| received.clone())
            .unwrap_or_default()
    }

    fn should_fail(&self, step_idx: usize) -> bool {
        let Some(ConversationStep::AssistantResponse(preset)) =
            self.conversation_script.get(step_idx)
        else {
            return false;
        };
        let Ok(mut attempts) = self.attempts.lock() else {
            return false;
        };
        let attempt = attempts.entry(step_idx).or_default();
        *attempt += 1;
        preset.fails_at(*attempt)
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        if let Ok(mut received) = self.received.lock() {
            received.push(req.clone());
        }

        if self.should_fail(req.turn_count()) {
            return ready(Err(Error {
                message: "preset failure",
                kind: ErrorKind::Other,
            }));
        }

        let resp = TestModelResponse {
            provider: self.clone(),
            request: req.clone(),
            event_idx: 0,
            sleep: None,
        };
        ready(Ok(resp))
    }
}
