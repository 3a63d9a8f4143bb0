use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;
use std::time::Duration;

use adventure_tale_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent, Turn,
};
use thiserror::Error;
use tracing::Instrument;

type SendRequestResult =
    Result<ModelClientResponse, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn =
    Arc<dyn Fn(ModelRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// A wrapper around a model provider that maintains an execution
/// environment for the provider and provides a type-erased interface
/// for the other modules.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
    timeout: Option<Duration>,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err).await
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self {
            handler_fn,
            timeout: None,
        }
    }

    /// Limits how long a single call may take.
    #[inline]
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    /// Sends a request and returns the response.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    #[inline]
    pub async fn send_request(
        &self,
        req: ModelRequest,
    ) -> Result<ModelClientResponse, Box<dyn ModelProviderError>> {
        (self.handler_fn)(req).await
    }

    /// Sends `message` with `history` as context, the way a chat session
    /// does.
    ///
    /// On success, the returned history is the context followed by the user
    /// message and the model's turn as the provider reported it.
    pub async fn send_message(
        &self,
        history: &[Turn],
        message: &str,
    ) -> CallOutcome {
        let req = ModelRequest::new(history.to_vec(), message);
        let fut = self.send_request(req.clone());
        let resp_or_err = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, fut).await {
                Ok(resp_or_err) => resp_or_err,
                Err(_) => {
                    warn!("model call timed out after {timeout:?}");
                    return CallOutcome::Failure(FailureReason::Timeout);
                }
            },
            None => fut.await,
        };

        let resp = match resp_or_err {
            Ok(resp) => resp,
            Err(err) => {
                return CallOutcome::Failure(FailureReason::Provider {
                    kind: err.kind(),
                    message: err.to_string(),
                });
            }
        };
        if resp.transcript.trim().is_empty() {
            return CallOutcome::Failure(FailureReason::EmptyResponse);
        }
        if resp.finish_reason == Some(ModelFinishReason::MaxTokens) {
            debug!("model reply was cut at the token limit");
        }

        let model_turn = resp.turn.unwrap_or_else(|| {
            // Downgrade to a text-only turn.
            Turn::model(resp.transcript.clone())
        });
        let ModelRequest {
            mut history,
            message,
        } = req;
        history.push(Turn::user(message));
        history.push(model_turn);

        CallOutcome::Success {
            text: resp.transcript,
            history,
        }
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug)]
pub struct ModelClientResponse {
    pub transcript: String,
    pub turn: Option<Turn>,
    /// The reason the model finished generating.
    pub finish_reason: Option<ModelFinishReason>,
}

/// The result of one model call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallOutcome {
    /// The model replied.
    Success {
        /// The raw reply text.
        text: String,
        /// The chat history after the call, including the new user turn
        /// and the model turn.
        history: Vec<Turn>,
    },
    /// The call could not produce a usable reply.
    Failure(FailureReason),
}

/// Why a model call produced no usable reply.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FailureReason {
    /// No model is configured, the call was not attempted.
    #[error("no model is configured")]
    ConfigurationMissing,
    /// The provider returned an error.
    #[error("provider error ({kind}): {message}")]
    Provider {
        /// The kind reported by the provider.
        kind: ErrorKind,
        /// The provider's error message.
        message: String,
    },
    /// The call took longer than the configured timeout.
    #[error("model call timed out")]
    Timeout,
    /// The model replied with nothing but whitespace.
    #[error("model returned an empty reply")]
    EmptyResponse,
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("got an error: {err:?}");
            return Err(Box::new(err));
        }
    };

    let mut transcript = String::new();
    let turn;
    let mut finish_reason = None;

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(event) => event,
            Err(err) => {
                error!("got an error: {err:?}");
                return Err(Box::new(err));
            }
        };

        let Some(event) = event else {
            // The request has been handled gracefully without errors,
            // now try getting the canonical turn for this response.
            turn = pinned_resp.make_turn();
            break;
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(msg) => {
                transcript.push_str(&msg);
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    trace!("finished a request");

    Ok(ModelClientResponse {
        transcript,
        turn,
        finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use adventure_tale_test_model::{
        PresetEvent, PresetResponse, TestModelProvider,
    };

    use super::*;

    #[tokio::test]
    async fn test_send_request() {
        let mut model_provider = TestModelProvider::default();
        model_provider.add_user_input_step();
        model_provider.add_assistant_response_step(
            PresetResponse::with_events([
                PresetEvent::MessageDelta("Once ".to_owned()),
                PresetEvent::MessageDelta("upon ".to_owned()),
                PresetEvent::MessageDelta("a time.".to_owned()),
            ]),
        );

        let model_client = ModelClient::new(model_provider);

        for _ in 0..3 {
            let resp = model_client
                .send_request(ModelRequest::new(vec![], "Hi"))
                .await
                .unwrap();
            assert_eq!(resp.transcript, "Once upon a time.");
            assert_eq!(resp.turn.unwrap().parts.len(), 3);
            assert_eq!(resp.finish_reason, Some(ModelFinishReason::Stop));
        }
    }

    #[tokio::test]
    async fn test_error_handling() {
        let model_provider = TestModelProvider::default();
        let model_client = ModelClient::new(model_provider);
        let resp_or_err = model_client
            .send_request(ModelRequest::new(vec![], "Hi"))
            .await;
        assert!(matches!(resp_or_err, Err(_)));
    }

    #[tokio::test]
    async fn test_send_message_history() {
        let mut model_provider = TestModelProvider::default();
        for _ in 0..3 {
            model_provider.add_user_input_step();
            model_provider.add_assistant_response_step(
                PresetResponse::with_text("The end."),
            );
        }
        let model_client = ModelClient::new(model_provider.clone());

        let context = vec![Turn::user("Begin"), Turn::model("Once upon")];
        let outcome = model_client.send_message(&context, "Go on").await;
        let CallOutcome::Success { text, history } = outcome else {
            panic!("unexpected outcome: {outcome:?}");
        };
        assert_eq!(text, "The end.");
        assert_eq!(
            history,
            [
                Turn::user("Begin"),
                Turn::model("Once upon"),
                Turn::user("Go on"),
                Turn::model("The end."),
            ]
        );

        let received = model_provider.received_requests();
        assert_eq!(received[0].history, context);
        assert_eq!(received[0].message, "Go on");
    }

    #[tokio::test]
    async fn test_send_message_provider_failure() {
        let mut model_provider = TestModelProvider::default();
        model_provider.add_user_input_step();
        model_provider.add_assistant_response_step(
            PresetResponse::with_text("never").with_failures(0),
        );
        let model_client = ModelClient::new(model_provider);

        let outcome = model_client.send_message(&[], "Hi").await;
        assert!(matches!(
            outcome,
            CallOutcome::Failure(FailureReason::Provider {
                kind: ErrorKind::Other,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_send_message_empty_reply() {
        let mut model_provider = TestModelProvider::default();
        model_provider.add_user_input_step();
        model_provider
            .add_assistant_response_step(PresetResponse::with_text(" \n "));
        let model_client = ModelClient::new(model_provider);

        let outcome = model_client.send_message(&[], "Hi").await;
        assert_eq!(outcome, CallOutcome::Failure(FailureReason::EmptyResponse));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_message_timeout() {
        let mut model_provider = TestModelProvider::default();
        model_provider.add_user_input_step();
        model_provider
            .add_assistant_response_step(PresetResponse::with_text("Late"));
        model_provider.set_delay(Duration::from_secs(30));
        let mut model_client = ModelClient::new(model_provider);
        model_client.set_timeout(Duration::from_secs(5));

        let outcome = model_client.send_message(&[], "Hi").await;
        assert_eq!(outcome, CallOutcome::Failure(FailureReason::Timeout));
    }
}
