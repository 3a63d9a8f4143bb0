mod builder;
#[cfg(test)]
mod tests;

use adventure_tale_model::Turn;

use crate::conversation::{ConversationState, RawTurn, normalize};
use crate::error::StoryError;
use crate::fallback::{Fallback, synthetic_turn};
use crate::model_client::{CallOutcome, FailureReason, ModelClient};
use crate::parser::{StorySegment, parse};
use crate::prompt;
pub use builder::StoryTellerBuilder;

/// The result of one story request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoryStep {
    /// What to show to the child.
    pub segment: StorySegment,
    /// The conversation including this step, to be sent back with the
    /// next request.
    pub history: ConversationState,
}

/// Tells interactive stories with a model.
///
/// A teller does not keep any conversation itself. Every request carries
/// the whole history and every [`StoryStep`] returns it with exactly one
/// user turn and one model turn appended, whether or not the model could
/// be reached. Model failures never surface as errors: they are told as
/// fallback story segments, so play is never interrupted.
#[derive(Clone)]
pub struct StoryTeller {
    model_client: Option<ModelClient>,
}

impl StoryTeller {
    /// Starts a new story about `theme`.
    pub async fn start_story(
        &self,
        theme: &str,
    ) -> Result<StoryStep, StoryError> {
        if theme.trim().is_empty() {
            return Err(StoryError::InvalidRequest("theme is required"));
        }
        info!("starting a story about {:?}", theme.trim());
        self.tell(Vec::new(), prompt::start_message(theme)).await
    }

    /// Continues the story in `history` with the child's `choice`.
    ///
    /// Parts of the incoming turns are normalized with
    /// [`coerce_part`](crate::conversation::coerce_part).
    pub async fn continue_story(
        &self,
        history: Vec<RawTurn>,
        choice: &str,
    ) -> Result<StoryStep, StoryError> {
        if history.is_empty() {
            return Err(StoryError::InvalidRequest("story history is required"));
        }
        if choice.trim().is_empty() {
            return Err(StoryError::InvalidRequest("choice text is required"));
        }
        info!("continuing a story of {} turns", history.len());
        self.tell(normalize(&history), prompt::choice_message(choice))
            .await
    }

    async fn tell(
        &self,
        context: Vec<Turn>,
        message: String,
    ) -> Result<StoryStep, StoryError> {
        let expected_len = context.len() + 2;
        let outcome = match &self.model_client {
            Some(model_client) => {
                model_client.send_message(&context, &message).await
            }
            None => CallOutcome::Failure(FailureReason::ConfigurationMissing),
        };

        let (segment, history) = match outcome {
            CallOutcome::Success { text, history } => (parse(&text), history),
            CallOutcome::Failure(reason) => {
                warn!("telling a fallback story: {reason}");
                let segment = Fallback::for_reason(&reason).segment();
                let mut history = context;
                history.push(Turn::user(message));
                history.push(synthetic_turn(&segment));
                (segment, history)
            }
        };

        if history.len() != expected_len {
            error!(
                "history has {} turns after the call, expected {expected_len}",
                history.len()
            );
            return Err(StoryError::Internal(
                "conversation history is inconsistent".to_owned(),
            ));
        }

        Ok(StoryStep {
            segment,
            history: history.into(),
        })
    }
}
