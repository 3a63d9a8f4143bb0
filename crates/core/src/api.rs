//! Request and response bodies for exposing a [`StoryTeller`] as a service.
//!
//! The shapes are the JSON bodies of the story endpoints. Transport is left
//! to the caller, [`start`] and [`continue_story`] only translate bodies and
//! errors.

use serde::{Deserialize, Serialize};

use crate::conversation::{ConversationState, RawTurn};
use crate::{StoryError, StoryStep, StoryTeller};

/// Body of a request to start a story.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryStartRequest {
    /// What the story should be about.
    pub theme: String,
}

/// Body of a request to continue a story.
///
/// Missing fields deserialize as empty and are rejected by
/// [`continue_story`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryChoiceRequest {
    /// The history returned by the previous step.
    #[serde(default)]
    pub story_history: Vec<RawTurn>,
    /// The choice made by the child.
    #[serde(default)]
    pub choice_text: String,
}

/// Body of a successful story response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorySegmentResponse {
    /// The narrative paragraph.
    pub story_text: String,
    /// A description of the scene, for an illustration.
    pub image_prompt: String,
    /// Choices offered to the child.
    pub choices: Vec<String>,
    /// The history to send with the next request.
    pub updated_story_history: ConversationState,
}

impl From<StoryStep> for StorySegmentResponse {
    fn from(step: StoryStep) -> Self {
        let StoryStep { segment, history } = step;
        Self {
            story_text: segment.story_text,
            image_prompt: segment.image_prompt,
            choices: segment.choices,
            updated_story_history: history,
        }
    }
}

/// Body of a failed story response.
///
/// Only the status and a generic detail are exposed, the underlying error
/// is logged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApiError {
    /// HTTP-style status code, `400` or `500`.
    #[serde(skip)]
    pub status: u16,
    /// A short human-readable description.
    pub detail: &'static str,
}

impl ApiError {
    fn new(
        err: StoryError,
        client_detail: &'static str,
        internal_detail: &'static str,
    ) -> Self {
        if err.is_client_error() {
            debug!("rejected a story request: {err}");
            Self {
                status: 400,
                detail: client_detail,
            }
        } else {
            error!("story request failed: {err}");
            Self {
                status: 500,
                detail: internal_detail,
            }
        }
    }

    /// Returns whether the request itself was at fault.
    #[inline]
    pub fn is_client_error(&self) -> bool {
        self.status < 500
    }
}

/// Handles a start request.
pub async fn start(
    teller: &StoryTeller,
    req: StoryStartRequest,
) -> Result<StorySegmentResponse, ApiError> {
    teller
        .start_story(&req.theme)
        .await
        .map(StorySegmentResponse::from)
        .map_err(|err| {
            ApiError::new(err, "Theme is required.", "Failed to start story.")
        })
}

/// Handles a continue request.
pub async fn continue_story(
    teller: &StoryTeller,
    req: StoryChoiceRequest,
) -> Result<StorySegmentResponse, ApiError> {
    teller
        .continue_story(req.story_history, &req.choice_text)
        .await
        .map(StorySegmentResponse::from)
        .map_err(|err| {
            ApiError::new(
                err,
                "Story history and choice text are required.",
                "Failed to continue story.",
            )
        })
}
