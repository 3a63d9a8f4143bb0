use std::env;
use std::time::Duration;

use adventure_tale_core::conversation::ConversationState;
use adventure_tale_core::{
    StoryError, StorySegment, StoryStep, StoryTeller, StoryTellerBuilder,
};
use adventure_tale_gemini_model::{GeminiConfigBuilder, GeminiProvider};
use adventure_tale_model::ModelProvider;

const API_KEY_VAR: &str = "GOOGLE_API_KEY";
const MODEL_VAR: &str = "GEMINI_MODEL";
const BASE_URL_VAR: &str = "GEMINI_BASE_URL";

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    teller_builder: StoryTellerBuilder,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let teller_builder = StoryTellerBuilder::with_model_provider(provider);
        Self { teller_builder }
    }

    /// Creates a session builder without a model. Every step of such a
    /// session is a fallback segment.
    pub fn without_model() -> Self {
        Self {
            teller_builder: StoryTellerBuilder::without_model(),
        }
    }

    /// Creates a session builder for Gemini, configured from the
    /// environment.
    ///
    /// `GOOGLE_API_KEY` holds the credential, `GEMINI_MODEL` and
    /// `GEMINI_BASE_URL` optionally override the defaults. Without a
    /// credential, the session has no model.
    pub fn from_env() -> Self {
        let Some(api_key) = env_var(API_KEY_VAR) else {
            warn!("{API_KEY_VAR} is not set, stories cannot be told");
            return Self::without_model();
        };

        let mut config_builder = GeminiConfigBuilder::with_api_key(api_key);
        if let Some(model) = env_var(MODEL_VAR) {
            config_builder = config_builder.with_model(model);
        }
        if let Some(base_url) = env_var(BASE_URL_VAR) {
            config_builder = config_builder.with_base_url(base_url);
        }
        let config = config_builder.build();
        debug!("using gemini: {config:?}");
        Self::with_model_provider(GeminiProvider::new(config))
    }

    /// Limits how long a single model call may take.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.teller_builder = self.teller_builder.with_timeout(timeout);
        self
    }

    /// Builds a new session.
    pub fn build(self) -> Session {
        Session {
            teller: self.teller_builder.build(),
            history: ConversationState::default(),
            segment: None,
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// A story being played, like a book that remembers the page it is open at.
///
/// The session keeps the history between steps, and it is basically a
/// wrapper around [`StoryTeller`], which is stateless.
pub struct Session {
    teller: StoryTeller,
    history: ConversationState,
    segment: Option<StorySegment>,
}

impl Session {
    /// Returns the underlying teller.
    #[inline]
    pub fn teller(&self) -> &StoryTeller {
        &self.teller
    }

    /// Returns the history of the current story.
    #[inline]
    pub fn history(&self) -> &ConversationState {
        &self.history
    }

    /// Returns the latest segment of the current story.
    #[inline]
    pub fn segment(&self) -> Option<&StorySegment> {
        self.segment.as_ref()
    }

    /// Starts a new story, dropping the current one.
    pub async fn start(
        &mut self,
        theme: &str,
    ) -> Result<&StorySegment, StoryError> {
        let step = self.teller.start_story(theme).await?;
        Ok(self.advance(step))
    }

    /// Continues the current story with `choice`.
    ///
    /// Fails with [`StoryError::InvalidRequest`] if no story was started.
    pub async fn choose(
        &mut self,
        choice: &str,
    ) -> Result<&StorySegment, StoryError> {
        let history = self.history.clone().into_raw();
        let step = self.teller.continue_story(history, choice).await?;
        Ok(self.advance(step))
    }

    fn advance(&mut self, step: StoryStep) -> &StorySegment {
        let StoryStep { segment, history } = step;
        self.history = history;
        self.segment.insert(segment)
    }
}
