use std::time::Duration;

use adventure_tale_model::ModelProvider;

use super::StoryTeller;
use crate::model_client::ModelClient;

/// [`StoryTeller`] builder.
pub struct StoryTellerBuilder {
    model_client: Option<ModelClient>,
    timeout: Option<Duration>,
}

impl StoryTellerBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: Some(ModelClient::new(provider)),
            timeout: None,
        }
    }

    /// Creates a builder without a model, for when no credential is
    /// configured. The resulting teller only tells fallback stories.
    #[inline]
    pub fn without_model() -> Self {
        Self {
            model_client: None,
            timeout: None,
        }
    }

    /// Limits how long a single model call may take. A call running out of
    /// time is told as a fallback story.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the teller.
    #[inline]
    pub fn build(self) -> StoryTeller {
        let Self {
            mut model_client,
            timeout,
        } = self;
        if let (Some(model_client), Some(timeout)) = (&mut model_client, timeout)
        {
            model_client.set_timeout(timeout);
        }
        StoryTeller { model_client }
    }
}
