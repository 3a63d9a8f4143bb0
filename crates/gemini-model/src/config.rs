use std::fmt::Debug;

use serde::Serialize;

const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";
const DEFAULT_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta";
const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Sampling parameters sent with every request.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling probability mass.
    pub top_p: f32,
    /// Number of candidate tokens considered at each step.
    pub top_k: u32,
    /// Upper bound of generated tokens.
    pub max_output_tokens: u32,
    /// MIME type of the generated text.
    pub response_mime_type: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
            response_mime_type: "text/plain".to_owned(),
        }
    }
}

/// A content-safety threshold for one harm category.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct SafetySetting {
    /// The harm category, e.g. `HARM_CATEGORY_HARASSMENT`.
    pub category: String,
    /// The blocking threshold, e.g. `BLOCK_MEDIUM_AND_ABOVE`.
    pub threshold: String,
}

impl SafetySetting {
    fn default_settings() -> Vec<Self> {
        HARM_CATEGORIES
            .iter()
            .map(|category| SafetySetting {
                category: (*category).to_owned(),
                threshold: "BLOCK_MEDIUM_AND_ABOVE".to_owned(),
            })
            .collect()
    }
}

/// Builder for [`GeminiConfig`].
#[derive(Clone, PartialEq)]
pub struct GeminiConfigBuilder {
    api_key: String,
    model: Option<String>,
    base_url: Option<String>,
    generation_config: Option<GenerationConfig>,
    safety_settings: Option<Vec<SafetySetting>>,
}

impl GeminiConfigBuilder {
    /// Creates a builder with the given API key.
    #[inline]
    pub fn with_api_key<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            model: None,
            base_url: None,
            generation_config: None,
            safety_settings: None,
        }
    }

    /// Sets the model to use.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets a custom base URL.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Overrides the sampling parameters.
    #[inline]
    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = Some(config);
        self
    }

    /// Overrides the safety settings.
    #[inline]
    pub fn with_safety_settings(
        mut self,
        settings: impl Into<Vec<SafetySetting>>,
    ) -> Self {
        self.safety_settings = Some(settings.into());
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.api_key,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: self
                .base_url
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            generation_config: self.generation_config.unwrap_or_default(),
            safety_settings: self
                .safety_settings
                .unwrap_or_else(SafetySetting::default_settings),
        }
    }
}

impl Debug for GeminiConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfigBuilder")
            .field("api_key", &"<deducted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("generation_config", &self.generation_config)
            .field("safety_settings", &self.safety_settings)
            .finish()
    }
}

/// Configuration for the Gemini provider.
#[derive(Clone, PartialEq)]
pub struct GeminiConfig {
    pub(crate) api_key: String,
    pub(crate) model: String,
    pub(crate) base_url: String,
    pub(crate) generation_config: GenerationConfig,
    pub(crate) safety_settings: Vec<SafetySetting>,
}

impl GeminiConfig {
    /// Returns the model name.
    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    pub(crate) fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }
}

impl Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<deducted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("generation_config", &self.generation_config)
            .field("safety_settings", &self.safety_settings)
            .finish()
    }
}
