use thiserror::Error;

/// Errors surfaced to the caller of a story request.
///
/// Model failures are not part of this type, they degrade into fallback
/// story segments instead.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StoryError {
    /// The caller supplied empty or missing required fields.
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),
    /// An invariant of the story logic was broken.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StoryError {
    /// Returns whether the error was caused by the caller.
    #[inline]
    pub fn is_client_error(&self) -> bool {
        matches!(self, StoryError::InvalidRequest(_))
    }
}
