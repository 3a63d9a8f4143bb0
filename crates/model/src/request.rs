use crate::turn::Turn;

/// A request to be sent to the model provider.
///
/// The shape mirrors a chat session: `history` is the context the model
/// should see, and `message` is the new user input to respond to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelRequest {
    /// Turns exchanged so far, in chronological order.
    pub history: Vec<Turn>,
    /// The new user message.
    pub message: String,
}

impl ModelRequest {
    /// Creates a request with the given history and new message.
    #[inline]
    pub fn new<S: Into<String>>(history: Vec<Turn>, message: S) -> Self {
        Self {
            history,
            message: message.into(),
        }
    }

    /// Returns the number of turns the model sees, including the new
    /// message.
    #[inline]
    pub fn turn_count(&self) -> usize {
        self.history.len() + 1
    }
}
