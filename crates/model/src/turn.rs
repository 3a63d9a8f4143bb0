use serde::{Deserialize, Serialize};

/// The author of a turn.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The player (or the storyteller prompt sent on their behalf).
    User,
    /// The generative model.
    #[serde(alias = "assistant")]
    Model,
}

/// A piece of text inside a turn.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextPart {
    /// The text content.
    pub text: String,
}

impl TextPart {
    /// Creates a new `TextPart`.
    #[inline]
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self { text: text.into() }
    }
}

/// One exchange unit in a conversation.
///
/// Turns are never mutated after being appended to a history, and the
/// order of turns in a history is the chronological order of the dialogue.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Turn {
    /// Who produced this turn.
    pub role: Role,
    /// Text parts of this turn, in order.
    pub parts: Vec<TextPart>,
}

impl Turn {
    /// Creates a turn with a single text part.
    #[inline]
    pub fn new<S: Into<String>>(role: Role, text: S) -> Self {
        Self {
            role,
            parts: vec![TextPart::new(text)],
        }
    }

    /// Creates a user turn with a single text part.
    #[inline]
    pub fn user<S: Into<String>>(text: S) -> Self {
        Self::new(Role::User, text)
    }

    /// Creates a model turn with a single text part.
    #[inline]
    pub fn model<S: Into<String>>(text: S) -> Self {
        Self::new(Role::Model, text)
    }

    /// Returns the text of all parts joined together.
    pub fn text(&self) -> String {
        self.parts.iter().map(|p| p.text.as_str()).collect()
    }
}
