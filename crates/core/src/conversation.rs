//! Conversation-related types.
//!
//! Callers own the conversation between requests. They get a
//! [`ConversationState`] back from every story step and hand it in again
//! (possibly after a round trip through JSON) to continue the story.
//! Incoming histories are accepted loosely as [`RawTurn`]s and normalized
//! with [`coerce_part`].

use adventure_tale_model::{Role, TextPart, Turn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The ordered turns exchanged so far.
#[derive(Clone, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationState {
    turns: Vec<Turn>,
}

impl ConversationState {
    /// Returns the turns in chronological order.
    #[inline]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Returns the number of turns.
    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns whether no turn has been exchanged.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Returns the most recent turn.
    #[inline]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Converts the state into the loose form accepted by
    /// [`StoryTeller::continue_story`](crate::StoryTeller::continue_story).
    pub fn into_raw(self) -> Vec<RawTurn> {
        self.turns.into_iter().map(RawTurn::from).collect()
    }

    /// Consumes the state and returns the turns.
    #[inline]
    pub fn into_turns(self) -> Vec<Turn> {
        self.turns
    }
}

impl From<Vec<Turn>> for ConversationState {
    #[inline]
    fn from(turns: Vec<Turn>) -> Self {
        Self { turns }
    }
}

/// A turn as supplied by a caller, whose parts are not validated yet.
///
/// Parts may be bare strings or records carrying a `text` field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawTurn {
    /// Who produced this turn.
    pub role: Role,
    /// Unvalidated parts.
    #[serde(default)]
    pub parts: Vec<Value>,
}

impl RawTurn {
    /// Normalizes this turn, dropping the parts without recoverable text.
    pub fn normalize(&self) -> Turn {
        Turn {
            role: self.role,
            parts: self.parts.iter().filter_map(coerce_part).collect(),
        }
    }
}

impl From<Turn> for RawTurn {
    fn from(turn: Turn) -> Self {
        Self {
            role: turn.role,
            parts: turn
                .parts
                .into_iter()
                .map(|part| Value::String(part.text))
                .collect(),
        }
    }
}

/// Coerces a loosely-typed part into a [`TextPart`].
///
/// Accepted shapes are a bare string and an object with a string `text`
/// field (other fields are ignored). Empty text is rejected along with
/// every other shape.
pub fn coerce_part(part: &Value) -> Option<TextPart> {
    let text = match part {
        Value::String(text) => text.as_str(),
        Value::Object(fields) => fields.get("text")?.as_str()?,
        _ => return None,
    };
    if text.is_empty() {
        return None;
    }
    Some(TextPart::new(text))
}

/// Normalizes every turn of a caller-supplied history.
pub fn normalize(history: &[RawTurn]) -> Vec<Turn> {
    history.iter().map(RawTurn::normalize).collect()
}
