use adventure_tale_model::Turn;

use crate::model_client::FailureReason;
use crate::parser::StorySegment;

/// Story segments told when the model cannot be reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fallback {
    /// No credential was configured.
    LockedStorybook,
    /// The call failed, timed out or returned nothing usable.
    WanderedOff,
}

impl Fallback {
    pub fn for_reason(reason: &FailureReason) -> Self {
        match reason {
            FailureReason::ConfigurationMissing => Fallback::LockedStorybook,
            FailureReason::Provider { .. }
            | FailureReason::Timeout
            | FailureReason::EmptyResponse => Fallback::WanderedOff,
        }
    }

    pub fn segment(self) -> StorySegment {
        match self {
            Fallback::LockedStorybook => make_segment(
                "The magic storybook needs a special key to open! Please tell \
                 a grown-up to check the settings.",
                "A locked storybook with a keyhole.",
                &["Try again later"],
            ),
            Fallback::WanderedOff => make_segment(
                "The storyteller seems to have wandered off! Let's try to \
                 find them.",
                "A 'missing storyteller' sign on a path in a forest.",
                &["Try to continue?", "Start a new story?"],
            ),
        }
    }
}

fn make_segment(
    story_text: &str,
    image_prompt: &str,
    choices: &[&str],
) -> StorySegment {
    StorySegment {
        story_text: story_text.to_owned(),
        image_prompt: image_prompt.to_owned(),
        choices: choices.iter().map(|c| (*c).to_owned()).collect(),
    }
}

/// Encodes `segment` as a model turn in the same textual convention the
/// model is asked to follow, so the history stays replayable.
///
/// Only the first choice is kept.
pub fn synthetic_turn(segment: &StorySegment) -> Turn {
    let mut text =
        format!("{} [IMAGE: {}]", segment.story_text, segment.image_prompt);
    if let Some(choice) = segment.choices.first() {
        text.push_str(" CHOICE: ");
        text.push_str(choice);
    }
    Turn::model(text)
}

#[cfg(test)]
mod tests {
    use adventure_tale_model::{ErrorKind, Role};

    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_fallback_for_reason() {
        assert_eq!(
            Fallback::for_reason(&FailureReason::ConfigurationMissing),
            Fallback::LockedStorybook
        );
        assert_eq!(
            Fallback::for_reason(&FailureReason::Provider {
                kind: ErrorKind::RateLimitExceeded,
                message: "slow down".to_owned(),
            }),
            Fallback::WanderedOff
        );
        assert_eq!(
            Fallback::for_reason(&FailureReason::Timeout),
            Fallback::WanderedOff
        );
    }

    #[test]
    fn test_synthetic_turn_text() {
        let turn = synthetic_turn(&Fallback::LockedStorybook.segment());
        assert_eq!(turn.role, Role::Model);
        assert_eq!(
            turn.text(),
            "The magic storybook needs a special key to open! Please tell a \
             grown-up to check the settings. [IMAGE: A locked storybook with \
             a keyhole.] CHOICE: Try again later"
        );
    }

    #[test]
    fn test_synthetic_turn_parses_back() {
        for fallback in [Fallback::LockedStorybook, Fallback::WanderedOff] {
            let segment = fallback.segment();
            let parsed = parse(&synthetic_turn(&segment).text());
            assert_eq!(parsed.story_text, segment.story_text);
            assert_eq!(parsed.image_prompt, segment.image_prompt);
            assert_eq!(parsed.choices, segment.choices[..1]);
        }
    }
}
