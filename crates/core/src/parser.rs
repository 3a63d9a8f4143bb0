//! Extracts story segments from free-form model replies.
//!
//! The model is asked to answer with a paragraph, an `[IMAGE: ...]` tag and
//! a few `CHOICE:` lines, but nothing forces it to. Parsing is done in
//! several passes, each one a fallback for the previous, and never fails:
//! whatever the reply looks like, the result has a non-empty story text and
//! at least one choice.

use serde::{Deserialize, Serialize};

/// Image prompt used when the reply carries no usable image tag.
pub const DEFAULT_IMAGE_PROMPT: &str = "A delightful scene.";
/// Story text used when choices were found but no narrative.
pub const CONTINUES_STORY_TEXT: &str = "The story continues...";
/// Choice offered when the reply has none.
pub const GENERIC_CHOICE: &str = "What happens next?";
/// Story text used when the reply has neither narrative nor choices.
pub const SILENCE_STORY_TEXT: &str =
    "It's a mysterious silence... what could be happening?";
/// Image prompt paired with [`SILENCE_STORY_TEXT`].
pub const SILENCE_IMAGE_PROMPT: &str = "A mysterious, empty scene.";

const IMAGE_MARKER: &str = "[IMAGE:";
const CHOICE_PREFIX: &str = "CHOICE:";

/// The structured result of one story step.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorySegment {
    /// The narrative paragraph.
    pub story_text: String,
    /// A description of the scene, for an illustration.
    pub image_prompt: String,
    /// Choices offered to the child, never empty.
    pub choices: Vec<String>,
}

enum ImageMarker<'a> {
    Closed {
        start: usize,
        // Byte index right after the closing bracket.
        end: usize,
        prompt: &'a str,
    },
    Unclosed {
        start: usize,
    },
}

fn find_image_marker(text: &str) -> Option<ImageMarker<'_>> {
    let start = text.find(IMAGE_MARKER)?;
    let prompt_start = start + IMAGE_MARKER.len();
    let Some(prompt_len) = text[prompt_start..].find(']') else {
        return Some(ImageMarker::Unclosed { start });
    };
    Some(ImageMarker::Closed {
        start,
        end: prompt_start + prompt_len + 1,
        prompt: text[prompt_start..prompt_start + prompt_len].trim(),
    })
}

/// Returns the choice text if `line` (already trimmed) is a choice line.
#[inline]
fn choice_text(line: &str) -> Option<&str> {
    line.strip_prefix(CHOICE_PREFIX).map(str::trim)
}

fn scan_choices(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| choice_text(line.trim()))
        .filter(|choice| !choice.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Everything before the first choice marker, without the image tag.
fn narrative_before_choices(text: &str) -> String {
    let end = text.find(CHOICE_PREFIX).unwrap_or(text.len());
    let candidate = text[..end].trim();
    match find_image_marker(candidate) {
        Some(ImageMarker::Closed { start, end, .. }) => {
            format!("{}{}", &candidate[..start], &candidate[end..])
                .trim()
                .to_owned()
        }
        Some(ImageMarker::Unclosed { start }) => {
            candidate[..start].trim().to_owned()
        }
        None => candidate.to_owned(),
    }
}

/// Parses a raw model reply into a [`StorySegment`].
pub fn parse(raw: &str) -> StorySegment {
    let mut image_prompt = DEFAULT_IMAGE_PROMPT.to_owned();

    // Pass 1: split around the image tag. A tag that is never closed is
    // treated as part of the narrative.
    let (mut story_text, remainder) = match find_image_marker(raw) {
        Some(ImageMarker::Closed { start, end, prompt }) => {
            if !prompt.is_empty() {
                image_prompt = prompt.to_owned();
            }
            (raw[..start].trim().to_owned(), raw[end..].trim())
        }
        Some(ImageMarker::Unclosed { .. }) | None => {
            (raw.trim().to_owned(), "")
        }
    };

    // Pass 2: choices after the image tag. Lines before the first choice
    // continue the narrative, lines after it are dropped.
    let mut choices = Vec::new();
    let mut continuation = Vec::new();
    for line in remainder.lines().map(str::trim) {
        if let Some(choice) = choice_text(line) {
            if !choice.is_empty() {
                choices.push(choice.to_owned());
            }
        } else if choices.is_empty() && !line.is_empty() {
            continuation.push(line);
        }
    }
    if !continuation.is_empty() {
        if !story_text.is_empty() {
            story_text.push('\n');
        }
        story_text.push_str(&continuation.join("\n"));
    }

    // Pass 3: the choices may sit anywhere in the reply, e.g. before the
    // image tag. When they are found this way the narrative is recomputed
    // from scratch.
    if choices.is_empty() {
        choices = scan_choices(raw);
        if !choices.is_empty() {
            debug!("choices recovered from the whole reply");
            story_text = narrative_before_choices(raw);
        }
    }

    // Pass 4: never hand out an empty field.
    if choices.is_empty() {
        debug!("no choices in the reply, using the generic one");
        choices.push(GENERIC_CHOICE.to_owned());
        if story_text.trim().is_empty() {
            story_text = SILENCE_STORY_TEXT.to_owned();
            image_prompt = SILENCE_IMAGE_PROMPT.to_owned();
        }
    } else if story_text.trim().is_empty() {
        story_text = CONTINUES_STORY_TEXT.to_owned();
    }

    StorySegment {
        story_text,
        image_prompt,
        choices,
    }
}
