const STORYTELLER_PREAMBLE: &str = include_str!("./prompts/storyteller.md");

/// The first user message of every story.
pub fn start_message(theme: &str) -> String {
    format!(
        "{}\n\nStart a new adventure story about: {}",
        STORYTELLER_PREAMBLE.trim_end(),
        theme.trim()
    )
}

pub fn choice_message(choice: &str) -> String {
    format!("The child chose: \"{}\". Continue the story.", choice.trim())
}
