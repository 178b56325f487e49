//! Prompt text and fixed user-facing copy

/// Categories offered at the start of every flow
pub const CATEGORIES: [&str; 5] = ["Auto", "Health", "Travel", "ML", "Media"];

pub const CHOOSE_CATEGORY: &str = "Choose podcast category:";
pub const CHOOSE_TOPIC: &str = "Choose a specific topic:";
pub const AUDIO_CAPTION: &str = "Here's your podcast, enjoy!";
pub const GENERATION_ERROR: &str = "Error generating content. Please try again.";
pub const NO_SCRIPT: &str = "No script available. Please create a podcast first!";

/// Longest script excerpt returned by the text command (Telegram caps messages at 4096)
pub const MAX_SCRIPT_CHARS: usize = 4000;
pub const TRUNCATION_MARKER: &str = "\n... [truncated]";

/// Topics shown on the first keyboard row; the rest go on the second
pub const FIRST_ROW_TOPICS: usize = 3;

pub fn topics_prompt(category: &str) -> String {
    format!("Generate 5 podcast topics about {category}. Return as comma-separated list.")
}

pub fn script_prompt(category: &str, topic: &str) -> String {
    format!(
        "Create a 2-minute podcast script about {topic} in {category} category. Keep it under 400 words."
    )
}

/// Split a comma-separated completion into topic labels.
///
/// Segments are trimmed and empty ones dropped, so a trailing comma or a
/// blank line never becomes a button.
pub fn split_topics(completion: &str) -> Vec<String> {
    completion
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Arrange topics as keyboard rows: up to three on the first row, the rest on the second
pub fn topic_rows(topics: &[String]) -> Vec<Vec<String>> {
    let split = topics.len().min(FIRST_ROW_TOPICS);
    let (first, rest) = topics.split_at(split);
    let mut rows = vec![first.to_vec()];
    if !rest.is_empty() {
        rows.push(rest.to_vec());
    }
    rows
}

pub fn category_rows() -> Vec<Vec<String>> {
    vec![CATEGORIES.iter().map(ToString::to_string).collect()]
}

/// Cut a script for the text command, appending a visible marker if it was too long
pub fn truncate_script(script: &str) -> String {
    match script.char_indices().nth(MAX_SCRIPT_CHARS) {
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + TRUNCATION_MARKER.len());
            out.push_str(script.get(..cut).unwrap_or(script));
            out.push_str(TRUNCATION_MARKER);
            out
        }
        None => script.to_string(),
    }
}
