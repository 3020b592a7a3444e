// src/message.rs
//! Final message assembly. Pure string concatenation, no business logic.

use crate::ai::select::{Payload, SelectionResult};

/// Digest: `summary\n\nhashtags(\n)\n\nurl`. Post: `text\nurl`.
pub fn compose(selection: &SelectionResult) -> String {
    let url = &selection.selected_identifier;
    match &selection.payload {
        Payload::Digest { summary, hashtags } => {
            format!("{summary}\n\n{}\n\n{url}", hashtags.join("\n"))
        }
        Payload::Post { text } => format!("{text}\n{url}"),
    }
}

/// Caption for the generated-word image post.
pub fn compose_word_post(word: &str, hashtags: &[String]) -> String {
    format!("生成単語: {word}\n{}", hashtags.join(" "))
}
