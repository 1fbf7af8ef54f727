//! Markdown assembly and export file naming.

use crate::config::TranscriptStyle;
use crate::Message;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

const MAX_FILE_STEM_CHARS: usize = 100;

static INVALID_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*&\x00-\x1F]"#).expect("valid regex"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static UNDERSCORE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{2,}").expect("valid regex"));

/// Immutable Markdown document built from one session's two sequences
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    markdown: String,
    turns: usize,
}

impl Transcript {
    pub fn as_str(&self) -> &str {
        &self.markdown
    }

    pub fn into_string(self) -> String {
        self.markdown
    }

    /// Number of turns written under a heading
    pub fn turns(&self) -> usize {
        self.turns
    }

    /// A document with a title and no turns is not a usable transcript
    pub fn is_empty(&self) -> bool {
        self.turns == 0
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.markdown)
    }
}

/// Interleave the sequences by position.
///
/// Entry `i` of each sequence is written as turn pair `i`, human first. An
/// empty human entry is skipped. This is positional pairing only: a dropped
/// item in either sequence shifts every later pair out of conversational
/// alignment.
pub fn assemble(human: &[Message], assistant: &[Message], style: &TranscriptStyle) -> Transcript {
    let mut markdown = format!("# {}\n\n", style.title);
    let mut turns = 0;

    for i in 0..human.len().max(assistant.len()) {
        if let Some(message) = human.get(i).filter(|m| !m.content.is_empty()) {
            push_turn(&mut markdown, &style.human_label, &message.content);
            turns += 1;
        }
        if let Some(message) = assistant.get(i) {
            push_turn(&mut markdown, &style.assistant_label, &message.content);
            turns += 1;
        }
    }

    Transcript { markdown, turns }
}

fn push_turn(markdown: &mut String, label: &str, content: &str) {
    markdown.push_str("## ");
    markdown.push_str(label);
    markdown.push_str(":\n\n");
    markdown.push_str(content);
    markdown.push_str("\n\n---\n\n");
}

/// Make a conversation title safe to use as a file stem.
///
/// Invalid characters become `_`, whitespace runs become a single `_`,
/// repeated underscores collapse, edge underscores are trimmed, and the
/// result is lowercased and cut to 100 characters.
pub fn sanitize_file_stem(title: &str) -> String {
    let replaced = INVALID_FILENAME_CHARS.replace_all(title, "_");
    let spaced = WHITESPACE_RUN.replace_all(&replaced, "_");
    let collapsed = UNDERSCORE_RUN.replace_all(&spaced, "_");
    collapsed
        .trim_matches('_')
        .to_lowercase()
        .chars()
        .take(MAX_FILE_STEM_CHARS)
        .collect()
}

/// File stem for a conversation, falling back when the title carries no
/// information (missing, a known placeholder, or an untitled conversation)
pub fn file_stem(title: Option<&str>, style: &TranscriptStyle) -> String {
    let title = title.map(str::trim).unwrap_or_default();
    let is_placeholder = title.is_empty()
        || style.placeholder_titles.iter().any(|p| p == title)
        || (!style.untitled_marker.is_empty() && title.contains(&style.untitled_marker));
    if is_placeholder {
        return style.fallback_file_stem.clone();
    }

    let stem = sanitize_file_stem(title);
    if stem.is_empty() {
        style.fallback_file_stem.clone()
    } else {
        stem
    }
}

pub fn file_name(title: Option<&str>, style: &TranscriptStyle) -> String {
    format!("{}.md", file_stem(title, style))
}
