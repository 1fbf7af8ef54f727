use crate::config::TranscriptStyle;
use crate::transcript::{assemble, file_name, file_stem, sanitize_file_stem};
use crate::Message;

fn humans(texts: &[&str]) -> Vec<Message> {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| Message::human(*t, i))
        .collect()
}

fn replies(texts: &[&str]) -> Vec<Message> {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| Message::assistant(*t, i))
        .collect()
}

#[test]
fn test_positional_interleave_with_short_assistant_sequence() {
    let style = TranscriptStyle::default();
    let transcript = assemble(&humans(&["h0", "h1"]), &replies(&["c0"]), &style);

    let expected = "# Conversation with Claude\n\n\
                    ## Human:\n\nh0\n\n---\n\n\
                    ## Claude:\n\nc0\n\n---\n\n\
                    ## Human:\n\nh1\n\n---\n\n";
    assert_eq!(transcript.as_str(), expected);
    assert_eq!(transcript.turns(), 3);
}

#[test]
fn test_extra_assistant_turns_trail_without_human_heading() {
    let style = TranscriptStyle::default();
    let transcript = assemble(&humans(&["h0"]), &replies(&["c0", "c1"]), &style);

    let expected = "# Conversation with Claude\n\n\
                    ## Human:\n\nh0\n\n---\n\n\
                    ## Claude:\n\nc0\n\n---\n\n\
                    ## Claude:\n\nc1\n\n---\n\n";
    assert_eq!(transcript.as_str(), expected);
}

#[test]
fn test_empty_sequences_produce_no_usable_transcript() {
    let transcript = assemble(&[], &[], &TranscriptStyle::default());
    assert!(transcript.is_empty());
    assert_eq!(transcript.as_str(), "# Conversation with Claude\n\n");
}

#[test]
fn test_empty_human_entry_is_skipped_but_keeps_its_slot() {
    let style = TranscriptStyle::default();
    let transcript = assemble(&humans(&["", "h1"]), &replies(&["c0", "c1"]), &style);

    let expected = "# Conversation with Claude\n\n\
                    ## Claude:\n\nc0\n\n---\n\n\
                    ## Human:\n\nh1\n\n---\n\n\
                    ## Claude:\n\nc1\n\n---\n\n";
    assert_eq!(transcript.as_str(), expected);
}

#[test]
fn test_custom_labels_are_used() {
    let style = TranscriptStyle {
        title: "Export".into(),
        human_label: "User".into(),
        assistant_label: "Assistant".into(),
        ..TranscriptStyle::default()
    };
    let transcript = assemble(&humans(&["q"]), &replies(&["a"]), &style);
    assert_eq!(
        transcript.as_str(),
        "# Export\n\n## User:\n\nq\n\n---\n\n## Assistant:\n\na\n\n---\n\n"
    );
}

#[test]
fn test_content_is_emitted_verbatim() {
    let body = "```rust\nfn main() {}\n```\n\n- item";
    let transcript = assemble(&humans(&[body]), &[], &TranscriptStyle::default());
    assert!(transcript.as_str().contains(body));
}

#[test]
fn test_sanitize_replaces_invalid_chars_and_collapses() {
    assert_eq!(sanitize_file_stem("My Chat: Q&A/Test"), "my_chat_q_a_test");
}

#[test]
fn test_sanitize_trims_edge_underscores_and_whitespace_runs() {
    assert_eq!(sanitize_file_stem("  <Draft>  notes\t\n?? "), "draft_notes");
    assert_eq!(sanitize_file_stem("a___b"), "a_b");
}

#[test]
fn test_sanitize_truncates_to_100_chars() {
    let long = "x".repeat(250);
    assert_eq!(sanitize_file_stem(&long).chars().count(), 100);

    let wide = "é".repeat(150);
    assert_eq!(sanitize_file_stem(&wide).chars().count(), 100);
}

#[test]
fn test_placeholder_titles_fall_back() {
    let style = TranscriptStyle::default();
    assert_eq!(file_stem(Some("New conversation"), &style), "claude_conversation");
    assert_eq!(file_stem(Some("Claude"), &style), "claude_conversation");
    assert_eq!(file_stem(Some("   "), &style), "claude_conversation");
    assert_eq!(file_stem(None, &style), "claude_conversation");
}

#[test]
fn test_title_made_only_of_invalid_chars_falls_back() {
    let style = TranscriptStyle::default();
    assert_eq!(file_stem(Some("???"), &style), "claude_conversation");
}

#[test]
fn test_file_name_appends_markdown_extension() {
    let style = TranscriptStyle::default();
    assert_eq!(file_name(Some("Rust lifetimes"), &style), "rust_lifetimes.md");
    assert_eq!(file_name(None, &style), "claude_conversation.md");
}
