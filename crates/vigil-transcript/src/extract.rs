//! Entry extraction for the sync worker's prompt.
//!
//! Decodes a line range, keeps only conversation-relevant records, filters
//! previously-injected machine context out (it must not be re-summarised as
//! if it were organic conversation), and truncates large fields to bound
//! prompt size.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::record::{Block, Content, RawRecord};

/// Wrapper the context injector emits; the noise filter matches it
/// literally so producer and filter cannot drift apart.
pub const CONTEXT_MARKER: &str = "<vigil:project-context>";
const REMINDER_MARKER: &str = "<system-reminder>";

/// User text shorter than this is never treated as injected noise.
const NOISE_MIN_LEN: usize = 5000;
const DIALOGUE_CAP: usize = 3000;
const THINKING_CAP: usize = 2000;
const TOOL_ARG_CAP: usize = 200;

/// Tool-input fields that carry large payloads (file bodies, diffs).
const DROPPED_INPUT_KEYS: [&str; 4] = ["content", "old_string", "new_string", "new_source"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Entry {
    User {
        text: String,
    },
    Assistant {
        text: String,
    },
    Thinking {
        text: String,
    },
    ToolUse {
        tool: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        input: Option<serde_json::Map<String, Value>>,
    },
}

impl Entry {
    /// Dialogue entries are what make a session worth syncing; thinking
    /// and tool records alone do not.
    pub fn is_meaningful(&self) -> bool {
        matches!(self, Entry::User { .. } | Entry::Assistant { .. })
    }
}

/// Decode and classify lines in `[start, end)`. Missing file or decode
/// failures degrade to fewer entries, never an error.
pub fn extract_entries(path: &Path, start: usize, end: usize) -> Vec<Entry> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return Vec::new(),
    };
    let mut entries = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        if i < start {
            continue;
        }
        if i >= end {
            break;
        }
        let Ok(line) = line else { break };
        let Ok(rec) = serde_json::from_str::<RawRecord>(&line) else {
            continue;
        };
        classify(&rec, &mut entries);
    }
    entries
}

fn classify(rec: &RawRecord, entries: &mut Vec<Entry>) {
    // Progress, snapshots, and system records carry nothing downstream.
    if !matches!(rec.kind.as_str(), "user" | "assistant") {
        return;
    }
    let Some(message) = &rec.message else { return };
    let role = message.role.as_deref().unwrap_or("");

    match (&rec.kind[..], role, &message.content) {
        ("user", "user", Some(Content::Text(text))) => {
            push_user_text(text, entries);
        }
        ("user", "user", Some(Content::Blocks(blocks))) => {
            // Tool results come back on user records; they are not dialogue.
            if blocks.iter().any(|b| matches!(b, Block::ToolResult)) {
                return;
            }
            for block in blocks {
                if let Block::Text { text } = block {
                    push_user_text(text, entries);
                }
            }
        }
        ("assistant", "assistant", Some(Content::Blocks(blocks))) => {
            for block in blocks {
                match block {
                    Block::Text { text } if !text.trim().is_empty() => {
                        entries.push(Entry::Assistant {
                            text: truncate_chars(text, DIALOGUE_CAP),
                        });
                    }
                    Block::Thinking { thinking } if !thinking.trim().is_empty() => {
                        entries.push(Entry::Thinking {
                            text: truncate_chars(thinking, THINKING_CAP),
                        });
                    }
                    Block::ToolUse { name, input } => {
                        entries.push(Entry::ToolUse {
                            tool: if name.is_empty() {
                                "unknown".into()
                            } else {
                                name.clone()
                            },
                            input: summarize_tool_input(input),
                        });
                    }
                    _ => {}
                }
            }
        }
        _ => {}
    }
}

fn push_user_text(text: &str, entries: &mut Vec<Entry>) {
    if text.trim().is_empty() || looks_injected(text) {
        return;
    }
    entries.push(Entry::User {
        text: truncate_chars(text, DIALOGUE_CAP),
    });
}

fn looks_injected(text: &str) -> bool {
    text.len() > NOISE_MIN_LEN
        && (text.contains(CONTEXT_MARKER) || text.contains(REMINDER_MARKER))
}

/// Keep small scalar/string arguments; drop large payload fields by name
/// and cap what remains.
fn summarize_tool_input(input: &Value) -> Option<serde_json::Map<String, Value>> {
    let map = input.as_object()?;
    let mut summary = serde_json::Map::new();
    for (key, value) in map {
        if DROPPED_INPUT_KEYS.contains(&key.as_str()) {
            continue;
        }
        let kept = match value {
            Value::String(s) if s.len() > TOOL_ARG_CAP => {
                Value::String(format!("{}...", truncate_chars(s, TOOL_ARG_CAP)))
            }
            other => other.clone(),
        };
        summary.insert(key.clone(), kept);
    }
    Some(summary)
}

/// Byte-capped truncation that never splits a UTF-8 char.
fn truncate_chars(s: &str, cap: usize) -> String {
    if s.len() <= cap {
        return s.to_string();
    }
    let mut end = cap;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn transcript(lines: &[String]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    fn user(text: &str) -> String {
        serde_json::json!({"type":"user","message":{"role":"user","content":text}}).to_string()
    }

    fn assistant_blocks(blocks: Value) -> String {
        serde_json::json!({"type":"assistant","message":{"role":"assistant","content":blocks}})
            .to_string()
    }

    #[test]
    fn dialogue_and_tools_are_classified() {
        let lines = vec![
            user("fix the bug"),
            assistant_blocks(serde_json::json!([
                {"type":"thinking","thinking":"where is it"},
                {"type":"text","text":"found it"},
                {"type":"tool_use","name":"Edit","input":{"file_path":"src/a.rs","old_string":"x","new_string":"y"}}
            ])),
            r#"{"type":"progress","data":{}}"#.to_string(),
            r#"{"type":"file-history-snapshot"}"#.to_string(),
            r#"{"type":"system","subtype":"compact_boundary"}"#.to_string(),
        ];
        let t = transcript(&lines);
        let entries = extract_entries(t.path(), 0, lines.len());
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0], Entry::User { text: "fix the bug".into() });
        assert!(matches!(&entries[1], Entry::Thinking { .. }));
        assert!(matches!(&entries[2], Entry::Assistant { .. }));
        let Entry::ToolUse { tool, input } = &entries[3] else {
            panic!("expected tool use");
        };
        assert_eq!(tool, "Edit");
        let input = input.as_ref().unwrap();
        assert_eq!(input["file_path"], "src/a.rs");
        assert!(!input.contains_key("old_string"));
        assert!(!input.contains_key("new_string"));
    }

    #[test]
    fn tool_results_on_user_records_are_dropped() {
        let line = serde_json::json!({"type":"user","message":{"role":"user","content":[
            {"type":"tool_result","content":"big output"},
            {"type":"text","text":"should not appear"}
        ]}})
        .to_string();
        let t = transcript(&[line]);
        assert!(extract_entries(t.path(), 0, 1).is_empty());
    }

    #[test]
    fn injected_context_is_filtered_out() {
        let noise = format!("{}{}", CONTEXT_MARKER, "x".repeat(NOISE_MIN_LEN));
        let lines = vec![user(&noise), user("real question")];
        let t = transcript(&lines);
        let entries = extract_entries(t.path(), 0, 2);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0], Entry::User { text: "real question".into() });
    }

    #[test]
    fn long_organic_text_is_kept_but_truncated() {
        // Long but without a marker: organic, so kept (capped).
        let long = "y".repeat(NOISE_MIN_LEN + 100);
        let t = transcript(&[user(&long)]);
        let entries = extract_entries(t.path(), 0, 1);
        let Entry::User { text } = &entries[0] else { panic!() };
        assert_eq!(text.len(), 3000);
    }

    #[test]
    fn thinking_is_capped_shorter_than_dialogue() {
        let long = "z".repeat(4000);
        let line = assistant_blocks(serde_json::json!([{"type":"thinking","thinking":long}]));
        let t = transcript(&[line]);
        let entries = extract_entries(t.path(), 0, 1);
        let Entry::Thinking { text } = &entries[0] else { panic!() };
        assert_eq!(text.len(), 2000);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        // '後' is 3 bytes; cap mid-char must back up.
        let s = format!("{}後後", "x".repeat(2999));
        let out = truncate_chars(&s, 3000);
        assert_eq!(out.len(), 2999);
        assert!(out.chars().all(|c| c == 'x'));
    }

    #[test]
    fn long_tool_args_are_capped_with_ellipsis() {
        let long_cmd = "a".repeat(500);
        let line = assistant_blocks(serde_json::json!([
            {"type":"tool_use","name":"Bash","input":{"command":long_cmd,"timeout":5}}
        ]));
        let t = transcript(&[line]);
        let entries = extract_entries(t.path(), 0, 1);
        let Entry::ToolUse { input, .. } = &entries[0] else { panic!() };
        let input = input.as_ref().unwrap();
        let cmd = input["command"].as_str().unwrap();
        assert_eq!(cmd.len(), 203); // 200 + "..."
        assert_eq!(input["timeout"], 5);
    }

    #[test]
    fn empty_file_yields_zero_entries() {
        let t = transcript(&[]);
        assert!(extract_entries(t.path(), 0, 0).is_empty());
    }

    #[test]
    fn vanished_file_yields_zero_entries() {
        assert!(extract_entries(Path::new("/nonexistent/t.jsonl"), 0, 100).is_empty());
    }

    #[test]
    fn range_bounds_are_respected() {
        let lines = vec![user("one"), user("two"), user("three")];
        let t = transcript(&lines);
        let entries = extract_entries(t.path(), 1, 2);
        assert_eq!(entries, vec![Entry::User { text: "two".into() }]);
    }
}
