//! Permissive serde model of the assistant's transcript JSONL.
//!
//! The format is undocumented and evolves across assistant versions, so
//! every field defaults and unknown shapes must decode rather than fail:
//! a line we cannot make sense of is skipped by the callers, never fatal.

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct RawRecord {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default, rename = "requestId")]
    pub request_id: Option<String>,
    #[serde(default)]
    pub message: Option<Message>,
}

impl RawRecord {
    pub fn is_compact_boundary(&self) -> bool {
        self.kind == "system" && self.subtype.as_deref() == Some("compact_boundary")
    }

    pub fn usage(&self) -> Option<&Usage> {
        self.message.as_ref()?.usage.as_ref()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// `message.content` is either a bare string or an array of typed blocks.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Blocks(Vec<Block>),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Text {
        #[serde(default)]
        text: String,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    ToolUse {
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    ToolResult,
    /// Catch-all for block types we do not consume.
    #[serde(other)]
    Unknown,
}

/// The usage snapshot carried by API-backed records.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub cache_creation_input_tokens: u64,
    #[serde(default)]
    pub cache_read_input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

impl Usage {
    pub fn total(&self) -> u64 {
        self.input_tokens
            + self.cache_creation_input_tokens
            + self.cache_read_input_tokens
            + self.output_tokens
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_record_detected() {
        let rec: RawRecord =
            serde_json::from_str(r#"{"type":"system","subtype":"compact_boundary"}"#).unwrap();
        assert!(rec.is_compact_boundary());
    }

    #[test]
    fn other_system_records_are_not_boundaries() {
        let rec: RawRecord =
            serde_json::from_str(r#"{"type":"system","subtype":"turn_duration"}"#).unwrap();
        assert!(!rec.is_compact_boundary());
    }

    #[test]
    fn string_content_decodes() {
        let rec: RawRecord = serde_json::from_str(
            r#"{"type":"user","message":{"role":"user","content":"hello"}}"#,
        )
        .unwrap();
        match rec.message.unwrap().content.unwrap() {
            Content::Text(s) => assert_eq!(s, "hello"),
            other => panic!("expected Text, got {other:?}"),
        }
    }

    #[test]
    fn block_content_decodes_with_unknown_types() {
        let rec: RawRecord = serde_json::from_str(
            r#"{"type":"assistant","message":{"role":"assistant","content":[
                {"type":"text","text":"hi"},
                {"type":"thinking","thinking":"hmm"},
                {"type":"tool_use","name":"Write","input":{"file_path":"a.rs"}},
                {"type":"tool_result","content":"out"},
                {"type":"server_tool_use","id":"x"}
            ]}}"#,
        )
        .unwrap();
        let Content::Blocks(blocks) = rec.message.unwrap().content.unwrap() else {
            panic!("expected blocks");
        };
        assert_eq!(blocks.len(), 5);
        assert!(matches!(blocks[4], Block::Unknown));
    }

    #[test]
    fn usage_total_sums_all_four_components() {
        let usage: Usage = serde_json::from_str(
            r#"{"input_tokens":100,"cache_creation_input_tokens":50,"cache_read_input_tokens":25,"output_tokens":10}"#,
        )
        .unwrap();
        assert_eq!(usage.total(), 185);
    }

    #[test]
    fn missing_usage_fields_default_to_zero() {
        let usage: Usage = serde_json::from_str(r#"{"input_tokens":7}"#).unwrap();
        assert_eq!(usage.total(), 7);
    }
}
