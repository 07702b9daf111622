//! Worker stream-json parsing.
//!
//! The worker emits one JSON object per stdout line. Relevant here: the
//! tool calls it made (what it touched, as claimed by the stream) and the
//! final result message's free text. Protocol is undocumented; unknown
//! message types must decode to a catch-all rather than fail the run.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::ChildStdout;

use crate::worker::WorkerOutput;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum StreamMessage {
    #[serde(rename = "assistant")]
    Assistant { message: Value },
    #[serde(rename = "result")]
    Result {
        #[serde(default)]
        subtype: String,
        #[serde(default, rename = "result")]
        result_text: Option<String>,
        #[serde(default)]
        error: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

/// One tool invocation the worker reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolAction {
    pub tool: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// Accumulates parsed stream lines into a [`WorkerOutput`].
#[derive(Debug, Default)]
pub struct StreamCollector {
    actions: Vec<ToolAction>,
    result_text: Option<String>,
    result_error: Option<String>,
}

impl StreamCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw stdout line. Non-JSON lines are ignored (stderr
    /// leakage, debug output).
    pub fn push_line(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        let Ok(msg) = serde_json::from_str::<StreamMessage>(trimmed) else {
            return;
        };
        match msg {
            StreamMessage::Assistant { message } => {
                self.actions.extend(actions_from_assistant(&message));
            }
            StreamMessage::Result {
                subtype,
                result_text,
                error,
            } => {
                // Last result message wins.
                self.result_text = result_text;
                self.result_error = if subtype == "success" { None } else { error };
            }
            StreamMessage::Unknown => {}
        }
    }

    pub fn finish(self) -> WorkerOutput {
        WorkerOutput {
            actions: self.actions,
            result_text: self.result_text,
            result_error: self.result_error,
        }
    }
}

/// Tool calls from an assistant message's content blocks. The target is
/// the `file_path` argument; the allow-listed tools all carry one.
fn actions_from_assistant(message: &Value) -> Vec<ToolAction> {
    let Some(content) = message.get("content").and_then(|c| c.as_array()) else {
        return Vec::new();
    };
    content
        .iter()
        .filter(|block| block.get("type").and_then(|t| t.as_str()) == Some("tool_use"))
        .map(|block| ToolAction {
            tool: block
                .get("name")
                .and_then(|n| n.as_str())
                .unwrap_or("unknown")
                .to_string(),
            target: block
                .get("input")
                .and_then(|i| i.get("file_path"))
                .and_then(|p| p.as_str())
                .map(String::from),
        })
        .collect()
}

/// Drain a child's stdout to EOF through a collector.
pub(crate) async fn collect_stream(stdout: ChildStdout) -> std::io::Result<WorkerOutput> {
    let mut reader = BufReader::new(stdout);
    let mut collector = StreamCollector::new();
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        collector.push_line(&line);
    }
    Ok(collector.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_tool_actions_with_targets() {
        let mut c = StreamCollector::new();
        c.push_line(r#"{"type":"system","subtype":"init","model":"m"}"#);
        c.push_line(
            r#"{"type":"assistant","message":{"content":[
                {"type":"text","text":"updating"},
                {"type":"tool_use","name":"Write","input":{"file_path":".vigil/WORKSPACE.md","content":"..."}},
                {"type":"tool_use","name":"Read","input":{"file_path":"src/main.rs"}}
            ]}}"#,
        );
        c.push_line(r#"{"type":"result","subtype":"success","result":"done"}"#);
        let out = c.finish();
        assert_eq!(out.actions.len(), 2);
        assert_eq!(out.actions[0].tool, "Write");
        assert_eq!(out.actions[0].target.as_deref(), Some(".vigil/WORKSPACE.md"));
        assert_eq!(out.result_text.as_deref(), Some("done"));
        assert!(out.result_error.is_none());
    }

    #[test]
    fn last_result_message_wins() {
        let mut c = StreamCollector::new();
        c.push_line(r#"{"type":"result","subtype":"success","result":"first"}"#);
        c.push_line(r#"{"type":"result","subtype":"error_during_execution","error":"boom"}"#);
        let out = c.finish();
        assert!(out.result_text.is_none());
        assert_eq!(out.result_error.as_deref(), Some("boom"));
    }

    #[test]
    fn non_json_and_unknown_lines_are_ignored() {
        let mut c = StreamCollector::new();
        c.push_line("plain text noise");
        c.push_line(r#"{"type":"future_message_kind","data":1}"#);
        c.push_line("");
        let out = c.finish();
        assert!(out.actions.is_empty());
        assert!(out.result_text.is_none());
    }

    #[test]
    fn tool_use_without_file_path_has_no_target() {
        let mut c = StreamCollector::new();
        c.push_line(
            r#"{"type":"assistant","message":{"content":[{"type":"tool_use","name":"Read","input":{}}]}}"#,
        );
        let out = c.finish();
        assert_eq!(out.actions[0].target, None);
    }
}
