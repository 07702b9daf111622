//! Hook stdin payload and result types.

use serde_json::Value;

/// Parsed lifecycle event payload. Field access is tolerant: the host
/// sends camelCase in some versions and snake_case in others, so both are
/// tried and missing fields read as empty.
#[derive(Debug, Clone)]
pub struct HookPayload {
    raw: Value,
}

impl HookPayload {
    /// `None` for empty stdin (a hook fired with nothing to say).
    pub fn parse(stdin: &str) -> anyhow::Result<Option<Self>> {
        if stdin.trim().is_empty() {
            return Ok(None);
        }
        let raw: Value = serde_json::from_str(stdin)?;
        Ok(Some(Self { raw }))
    }

    pub fn event(&self) -> String {
        self.get_str("hook_event_name")
    }

    /// SessionStart only: startup | compact | clear | resume.
    pub fn source(&self) -> String {
        self.get_str("source")
    }

    pub fn transcript_path(&self) -> String {
        self.get_str("transcript_path")
    }

    pub fn cwd(&self) -> String {
        self.get_str("cwd")
    }

    fn get_str(&self, snake_key: &str) -> String {
        if let Some(s) = self.raw.get(snake_key).and_then(|v| v.as_str()) {
            return s.to_string();
        }
        let camel = snake_to_camel(snake_key);
        self.raw
            .get(&camel)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    }
}

fn snake_to_camel(s: &str) -> String {
    let mut result = String::new();
    let mut capitalize_next = false;
    for ch in s.chars() {
        if ch == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            result.extend(ch.to_uppercase());
            capitalize_next = false;
        } else {
            result.push(ch);
        }
    }
    result
}

/// Result from a hook dispatch.
///
/// - `stdout`: JSON string to print to stdout (consumed by the assistant)
/// - `stderr`: warning message for the non-blocking stderr channel (exit 1)
#[derive(Debug, Default, Clone)]
pub struct HookResult {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl HookResult {
    pub fn output(stdout: String) -> Self {
        Self {
            stdout: Some(stdout),
            stderr: None,
        }
    }

    pub fn warning(msg: String) -> Self {
        Self {
            stdout: None,
            stderr: Some(msg),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_fields_parse() {
        let p = HookPayload::parse(
            r#"{"hook_event_name":"SessionStart","source":"compact","transcript_path":"/t.jsonl"}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(p.event(), "SessionStart");
        assert_eq!(p.source(), "compact");
        assert_eq!(p.transcript_path(), "/t.jsonl");
    }

    #[test]
    fn camel_case_fields_parse() {
        let p = HookPayload::parse(r#"{"hookEventName":"PreToolUse","transcriptPath":"/t"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(p.event(), "PreToolUse");
        assert_eq!(p.transcript_path(), "/t");
    }

    #[test]
    fn empty_stdin_is_none() {
        assert!(HookPayload::parse("").unwrap().is_none());
        assert!(HookPayload::parse("   \n").unwrap().is_none());
    }

    #[test]
    fn malformed_stdin_is_an_error() {
        assert!(HookPayload::parse("{not json").is_err());
    }

    #[test]
    fn missing_fields_read_empty() {
        let p = HookPayload::parse("{}").unwrap().unwrap();
        assert_eq!(p.event(), "");
        assert_eq!(p.source(), "");
    }
}
