//! Directive Parsing
//!
//! Classifies raw model output as either a tool call or a final answer.
//!
//! Accepted tool directives, in order of preference:
//!
//! ````text
//! ```tool
//! {"tool": "arxiv", "input": "transformer quantization"}
//! ```
//!
//! Action: arxiv
//! Action Input: transformer quantization
//!
//! {"tool": "arxiv", "arguments": {"query": "transformer quantization"}}
//! ````
//!
//! Anything else that is non-empty is a final answer; a leading
//! `Final Answer:` or `AI:` marker is stripped. Text before a directive is
//! kept as the model's thought.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{AgentError, Result};
use crate::tool::ToolCall;

const TOOL_FENCE: &str = "```tool";
const FENCE: &str = "```";
const ACTION: &str = "Action:";
const ACTION_INPUT: &str = "Action Input:";
const FINAL_MARKERS: [&str; 2] = ["Final Answer:", "AI:"];

/// What the model asked for
#[derive(Clone, Debug, PartialEq)]
pub enum Directive {
    /// Invoke a tool and come back with the observation
    ToolCall {
        thought: Option<String>,
        call: ToolCall,
    },
    /// Reply to the user
    FinalAnswer {
        thought: Option<String>,
        text: String,
    },
}

#[derive(Deserialize)]
struct RawDirective {
    #[serde(alias = "name", alias = "action")]
    tool: String,
    #[serde(default, alias = "query", alias = "action_input")]
    input: Option<Value>,
    #[serde(default)]
    arguments: Option<Value>,
}

impl RawDirective {
    fn into_call(self) -> Result<ToolCall> {
        let name = self.tool.trim().to_string();
        if name.is_empty() {
            return Err(unparseable("tool directive has an empty tool name"));
        }

        let input = self
            .input
            .as_ref()
            .and_then(query_from_value)
            .or_else(|| self.arguments.as_ref().and_then(query_from_value))
            .ok_or_else(|| unparseable(format!("tool directive for '{}' has no input", name)))?;

        Ok(ToolCall::new(name, input))
    }
}

/// Parse model output into a directive
pub fn parse_directive(content: &str) -> Result<Directive> {
    let content = content.trim();
    if content.is_empty() {
        return Err(unparseable("empty response"));
    }

    if let Some(start) = content.find(TOOL_FENCE) {
        return parse_fenced(content, start);
    }

    let final_at = find_final_marker(content);
    if let Some(action_at) = find_line_prefix(content, ACTION) {
        if final_at.is_none_or(|(at, _)| action_at < at) {
            return parse_react(content, action_at);
        }
    }

    if let Some(directive) = parse_inline_json(content) {
        return Ok(directive);
    }

    match final_at {
        Some((at, marker)) => {
            let text = content[at + marker.len()..].trim();
            if text.is_empty() {
                return Err(unparseable(format!("'{}' is followed by no text", marker)));
            }
            Ok(Directive::FinalAnswer {
                thought: clean_thought(&content[..at]),
                text: text.to_string(),
            })
        }
        None => Ok(Directive::FinalAnswer {
            thought: None,
            text: content.to_string(),
        }),
    }
}

fn parse_fenced(content: &str, start: usize) -> Result<Directive> {
    let after_marker = &content[start + TOOL_FENCE.len()..];
    let body = match after_marker.find(FENCE) {
        Some(end) => &after_marker[..end],
        None => after_marker,
    };

    let raw: RawDirective = serde_json::from_str(body.trim())
        .map_err(|e| unparseable(format!("invalid tool block: {}", e)))?;

    Ok(Directive::ToolCall {
        thought: clean_thought(&content[..start]),
        call: raw.into_call()?,
    })
}

fn parse_react(content: &str, action_at: usize) -> Result<Directive> {
    let after_action = &content[action_at + ACTION.len()..];
    let (name_line, rest) = after_action.split_once('\n').unwrap_or((after_action, ""));
    let name = name_line
        .trim()
        .trim_matches(|c| matches!(c, '`' | '[' | ']' | '"' | '\''))
        .to_string();
    if name.is_empty() {
        return Err(unparseable("'Action:' names no tool"));
    }

    let input_at = rest
        .find(ACTION_INPUT)
        .ok_or_else(|| unparseable(format!("'Action: {}' without 'Action Input:'", name)))?;
    let input = &rest[input_at + ACTION_INPUT.len()..];
    let input = match input.find("\nObservation") {
        Some(end) => &input[..end],
        None => input,
    };
    let input = input.trim().trim_matches('"').trim();
    if input.is_empty() {
        return Err(unparseable(format!("'Action Input:' for '{}' is empty", name)));
    }

    Ok(Directive::ToolCall {
        thought: clean_thought(&content[..action_at]),
        call: ToolCall::new(name, input),
    })
}

fn parse_inline_json(content: &str) -> Option<Directive> {
    if !content.contains(r#""tool""#) {
        return None;
    }

    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }

    let raw: RawDirective = serde_json::from_str(&content[start..=end]).ok()?;
    let call = raw.into_call().ok()?;
    Some(Directive::ToolCall {
        thought: clean_thought(&content[..start]),
        call,
    })
}

fn query_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(map) => map
            .get("query")
            .and_then(Value::as_str)
            .or_else(|| map.values().find_map(Value::as_str))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

/// Byte offset of the first line starting with `prefix`
fn find_line_prefix(content: &str, prefix: &str) -> Option<usize> {
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        if line.trim_start().starts_with(prefix) {
            return Some(offset + indent);
        }
        offset += line.len();
    }
    None
}

fn find_final_marker(content: &str) -> Option<(usize, &'static str)> {
    FINAL_MARKERS
        .iter()
        .filter_map(|marker| find_line_prefix(content, marker).map(|at| (at, *marker)))
        .min_by_key(|(at, _)| *at)
}

fn clean_thought(text: &str) -> Option<String> {
    let text = text.trim();
    let text = text.strip_prefix("Thought:").unwrap_or(text).trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn unparseable(reason: impl Into<String>) -> AgentError {
    AgentError::UnparseableModelOutput(reason.into())
}
