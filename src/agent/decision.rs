//! Parsing of the model's tool-selection output.
//!
//! The protocol asks for a single JSON object, either
//! `{"type":"tool_call","tool_name":...,"tool_args":...}` or
//! `{"type":"final","content":...}`. Plain text with no JSON object at all
//! is accepted as a final answer; JSON that looks like a decision but is
//! malformed comes back as `Unparseable` so the runtime can issue a
//! corrective retry.

use serde_json::Value;

#[derive(Debug, Clone)]
pub enum AgentDecision {
    Final(String),
    ToolCall { name: String, args: Value },
    Unparseable { reason: String },
}

pub fn parse_agent_decision(text: &str) -> AgentDecision {
    match parse_json_from_text(text) {
        Some(value) => parse_decision_from_value(&value),
        None => AgentDecision::Final(text.trim().to_string()),
    }
}

fn parse_json_from_text(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[start..=end]).ok()
}

fn parse_decision_from_value(value: &Value) -> AgentDecision {
    let action_type = value
        .get("type")
        .or_else(|| value.get("action"))
        .and_then(|v| v.as_str())
        .unwrap_or("");

    match action_type {
        "tool_call" => {
            let name = value
                .get("tool_name")
                .or_else(|| value.get("name"))
                .or_else(|| value.get("tool"))
                .and_then(|v| v.as_str());
            match name {
                Some(name) if !name.trim().is_empty() => {
                    let args = value
                        .get("tool_args")
                        .or_else(|| value.get("args"))
                        .or_else(|| value.get("input"))
                        .cloned()
                        .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
                    AgentDecision::ToolCall {
                        name: name.to_string(),
                        args,
                    }
                }
                _ => AgentDecision::Unparseable {
                    reason: "tool_call without a tool_name".to_string(),
                },
            }
        }
        "final" => {
            let content = value
                .get("content")
                .or_else(|| value.get("message"))
                .or_else(|| value.get("response"))
                .and_then(|v| v.as_str());
            match content {
                Some(content) => AgentDecision::Final(content.to_string()),
                None => AgentDecision::Unparseable {
                    reason: "final decision without content".to_string(),
                },
            }
        }
        other => AgentDecision::Unparseable {
            reason: format!("unrecognized decision type '{}'", other),
        },
    }
}

/// Flatten tool arguments into the free-text input tools accept.
pub(crate) fn tool_input_from_args(args: &Value) -> String {
    match args {
        Value::String(s) => s.clone(),
        Value::Object(map) => {
            for key in ["input", "expression", "query", "q"] {
                if let Some(value) = map.get(key).and_then(|v| v.as_str()) {
                    return value.to_string();
                }
            }
            serde_json::to_string(args).unwrap_or_default()
        }
        other => other.to_string(),
    }
}
