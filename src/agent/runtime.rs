//! Bounded reason/act/observe loop.
//!
//! Each cycle asks the model for a decision: call a tool or answer. Tool
//! output is fed back as a system observation and the loop continues.
//! Malformed decisions and unknown tools get one corrective message and
//! consume an iteration. The step cap is the defense against runaway
//! tool-calling; exhausting it yields an explicit partial result. No error
//! escapes `run` — every failure becomes an error-shaped outcome.

use std::sync::Arc;

use serde_json::{json, Value};

use super::decision::{parse_agent_decision, tool_input_from_args, AgentDecision};
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::tools::ToolRegistry;

pub const MAX_AGENT_STEPS: usize = 5;

#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub answer: String,
    pub reasoning: Option<String>,
    pub metadata: Value,
}

struct ToolInvocation {
    tool: String,
    input: String,
    output: String,
}

pub struct AgentRuntime {
    llm: Arc<dyn LlmProvider>,
    model: String,
    tools: Arc<ToolRegistry>,
}

impl AgentRuntime {
    pub fn new(llm: Arc<dyn LlmProvider>, model: String, tools: Arc<ToolRegistry>) -> Self {
        Self { llm, model, tools }
    }

    pub async fn run(
        &self,
        question: &str,
        history: &[ChatMessage],
        session_id: &str,
    ) -> AgentOutcome {
        let mut messages = vec![ChatMessage::system(self.build_instructions())];
        messages.extend(history.iter().cloned());
        messages.push(ChatMessage::user(question));

        let mut trace: Vec<ToolInvocation> = Vec::new();

        for step in 0..MAX_AGENT_STEPS {
            tracing::debug!("Agent reasoning step {}/{}", step + 1, MAX_AGENT_STEPS);

            let request = ChatRequest::new(messages.clone());
            let response = match self.llm.chat(request, &self.model).await {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!("Agent LLM call failed: {}", err);
                    return self.error_outcome(session_id, &trace, &err.to_string());
                }
            };

            match parse_agent_decision(&response) {
                AgentDecision::Final(content) => {
                    return self.final_outcome(session_id, &trace, content, step + 1);
                }
                AgentDecision::ToolCall { name, args } => {
                    let Some(tool) = self.tools.get(&name) else {
                        let correction = format!(
                            "Unknown tool '{}'. Available tools: {}. Respond again using the JSON format.",
                            name,
                            self.tool_names_or_none()
                        );
                        messages.push(ChatMessage::system(correction));
                        continue;
                    };

                    let input = tool_input_from_args(&args);
                    let output = tool.run(&input).await;

                    tracing::debug!("Tool '{}' executed for input '{}'", name, input);
                    messages.push(ChatMessage::system(format!(
                        "Tool `{}` result:\n{}",
                        name, output
                    )));
                    trace.push(ToolInvocation {
                        tool: name,
                        input,
                        output,
                    });
                }
                AgentDecision::Unparseable { reason } => {
                    let correction = format!(
                        "Your last response could not be parsed ({}). Respond ONLY with JSON: \
                         {{\"type\":\"tool_call\",\"tool_name\":\"<tool>\",\"tool_args\":{{...}}}} \
                         or {{\"type\":\"final\",\"content\":\"...\"}}.",
                        reason
                    );
                    messages.push(ChatMessage::system(correction));
                }
            }
        }

        let answer = if trace.is_empty() {
            "I was unable to complete the request within the reasoning limit.".to_string()
        } else {
            format!(
                "I was unable to reach a final answer within the reasoning limit. \
                 Partial results from {} tool call(s) are reflected above.",
                trace.len()
            )
        };

        let mut outcome = self.final_outcome(session_id, &trace, answer, MAX_AGENT_STEPS);
        if let Some(map) = outcome.metadata.as_object_mut() {
            map.insert("iteration_limit_reached".to_string(), Value::Bool(true));
        }
        outcome
    }

    fn build_instructions(&self) -> String {
        let tool_lines = if self.tools.is_empty() {
            "None (answer directly without tools)".to_string()
        } else {
            self.tools
                .infos()
                .iter()
                .map(|info| format!("- {}: {}", info.name, info.description))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            "You are a helpful assistant operating in agent mode.\n\
             You have access to the following tools:\n{tools}\n\
             When you need to use a tool, respond ONLY with JSON in this format:\n\
             {{\"type\":\"tool_call\",\"tool_name\":\"<tool>\",\"tool_args\":{{\"input\":\"...\"}}}}\n\
             When you have the final answer, respond ONLY with JSON in this format:\n\
             {{\"type\":\"final\",\"content\":\"...\"}}\n\
             Do not include any extra text outside the JSON.",
            tools = tool_lines
        )
    }

    fn tool_names_or_none(&self) -> String {
        let names = self.tools.names();
        if names.is_empty() {
            "none".to_string()
        } else {
            names.join(", ")
        }
    }

    fn final_outcome(
        &self,
        session_id: &str,
        trace: &[ToolInvocation],
        answer: String,
        steps: usize,
    ) -> AgentOutcome {
        AgentOutcome {
            answer,
            reasoning: build_reasoning(trace),
            metadata: json!({
                "model": self.model,
                "session_id": session_id,
                "agent_type": "tool_calling",
                "tools_available": self.tools.len(),
                "steps": steps,
            }),
        }
    }

    fn error_outcome(
        &self,
        session_id: &str,
        trace: &[ToolInvocation],
        error: &str,
    ) -> AgentOutcome {
        AgentOutcome {
            answer: format!(
                "I encountered an error while processing your question: {}",
                error
            ),
            reasoning: build_reasoning(trace),
            metadata: json!({
                "model": self.model,
                "session_id": session_id,
                "error": error,
            }),
        }
    }
}

fn build_reasoning(trace: &[ToolInvocation]) -> Option<String> {
    if trace.is_empty() {
        return None;
    }

    let mut lines = vec!["Agent used the following tools:".to_string()];
    for invocation in trace {
        let mut output: String = invocation.output.chars().take(120).collect();
        if output.len() < invocation.output.len() {
            output.push_str("...");
        }
        lines.push(format!(
            "- {} ({}) -> {}",
            invocation.tool, invocation.input, output
        ));
    }
    Some(lines.join("\n"))
}
