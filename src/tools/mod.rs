//! Callable tools for the agent loop.
//!
//! Any type implementing [`Tool`] can be registered. `run` must be total:
//! a tool catches its own failures and returns a descriptive string, so the
//! orchestrator needs no tool-specific error handling.

pub mod calculator;
pub mod search;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

pub use calculator::CalculatorTool;
pub use search::SearchTool;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Execute the tool. Never fails; errors come back as strings the
    /// model can observe.
    async fn run(&self, input: &str) -> String;
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Name-keyed tool collection, populated once at startup.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names are unique: a duplicate registration is
    /// ignored with a warning, the first registration wins.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            tracing::warn!("Tool '{}' is already registered, ignoring duplicate", name);
            return;
        }
        self.order.push(name.clone());
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn infos(&self) -> Vec<ToolInfo> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolInfo {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Repeats the input"
        }

        async fn run(&self, input: &str) -> String {
            input.to_string()
        }
    }

    struct LoudEchoTool;

    #[async_trait]
    impl Tool for LoudEchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Shouts the input"
        }

        async fn run(&self, input: &str) -> String {
            input.to_uppercase()
        }
    }

    #[tokio::test]
    async fn duplicate_names_keep_first_registration() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        registry.register(Arc::new(LoudEchoTool));

        assert_eq!(registry.len(), 1);
        let tool = registry.get("echo").unwrap();
        assert_eq!(tool.run("hi").await, "hi");
    }

    #[test]
    fn infos_follow_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));

        let infos = registry.infos();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].name, "echo");
        assert_eq!(registry.names(), vec!["echo".to_string()]);
    }
}
