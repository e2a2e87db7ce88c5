//! Name-keyed lookup of agent definitions
//!
//! The registry is populated at startup and then read through immutable
//! snapshots, so concurrent runs never observe a half-registered graph.

use std::collections::HashMap;
use std::sync::Arc;

use crate::agent::Agent;
use crate::error::{AgentError, Result};

/// Holds agent definitions keyed by name.
///
/// Registration enforces the structural invariants the run loop relies on:
/// agent names are unique, and no agent declares two tools with the same
/// name. Once runs start, hand out a [`RegistrySnapshot`] instead of sharing
/// the registry mutably.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: HashMap<String, Arc<Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one agent under its name.
    pub fn register(&mut self, agent: Agent) -> Result<Arc<Agent>> {
        self.register_arc(Arc::new(agent))
    }

    /// Registers every agent reachable from `entry` through handoffs,
    /// including `entry` itself.
    ///
    /// Fails if two distinct reachable agents share a name; re-encountering
    /// the same shared definition is fine.
    pub fn register_graph(&mut self, entry: Agent) -> Result<Arc<Agent>> {
        let entry = Arc::new(entry);
        let mut pending: Vec<Arc<Agent>> = vec![entry.clone()];

        while let Some(agent) = pending.pop() {
            match self.agents.get(agent.name()) {
                Some(existing) if Arc::ptr_eq(existing, &agent) => continue,
                Some(_) => {
                    return Err(AgentError::DuplicateAgent(agent.name().to_string()));
                }
                None => {
                    self.register_arc(agent.clone())?;
                    for handoff in agent.handoffs() {
                        pending.push(handoff.agent.clone());
                    }
                }
            }
        }

        Ok(entry)
    }

    fn register_arc(&mut self, agent: Arc<Agent>) -> Result<Arc<Agent>> {
        let name = agent.name().to_string();
        if self.agents.contains_key(&name) {
            return Err(AgentError::DuplicateAgent(name));
        }

        let mut seen_tools = std::collections::HashSet::new();
        for tool in agent.tools() {
            if !seen_tools.insert(tool.name().to_string()) {
                return Err(AgentError::DuplicateTool {
                    agent: name,
                    tool: tool.name().to_string(),
                });
            }
        }

        self.agents.insert(name, agent.clone());
        Ok(agent)
    }

    /// Returns the agent registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<Arc<Agent>> {
        self.agents
            .get(name)
            .cloned()
            .ok_or_else(|| AgentError::AgentNotFound(name.to_string()))
    }

    /// Freezes the current contents into an immutable, cheaply-cloneable view.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            agents: Arc::new(self.agents.clone()),
        }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Registered names, sorted for stable output.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.agents.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Immutable view of a registry, safe to share across concurrent runs.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    agents: Arc<HashMap<String, Arc<Agent>>>,
}

impl RegistrySnapshot {
    pub fn resolve(&self, name: &str) -> Result<Arc<Agent>> {
        self.agents
            .get(name)
            .cloned()
            .ok_or_else(|| AgentError::AgentNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handoff::Handoff;
    use crate::tool::FunctionTool;
    use std::sync::Arc;

    #[test]
    fn test_register_and_resolve() {
        let mut registry = AgentRegistry::new();
        registry
            .register(Agent::simple("Assistant", "You are a helpful assistant."))
            .unwrap();

        let resolved = registry.resolve("Assistant").unwrap();
        assert_eq!(resolved.name(), "Assistant");

        let err = registry.resolve("Mystery").unwrap_err();
        assert!(matches!(err, AgentError::AgentNotFound(name) if name == "Mystery"));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = AgentRegistry::new();
        registry.register(Agent::simple("Twin", "First")).unwrap();

        let err = registry.register(Agent::simple("Twin", "Second")).unwrap_err();
        assert!(matches!(err, AgentError::DuplicateAgent(name) if name == "Twin"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_tool_rejected() {
        let tool_a = Arc::new(FunctionTool::simple("echo", "Echoes", |s| s));
        let tool_b = Arc::new(FunctionTool::simple("echo", "Also echoes", |s| s));

        let agent = Agent::simple("Tooling", "Uses tools")
            .with_tool(tool_a)
            .with_tool(tool_b);

        let mut registry = AgentRegistry::new();
        let err = registry.register(agent).unwrap_err();
        assert!(matches!(err, AgentError::DuplicateTool { tool, .. } if tool == "echo"));
    }

    #[test]
    fn test_register_graph_covers_reachable_agents() {
        let spanish = Agent::simple("Spanish", "You only speak Spanish.");
        let english = Agent::simple("English", "You only speak English");
        let triage = Agent::simple("Triage", "Route by language").with_handoffs(vec![
            Handoff::new(spanish, "Spanish requests"),
            Handoff::new(english, "English requests"),
        ]);

        let mut registry = AgentRegistry::new();
        let entry = registry.register_graph(triage).unwrap();

        assert_eq!(entry.name(), "Triage");
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.names(), vec!["English", "Spanish", "Triage"]);
        assert_eq!(registry.resolve("Spanish").unwrap().name(), "Spanish");
    }

    #[test]
    fn test_register_graph_rejects_conflicting_names() {
        let specialist = Agent::simple("Helper", "Specialist helper");
        let entry = Agent::simple("Main", "Main agent")
            .with_handoff(Handoff::new(specialist, "Specialist work"));

        let mut registry = AgentRegistry::new();
        registry
            .register(Agent::simple("Helper", "A different helper"))
            .unwrap();

        let err = registry.register_graph(entry).unwrap_err();
        assert!(matches!(err, AgentError::DuplicateAgent(name) if name == "Helper"));
    }

    #[test]
    fn test_snapshot_is_independent_of_later_registration() {
        let mut registry = AgentRegistry::new();
        registry.register(Agent::simple("First", "First agent")).unwrap();

        let snapshot = registry.snapshot();
        registry.register(Agent::simple("Second", "Second agent")).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.resolve("Second").is_err());
        assert!(registry.resolve("Second").is_ok());
    }
}
