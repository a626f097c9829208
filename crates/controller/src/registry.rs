//! Agent registry.
//!
//! Agents are stateless descriptions: a role, its wire name, a fixed system
//! prompt, a description and a reply cap. A registry always holds the full
//! set of roles; building one either succeeds for every role or fails.

use std::collections::BTreeMap;
use std::sync::Arc;

use paralegal_core::{types::AgentRole, Error, Result};

use crate::prompts;

/// Replies a single agent may give in one conversation.
pub const DEFAULT_REPLY_CAP: usize = 20;

/// A configured agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    pub role: AgentRole,
    pub system_prompt: String,
    pub description: String,
    pub reply_cap: usize,
}

impl Agent {
    /// Canonical wire name.
    pub fn name(&self) -> &'static str {
        self.role.name()
    }
}

/// Shared handle to a registered agent.
pub type AgentHandle = Arc<Agent>;

/// Overrides for one agent's prompt or description.
#[derive(Debug, Clone)]
pub struct AgentSpec {
    pub role: AgentRole,
    pub system_prompt: Option<String>,
    pub description: Option<String>,
}

impl AgentSpec {
    pub fn new(role: AgentRole) -> Self {
        Self {
            role,
            system_prompt: None,
            description: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// The complete set of agents taking part in a conversation.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    agents: BTreeMap<AgentRole, AgentHandle>,
}

impl AgentRegistry {
    /// Build one agent with its built-in prompt and description.
    pub fn register(role: AgentRole, reply_cap: usize) -> Result<AgentHandle> {
        Self::build_agent(AgentSpec::new(role), reply_cap)
    }

    /// Register every role with the built-in prompts.
    pub fn register_all(reply_cap: usize) -> Result<Self> {
        Self::with_overrides(Vec::new(), reply_cap)
    }

    /// Register every role, applying the given overrides.
    ///
    /// Any invalid override aborts the whole registration.
    pub fn with_overrides(overrides: Vec<AgentSpec>, reply_cap: usize) -> Result<Self> {
        let mut specs: BTreeMap<AgentRole, AgentSpec> = AgentRole::ALL
            .iter()
            .map(|&role| (role, AgentSpec::new(role)))
            .collect();

        let mut seen = Vec::new();
        for spec in overrides {
            if seen.contains(&spec.role) {
                return Err(Error::registration(spec.role.name(), "duplicate override"));
            }
            seen.push(spec.role);
            specs.insert(spec.role, spec);
        }

        let agents = specs
            .into_values()
            .map(|spec| Self::build_agent(spec, reply_cap).map(|agent| (agent.role, agent)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        tracing::debug!(agents = agents.len(), reply_cap, "Agent registry ready");
        Ok(Self { agents })
    }

    fn build_agent(spec: AgentSpec, reply_cap: usize) -> Result<AgentHandle> {
        let role = spec.role;
        if reply_cap == 0 {
            return Err(Error::registration(role.name(), "reply cap must be at least 1"));
        }

        let system_prompt = spec
            .system_prompt
            .unwrap_or_else(|| prompts::system_prompt(role));
        if system_prompt.trim().is_empty() {
            return Err(Error::registration(role.name(), "system prompt is empty"));
        }

        let description = spec
            .description
            .unwrap_or_else(|| prompts::description(role).to_string());
        if description.trim().is_empty() {
            return Err(Error::registration(role.name(), "description is empty"));
        }

        Ok(Arc::new(Agent {
            role,
            system_prompt,
            description,
            reply_cap,
        }))
    }

    /// Look up an agent by role.
    pub fn get(&self, role: AgentRole) -> Result<&AgentHandle> {
        self.agents
            .get(&role)
            .ok_or_else(|| Error::internal(format!("agent {} is not registered", role)))
    }

    /// Agents in pipeline order.
    pub fn agents(&self) -> impl Iterator<Item = &AgentHandle> {
        self.agents.values()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
