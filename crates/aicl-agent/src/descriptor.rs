//! Agent descriptors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything the executor needs to know about an agent: identity,
/// endpoint, and the request template whose `[[name]]` placeholders are
/// filled from task parameters and readable globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub id: String,
    pub name: String,
    pub agent_type: String,
    pub endpoint: String,
    pub reputation: f32,
    pub capabilities: Vec<String>,
    pub request_template: Value,
}

impl AgentDescriptor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        agent_type: impl Into<String>,
        endpoint: impl Into<String>,
        request_template: Value,
        capabilities: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            agent_type: agent_type.into(),
            endpoint: endpoint.into(),
            reputation: 0.0,
            capabilities,
            request_template,
        }
    }

    pub fn with_reputation(mut self, reputation: f32) -> Self {
        self.reputation = reputation;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_roundtrip() {
        let descriptor = AgentDescriptor::new(
            "AG123",
            "FlightGetter",
            "Travel",
            "https://api.flightgetter.com",
            json!({"action": "search"}),
            vec!["Search Flights".to_string()],
        )
        .with_reputation(0.8);

        let text = serde_json::to_string(&descriptor).unwrap();
        let back: AgentDescriptor = serde_json::from_str(&text).unwrap();
        assert_eq!(back.id, "AG123");
        assert_eq!(back.reputation, 0.8);
        assert_eq!(back.request_template, json!({"action": "search"}));
    }
}
