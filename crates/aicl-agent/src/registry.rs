//! Agent registry.

use crate::AgentDescriptor;
use serde_json::json;

/// Resolves agent names to descriptors. Lookup is by agent *name* for the
/// interpreter (permissions are keyed the same way); id lookup exists for
/// embedders that track agents by identity.
pub trait AgentRegistry: Send + Sync {
    fn lookup(&self, name: &str) -> Option<AgentDescriptor>;

    fn lookup_by_id(&self, _id: &str) -> Option<AgentDescriptor> {
        None
    }
}

/// A fixed, in-memory registry.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    agents: Vec<AgentDescriptor>,
}

impl StaticRegistry {
    pub fn new(agents: Vec<AgentDescriptor>) -> Self {
        Self { agents }
    }

    /// The built-in simulated fleet used by the CLI and the demo scripts.
    pub fn sample() -> Self {
        Self::new(vec![
            AgentDescriptor::new(
                "AG123",
                "FlightGetter",
                "Travel",
                "https://api.flightgetter.example",
                json!({
                    "action": "search",
                    "params": {
                        "origin": "[[origin]]",
                        "destination": "[[destination]]",
                        "date": "[[date]]",
                    },
                }),
                vec!["Search Flights".to_string(), "Get Deals".to_string()],
            ),
            AgentDescriptor::new(
                "AG124",
                "RoomBooker",
                "Hospitality",
                "https://api.roombooker.example",
                json!({
                    "action": "reserve",
                    "params": {
                        "location": "[[location]]",
                        "date": "[[date]]",
                        "guests": "[[guests]]",
                    },
                }),
                vec!["Search Rooms".to_string(), "Make Reservations".to_string()],
            ),
            AgentDescriptor::new(
                "AG125",
                "UberScheduler",
                "Transportation",
                "https://api.uberscheduler.example",
                json!({
                    "action": "schedule",
                    "params": {
                        "pickup": "[[pickup]]",
                        "dropoff": "[[dropoff]]",
                        "time": "[[time]]",
                    },
                }),
                vec!["Schedule Ride".to_string(), "Get ETA".to_string()],
            ),
            AgentDescriptor::new(
                "AG126",
                "WeatherChecker",
                "Utility",
                "https://api.weatherchecker.example",
                json!({
                    "action": "get_weather",
                    "params": {
                        "location": "[[location]]",
                        "date": "[[date]]",
                    },
                }),
                vec!["Get Weather".to_string(), "Hourly Forecast".to_string()],
            ),
            AgentDescriptor::new(
                "AG127",
                "PackageTracker",
                "Logistics",
                "https://api.packagetracker.example",
                json!({
                    "action": "track",
                    "params": {
                        "tracking_number": "[[tracking_number]]",
                    },
                }),
                vec!["Track Package".to_string(), "Delivery ETA".to_string()],
            ),
        ])
    }

    pub fn push(&mut self, agent: AgentDescriptor) {
        self.agents.push(agent);
    }
}

impl AgentRegistry for StaticRegistry {
    fn lookup(&self, name: &str) -> Option<AgentDescriptor> {
        self.agents.iter().find(|a| a.name == name).cloned()
    }

    fn lookup_by_id(&self, id: &str) -> Option<AgentDescriptor> {
        self.agents.iter().find(|a| a.id == id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_lookup_by_name() {
        let registry = StaticRegistry::sample();
        let agent = registry.lookup("FlightGetter").unwrap();
        assert_eq!(agent.id, "AG123");
        assert_eq!(agent.agent_type, "Travel");
    }

    #[test]
    fn test_sample_lookup_by_id() {
        let registry = StaticRegistry::sample();
        let agent = registry.lookup_by_id("AG127").unwrap();
        assert_eq!(agent.name, "PackageTracker");
    }

    #[test]
    fn test_unknown_agent() {
        let registry = StaticRegistry::sample();
        assert!(registry.lookup("Ghost").is_none());
        assert!(registry.lookup_by_id("AG999").is_none());
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let registry = StaticRegistry::sample();
        assert!(registry.lookup("flightgetter").is_none());
    }
}
