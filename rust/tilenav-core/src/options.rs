use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::Capability;

/// Caller-chosen routing preferences, passed into every search.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalPreferences {
    pub avoid_tall_grass: bool,
    pub seek_tall_grass: bool,
    pub avoid_observers: bool,
    pub seek_observers: bool,
    pub unlocked_capabilities: BTreeSet<Capability>,
}

impl TraversalPreferences {
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.unlocked_capabilities.insert(capability);
        self
    }

    #[inline]
    pub fn has(&self, capability: Capability) -> bool {
        self.unlocked_capabilities.contains(&capability)
    }

    /// Returns true when `gate` is absent or unlocked.
    #[inline]
    pub fn allows(&self, gate: Option<Capability>) -> bool {
        gate.map_or(true, |c| self.has(c))
    }

    pub fn has_all_capabilities(&self) -> bool {
        Capability::ALL.iter().all(|c| self.has(*c))
    }

    /// Same preferences with every capability unlocked; used to tell a gated
    /// goal apart from a disconnected one.
    pub fn with_all_capabilities(&self) -> Self {
        let mut relaxed = self.clone();
        relaxed.unlocked_capabilities.extend(Capability::ALL);
        relaxed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_with_defaults_when_missing_fields() {
        let v = json!({ "avoid_tall_grass": true, "unlocked_capabilities": ["CUT"] });
        let p: TraversalPreferences = serde_json::from_value(v).unwrap();
        assert!(p.avoid_tall_grass);
        assert!(!p.seek_tall_grass && !p.avoid_observers && !p.seek_observers);
        assert!(p.has(Capability::Cut));
        assert!(!p.has(Capability::WaterCrossing));
    }

    #[test]
    fn gates_and_relaxation() {
        let p = TraversalPreferences::default().with_capability(Capability::Strength);
        assert!(p.allows(None));
        assert!(p.allows(Some(Capability::Strength)));
        assert!(!p.allows(Some(Capability::Cut)));
        assert!(!p.has_all_capabilities());
        let relaxed = p.with_all_capabilities();
        assert!(relaxed.has_all_capabilities());
        assert_eq!(p.unlocked_capabilities.len(), 1, "original untouched");
    }
}
