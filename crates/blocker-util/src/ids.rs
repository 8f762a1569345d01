//! Strongly-typed identifiers for the app blocker

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier of a block plan.
///
/// Generated once when a plan is created and never changed afterwards.
/// Stored documents may carry ids produced elsewhere, so this wraps a string
/// rather than a parsed UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanId(String);

impl PlanId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier of an application (e.g. a package name)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AppId(String);

impl AppId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AppId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AppId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_id_equality() {
        let id1 = AppId::new("com.example.game");
        let id2 = AppId::from("com.example.game");
        let id3 = AppId::new("com.example.chat");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn plan_id_uniqueness() {
        let p1 = PlanId::generate();
        let p2 = PlanId::generate();
        assert_ne!(p1, p2);
        assert!(Uuid::parse_str(p1.as_str()).is_ok());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let app_id = AppId::new("com.example.game");
        let json = serde_json::to_string(&app_id).unwrap();
        assert_eq!(json, "\"com.example.game\"");
        let parsed: AppId = serde_json::from_str(&json).unwrap();
        assert_eq!(app_id, parsed);

        let plan_id = PlanId::generate();
        let json = serde_json::to_string(&plan_id).unwrap();
        let parsed: PlanId = serde_json::from_str(&json).unwrap();
        assert_eq!(plan_id, parsed);
    }
}
