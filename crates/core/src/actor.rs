use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Identity of the principal that performed a mutation.
///
/// The registry never derives this itself: the transport boundary resolves
/// the caller's credentials and hands over an `Actor`. Request payloads
/// carry no actor field, so provenance cannot be spoofed through a body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Actor(String);

impl Actor {
    pub fn new(identity: impl Into<String>) -> Result<Self, RegistryError> {
        let identity = identity.into();
        if identity.trim().is_empty() {
            return Err(RegistryError::invalid("actor", "identity must not be empty"));
        }
        Ok(Actor(identity))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Actor {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Actor::new(value)
    }
}

impl From<Actor> for String {
    fn from(actor: Actor) -> String {
        actor.0
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_identity() {
        assert!(Actor::new("").is_err());
        assert!(Actor::new("   ").is_err());
    }

    #[test]
    fn keeps_identity_verbatim() {
        let actor = Actor::new("0xAbC123").unwrap();
        assert_eq!(actor.as_str(), "0xAbC123");
        assert_eq!(actor.to_string(), "0xAbC123");
    }

    #[test]
    fn blank_identity_does_not_deserialize() {
        assert!(serde_json::from_str::<Actor>("\"\"").is_err());
        let actor: Actor = serde_json::from_str("\"farm:green-valley\"").unwrap();
        assert_eq!(actor.as_str(), "farm:green-valley");
    }
}
