//! Instrument keys — the identity of a tradeable leg.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One side of a two-instrument corporate event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Leg {
    Target,
    Acquirer,
}

impl Leg {
    pub fn as_str(&self) -> &'static str {
        match self {
            Leg::Target => "target",
            Leg::Acquirer => "acquirer",
        }
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown leg '{0}' (expected 'target' or 'acquirer')")]
pub struct ParseLegError(pub String);

impl FromStr for Leg {
    type Err = ParseLegError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "target" => Ok(Leg::Target),
            "acquirer" => Ok(Leg::Acquirer),
            other => Err(ParseLegError(other.to_string())),
        }
    }
}

/// Identifier of a tradeable instrument.
///
/// Either a plain identifier (a ticker or a deal id) or a composite of an
/// identifier and the leg it names. The composite form is a structured value,
/// so `("1", target)` can never collide with a plain identifier spelled `"1:target"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InstrumentKey {
    Single(String),
    Composite { id: String, leg: Leg },
}

impl InstrumentKey {
    pub fn single(id: impl Into<String>) -> Self {
        InstrumentKey::Single(id.into())
    }

    pub fn composite(id: impl Into<String>, leg: Leg) -> Self {
        InstrumentKey::Composite { id: id.into(), leg }
    }

    /// The identifier part, without the leg.
    pub fn id(&self) -> &str {
        match self {
            InstrumentKey::Single(id) => id,
            InstrumentKey::Composite { id, .. } => id,
        }
    }

    pub fn leg(&self) -> Option<Leg> {
        match self {
            InstrumentKey::Single(_) => None,
            InstrumentKey::Composite { leg, .. } => Some(*leg),
        }
    }

    pub fn shape(&self) -> KeyShape {
        match self {
            InstrumentKey::Single(_) => KeyShape::Single,
            InstrumentKey::Composite { .. } => KeyShape::Composite,
        }
    }
}

impl fmt::Display for InstrumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentKey::Single(id) => write!(f, "{id}"),
            InstrumentKey::Composite { id, leg } => write!(f, "{id}:{leg}"),
        }
    }
}

/// How input rows are turned into keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyShape {
    #[default]
    Single,
    Composite,
}

impl KeyShape {
    /// Build a key of this shape. Composite keys require a leg.
    pub fn key(&self, id: &str, leg: Option<Leg>) -> Option<InstrumentKey> {
        match (self, leg) {
            (KeyShape::Single, _) => Some(InstrumentKey::single(id)),
            (KeyShape::Composite, Some(leg)) => Some(InstrumentKey::composite(id, leg)),
            (KeyShape::Composite, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn composite_and_single_never_collide() {
        let a = InstrumentKey::single("1:target");
        let b = InstrumentKey::composite("1", Leg::Target);
        assert_eq!(a.to_string(), b.to_string());
        assert_ne!(a, b);

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn legs_of_same_deal_are_distinct() {
        let t = InstrumentKey::composite("0", Leg::Target);
        let a = InstrumentKey::composite("0", Leg::Acquirer);
        assert_ne!(t, a);
        assert_eq!(t.id(), a.id());
        assert_eq!(t.leg(), Some(Leg::Target));
    }

    #[test]
    fn leg_parses_case_insensitively() {
        assert_eq!(" Target ".parse::<Leg>(), Ok(Leg::Target));
        assert_eq!("ACQUIRER".parse::<Leg>(), Ok(Leg::Acquirer));
        assert!("bidder".parse::<Leg>().is_err());
    }

    #[test]
    fn key_shape_requires_leg_for_composite() {
        assert_eq!(KeyShape::Single.key("7", Some(Leg::Target)), Some(InstrumentKey::single("7")));
        assert_eq!(KeyShape::Composite.key("7", None), None);
        assert_eq!(
            KeyShape::Composite.key("7", Some(Leg::Acquirer)),
            Some(InstrumentKey::composite("7", Leg::Acquirer))
        );
    }

    #[test]
    fn keys_serialize_as_plain_or_structured_json() {
        let single = serde_json::to_string(&InstrumentKey::single("AAPL")).unwrap();
        assert_eq!(single, "\"AAPL\"");
        let composite = serde_json::to_string(&InstrumentKey::composite("0", Leg::Target)).unwrap();
        assert_eq!(composite, r#"{"id":"0","leg":"target"}"#);
        let back: InstrumentKey = serde_json::from_str(&composite).unwrap();
        assert_eq!(back, InstrumentKey::composite("0", Leg::Target));
    }
}
