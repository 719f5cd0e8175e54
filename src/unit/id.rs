//! Unit identifiers.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub Uuid);

impl UnitId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// First eight hex digits, for log lines.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for UnitId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UnitId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for UnitId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Owner of a unit: another unit, or `"root"` for top-level requests.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ParentId {
    #[default]
    Root,
    Unit(UnitId),
}

impl ParentId {
    pub const ROOT: &'static str = "root";

    pub fn is_root(&self) -> bool {
        matches!(self, Self::Root)
    }

    pub fn unit(&self) -> Option<UnitId> {
        match self {
            Self::Root => None,
            Self::Unit(id) => Some(*id),
        }
    }
}

impl std::fmt::Display for ParentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root => f.write_str(Self::ROOT),
            Self::Unit(id) => write!(f, "{}", id),
        }
    }
}

impl From<UnitId> for ParentId {
    fn from(id: UnitId) -> Self {
        Self::Unit(id)
    }
}

impl From<ParentId> for String {
    fn from(parent: ParentId) -> Self {
        parent.to_string()
    }
}

impl TryFrom<String> for ParentId {
    type Error = uuid::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s == Self::ROOT {
            return Ok(Self::Root);
        }
        s.parse().map(Self::Unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_id_round_trip() {
        let id = UnitId::new();
        assert_eq!(id.to_string().parse::<UnitId>().unwrap(), id);
        assert_eq!(UnitId::parse(&id.to_string()), Some(id));
        assert_eq!(id.short().len(), 8);
    }

    #[test]
    fn test_parent_id_serde() {
        assert_eq!(serde_json::to_string(&ParentId::Root).unwrap(), r#""root""#);

        let id = UnitId::new();
        let parent = ParentId::from(id);
        let raw = serde_json::to_string(&parent).unwrap();
        assert_eq!(raw, format!("\"{}\"", id));
        assert_eq!(serde_json::from_str::<ParentId>(&raw).unwrap(), parent);
        assert!(serde_json::from_str::<ParentId>(r#""nobody""#).is_err());
    }

    #[test]
    fn test_parent_accessors() {
        assert!(ParentId::Root.is_root());
        let id = UnitId::new();
        assert_eq!(ParentId::Unit(id).unit(), Some(id));
    }
}
