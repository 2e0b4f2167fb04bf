//! Host object capability interface
//!
//! The binding resolver never inspects host types directly. Anything reachable
//! from a data context implements [`DataObject`] and answers member lookups,
//! indexing and container-shape questions itself.

use crate::value::{Value, ValueKind};
use std::fmt;

/// Seeds for member id hashing; fixed so ids agree across objects and runs
const MEMBER_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

/// Handle to a resolved member
///
/// A handle returned by [`DataObject::find_member`] is valid for every object
/// reporting the same [`DataObject::type_name`], which is what lets a parsed
/// binding step memoize it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberId(pub u64);

impl MemberId {
    /// Case-insensitive id derived from a member name
    pub fn of(name: &str) -> Self {
        let hasher = ahash::RandomState::with_seeds(
            MEMBER_SEEDS[0],
            MEMBER_SEEDS[1],
            MEMBER_SEEDS[2],
            MEMBER_SEEDS[3],
        );
        MemberId(hasher.hash_one(name.to_lowercase()))
    }
}

/// Shape of a container, resolved once per binding step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ContainerKind {
    /// Plain object, no indexer
    #[default]
    Scalar,
    /// Positional indexer (list-like)
    Sequence,
    /// Keyed indexer (map-like)
    Associative,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerKind::Scalar => write!(f, "object"),
            ContainerKind::Sequence => write!(f, "sequence"),
            ContainerKind::Associative => write!(f, "dictionary"),
        }
    }
}

/// A host-owned object that binding paths can walk into
pub trait DataObject: fmt::Debug + Send + Sync {
    /// Runtime type name, used in error messages and to scope member handles
    fn type_name(&self) -> &str;

    /// Container shape of this object
    fn container_kind(&self) -> ContainerKind {
        ContainerKind::Scalar
    }

    /// Resolve a member name (case-insensitive)
    fn find_member(&self, name: &str) -> Option<MemberId>;

    /// Read a member previously resolved with [`find_member`](Self::find_member)
    fn member_value(&self, id: MemberId) -> Option<Value>;

    /// Zero-value instance of the member's declared type, used in validation mode
    fn member_placeholder(&self, _id: MemberId) -> Option<Value> {
        None
    }

    /// Apply the indexer to already-coerced keys
    fn get_indexed(&self, _keys: &[Value]) -> Option<Value> {
        None
    }

    /// Test key membership of an associative container
    fn contains_key(&self, keys: &[Value]) -> bool {
        self.get_indexed(keys).is_some()
    }

    /// Kind indexer keys are coerced to before lookup
    fn key_kind(&self) -> Option<ValueKind> {
        None
    }

    /// Zero-value instance of the element type
    fn element_placeholder(&self) -> Option<Value> {
        None
    }

    /// Short human readable description
    fn describe(&self) -> String {
        self.type_name().to_string()
    }

    /// Resolve and read a member in one go
    fn get_member(&self, name: &str) -> Option<Value> {
        self.find_member(name).and_then(|id| self.member_value(id))
    }

    fn is_sequence(&self) -> bool {
        self.container_kind() == ContainerKind::Sequence
    }

    fn is_associative(&self) -> bool {
        self.container_kind() == ContainerKind::Associative
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_id_case_insensitive() {
        assert_eq!(MemberId::of("Name"), MemberId::of("NAME"));
        assert_eq!(MemberId::of("name"), MemberId::of("nAmE"));
        assert_ne!(MemberId::of("Name"), MemberId::of("Age"));
    }

    #[test]
    fn test_container_kind_display() {
        assert_eq!(ContainerKind::Associative.to_string(), "dictionary");
        assert_eq!(ContainerKind::default(), ContainerKind::Scalar);
    }
}
