//! Node kind tags.
//!
//! The numeric kind space belongs to the tree producer. The encoder only
//! needs one guarantee from it: no real kind uses the all-ones value, which
//! marks synthetic list records. [`SyntaxKind`] enforces that at
//! construction, and [`RecordKind`] keeps list records apart from real
//! kinds until the record is written out.

use serde::{Deserialize, Serialize};

use crate::error::EncodeError;
use crate::format::KIND_NODE_LIST;

/// A producer-defined syntax kind. Never equal to the list sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SyntaxKind(u32);

impl SyntaxKind {
    /// Create a kind, rejecting the reserved list sentinel.
    pub fn new(raw: u32) -> Result<Self, EncodeError> {
        if raw == KIND_NODE_LIST {
            return Err(EncodeError::ReservedKind);
        }
        Ok(SyntaxKind(raw))
    }

    /// Get the raw u32 value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for SyntaxKind {
    type Error = EncodeError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        SyntaxKind::new(raw)
    }
}

impl From<SyntaxKind> for u32 {
    fn from(kind: SyntaxKind) -> u32 {
        kind.0
    }
}

/// The kind written into a node record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// A real syntax node.
    Syntax(SyntaxKind),
    /// A synthetic record grouping a run of list items.
    List,
}

impl RecordKind {
    /// The value stored in the record's `kind` field.
    #[inline]
    pub fn to_raw(self) -> u32 {
        match self {
            RecordKind::Syntax(kind) => kind.raw(),
            RecordKind::List => KIND_NODE_LIST,
        }
    }

    /// Interpret a raw `kind` field.
    #[inline]
    pub fn from_raw(raw: u32) -> Self {
        if raw == KIND_NODE_LIST {
            RecordKind::List
        } else {
            RecordKind::Syntax(SyntaxKind(raw))
        }
    }

    /// Whether this is a list record.
    pub fn is_list(self) -> bool {
        matches!(self, RecordKind::List)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_is_rejected() {
        assert_eq!(SyntaxKind::new(u32::MAX), Err(EncodeError::ReservedKind));
        assert_eq!(SyntaxKind::new(u32::MAX - 1).unwrap().raw(), u32::MAX - 1);
    }

    #[test]
    fn test_record_kind_raw_roundtrip() {
        let kind = RecordKind::Syntax(SyntaxKind::new(80).unwrap());
        assert_eq!(RecordKind::from_raw(kind.to_raw()), kind);
        assert_eq!(RecordKind::List.to_raw(), KIND_NODE_LIST);
        assert!(RecordKind::from_raw(KIND_NODE_LIST).is_list());
    }

    #[test]
    fn test_deserialize_rejects_sentinel() {
        let ok: SyntaxKind = serde_json::from_str("12").unwrap();
        assert_eq!(ok.raw(), 12);
        assert!(serde_json::from_str::<SyntaxKind>("4294967295").is_err());
    }
}
