//! Symbol store records: trunk, branches, tags, and excluded symbols.
//!
//! The symbol store is populated by an earlier statistics phase and is
//! read-shared by the rewrite passes. A symbol's `preferred_parent_id` is
//! the hint used by parent adjustment to produce cleaner target history.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::internal::item::SymbolId;

/// One line of development or symbolic name, as recorded project-wide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbol {
    /// The trunk of a file. Not a user symbol; it has no name.
    Trunk { id: SymbolId },
    Branch {
        id: SymbolId,
        name: String,
        preferred_parent_id: Option<SymbolId>,
    },
    Tag {
        id: SymbolId,
        name: String,
        preferred_parent_id: Option<SymbolId>,
    },
    /// A symbol the user asked to drop from the conversion.
    Excluded { id: SymbolId, name: String },
}

impl Symbol {
    pub fn id(&self) -> SymbolId {
        match self {
            Symbol::Trunk { id } => *id,
            Symbol::Branch { id, .. } => *id,
            Symbol::Tag { id, .. } => *id,
            Symbol::Excluded { id, .. } => *id,
        }
    }

    /// User-visible name; `None` for trunk.
    pub fn name(&self) -> Option<&str> {
        match self {
            Symbol::Trunk { .. } => None,
            Symbol::Branch { name, .. } => Some(name),
            Symbol::Tag { name, .. } => Some(name),
            Symbol::Excluded { name, .. } => Some(name),
        }
    }

    pub fn is_trunk(&self) -> bool {
        matches!(self, Symbol::Trunk { .. })
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, Symbol::Branch { .. })
    }

    pub fn is_tag(&self) -> bool {
        matches!(self, Symbol::Tag { .. })
    }

    pub fn is_excluded(&self) -> bool {
        matches!(self, Symbol::Excluded { .. })
    }

    pub fn preferred_parent_id(&self) -> Option<SymbolId> {
        match self {
            Symbol::Branch {
                preferred_parent_id, ..
            } => *preferred_parent_id,
            Symbol::Tag {
                preferred_parent_id, ..
            } => *preferred_parent_id,
            _ => None,
        }
    }
}

/// Read-only view of the project-wide symbol store.
pub trait SymbolDb {
    fn get(&self, id: SymbolId) -> Option<&Symbol>;
}

/// Simple map-backed symbol store, used by tests and small drivers.
#[derive(Debug, Clone, Default)]
pub struct InMemorySymbolDb {
    symbols: AHashMap<SymbolId, Symbol>,
}

impl InMemorySymbolDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: Symbol) {
        self.symbols.insert(symbol.id(), symbol);
    }
}

impl SymbolDb for InMemorySymbolDb {
    fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_accessors() {
        let trunk = Symbol::Trunk { id: SymbolId(0) };
        assert!(trunk.is_trunk());
        assert_eq!(trunk.name(), None);
        assert_eq!(trunk.preferred_parent_id(), None);

        let branch = Symbol::Branch {
            id: SymbolId(1),
            name: "VENDOR".to_string(),
            preferred_parent_id: Some(SymbolId(0)),
        };
        assert!(branch.is_branch());
        assert_eq!(branch.name(), Some("VENDOR"));
        assert_eq!(branch.preferred_parent_id(), Some(SymbolId(0)));
    }

    #[test]
    fn test_in_memory_db() {
        let mut db = InMemorySymbolDb::new();
        db.insert(Symbol::Tag {
            id: SymbolId(5),
            name: "RELEASE_1_0".to_string(),
            preferred_parent_id: None,
        });
        assert!(db.get(SymbolId(5)).unwrap().is_tag());
        assert!(db.get(SymbolId(6)).is_none());
    }
}
