//! Collaborator stores consumed by the rewrite passes and the recorder.
//!
//! The core never owns these stores; they are passed in explicitly where
//! needed. Each trait has a map-backed in-memory implementation that tests
//! and small drivers can populate directly.

use std::path::PathBuf;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::internal::file_items::CvsFileItems;
use crate::internal::item::{FileId, ItemId, MetadataId};

/// Author and log message shared by the revisions of one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub author: String,
    pub log_msg: String,
}

/// Read-only view of the commit metadata store.
pub trait MetadataDb {
    fn get(&self, id: MetadataId) -> Option<&Metadata>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryMetadataDb {
    records: AHashMap<MetadataId, Metadata>,
}

impl InMemoryMetadataDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: MetadataId, author: &str, log_msg: &str) {
        self.records.insert(
            id,
            Metadata {
                author: author.to_string(),
                log_msg: log_msg.to_string(),
            },
        );
    }
}

impl MetadataDb for InMemoryMetadataDb {
    fn get(&self, id: MetadataId) -> Option<&Metadata> {
        self.records.get(&id)
    }
}

/// Identity of one file in the source repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvsFileRecord {
    pub id: FileId,
    pub filename: PathBuf,
    /// Basename with the `,v` suffix stripped, as it appears in generated
    /// log messages.
    pub basename: String,
    pub project: String,
}

/// Read-only view of the file store.
pub trait CvsFileDb {
    fn get(&self, id: FileId) -> Option<&CvsFileRecord>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCvsFileDb {
    records: AHashMap<FileId, CvsFileRecord>,
}

impl InMemoryCvsFileDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: CvsFileRecord) {
        self.records.insert(record.id, record);
    }
}

impl CvsFileDb for InMemoryCvsFileDb {
    fn get(&self, id: FileId) -> Option<&CvsFileRecord> {
        self.records.get(&id)
    }
}

/// Mapping from item ids to already-assigned target revision numbers, plus
/// per-symbol fill bookkeeping. Populated by the commit-replay phase and
/// read by [`close`](crate::internal::record::openings::OpeningsClosingsLogger::close).
pub trait PersistenceManager {
    /// Target revision number the given item was committed in, if any.
    fn svn_revnum(&self, item_id: ItemId) -> Option<u32>;

    /// Last target revision in which the named symbol was filled.
    fn last_filled(&self, symbol: &str) -> Option<u32>;

    /// First target revision strictly after `after` in which the named
    /// symbol was filled.
    fn first_fill_after(&self, symbol: &str, after: u32) -> Option<u32>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryPersistenceManager {
    revnums: AHashMap<ItemId, u32>,
    fills: AHashMap<String, Vec<u32>>,
}

impl InMemoryPersistenceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_svn_revnum(&mut self, item_id: ItemId, revnum: u32) {
        self.revnums.insert(item_id, revnum);
    }

    /// Record that `symbol` was filled in target revision `revnum`.
    pub fn add_fill(&mut self, symbol: &str, revnum: u32) {
        let fills = self.fills.entry(symbol.to_string()).or_default();
        fills.push(revnum);
        fills.sort_unstable();
    }
}

impl PersistenceManager for InMemoryPersistenceManager {
    fn svn_revnum(&self, item_id: ItemId) -> Option<u32> {
        self.revnums.get(&item_id).copied()
    }

    fn last_filled(&self, symbol: &str) -> Option<u32> {
        self.fills.get(symbol).and_then(|f| f.last().copied())
    }

    fn first_fill_after(&self, symbol: &str, after: u32) -> Option<u32> {
        self.fills
            .get(symbol)?
            .iter()
            .copied()
            .find(|&revnum| revnum > after)
    }
}

/// Callback interface notified by
/// [`filter_excluded_symbols`](crate::internal::file_items::CvsFileItems::filter_excluded_symbols)
/// once per file.
pub trait RevisionExcluder {
    /// The file's graph changed; the excluder may need to rewrite its
    /// revision contents.
    fn process_file(&mut self, file_items: &CvsFileItems);

    /// Nothing in the file was excluded.
    fn skip_file(&mut self, file_id: FileId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_fill_queries() {
        let mut pm = InMemoryPersistenceManager::new();
        pm.add_fill("B", 12);
        pm.add_fill("B", 30);
        pm.add_fill("B", 21);
        assert_eq!(pm.last_filled("B"), Some(30));
        assert_eq!(pm.first_fill_after("B", 12), Some(21));
        assert_eq!(pm.first_fill_after("B", 30), None);
        assert_eq!(pm.last_filled("T"), None);
    }

    #[test]
    fn test_metadata_db() {
        let mut db = InMemoryMetadataDb::new();
        db.insert(MetadataId(3), "jrandom", "Initial revision\n");
        assert_eq!(db.get(MetadataId(3)).unwrap().author, "jrandom");
        assert!(db.get(MetadataId(4)).is_none());
    }
}
