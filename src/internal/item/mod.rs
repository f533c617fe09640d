//! Node model for the per-file revision graph.
//!
//! One CVS file expands into a forest of three node kinds: revisions,
//! branch sprout points, and tags. Every edge between nodes is an id, never
//! a structural pointer, so the container can delete a node with purely
//! local bookkeeping. Nodes are created by the ingestion layer and mutated
//! in place by the rewrite passes; after the last pass the graph is
//! read-only.

use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of one item (revision, branch or tag) within one file.
///
/// Ids are globally unique for the lifetime of the file and survive every
/// rewrite pass, including tag<->branch mutation.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u32);

/// Identifier of a symbol (trunk, branch or tag name) in the symbol store.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(pub u32);

/// Identifier of a CVS file in the file store.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub u32);

/// Identifier of a (author, log message) record in the metadata store.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataId(pub u32);

impl Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for SymbolId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for MetadataId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Combined content/position tag of a revision.
///
/// * `Add` (1): the revision brings the file into existence on its LOD.
/// * `Change` (2): a real content change over an existing predecessor.
/// * `Delete` (3): the revision puts the file into the dead state.
/// * `Noop` (4): structural-only; the file neither exists before nor after.
///
/// `Add` and `Change` are modifications; `Delete` and `Noop` describe an
/// absent file. Rewrite passes recompute this tag with [`RevisionKind::derive`]
/// whenever a revision's predecessor changes.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionKind {
    Add = 1,
    Change,
    Delete,
    Noop,
}

impl RevisionKind {
    /// Transition table keyed on (this is a modification, the previous
    /// revision was a modification).
    pub fn derive(this_is_modification: bool, prev_is_modification: bool) -> RevisionKind {
        match (this_is_modification, prev_is_modification) {
            (true, false) => RevisionKind::Add,
            (true, true) => RevisionKind::Change,
            (false, true) => RevisionKind::Delete,
            (false, false) => RevisionKind::Noop,
        }
    }

    /// True for revisions that carry real content (`Add`, `Change`).
    pub fn is_modification(&self) -> bool {
        matches!(self, RevisionKind::Add | RevisionKind::Change)
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, RevisionKind::Delete)
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, RevisionKind::Noop)
    }
}

impl Display for RevisionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            RevisionKind::Add => write!(f, "add"),
            RevisionKind::Change => write!(f, "change"),
            RevisionKind::Delete => write!(f, "delete"),
            RevisionKind::Noop => write!(f, "noop"),
        }
    }
}

/// One revision of the file on one line of development.
///
/// - `lod` is the symbol id of the LOD the revision lives on (the trunk
///   symbol id for trunk revisions).
/// - `prev_id`/`next_id` form the linear chain along the LOD. The first
///   revision of a branch has `prev_id = None` and `first_on_branch_id`
///   pointing back at the [`CvsBranch`] that introduces its LOD.
/// - `branch_ids`/`tag_ids` are the symbol sprouts rooted at this
///   revision; `branch_commit_ids` lists the first revision of each
///   sprouting branch that has commits.
/// - `default_branch_revision` marks revisions on a vendor branch that act
///   as if they were on trunk; `default_branch_prev_id`/`next_id` are the
///   cross-LOD edges welding the last such revision to trunk `1.2`.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CvsRevision {
    pub id: ItemId,
    /// CVS revision string, e.g. `1.2` or `1.1.1.1`.
    pub rev: String,
    pub lod: SymbolId,
    pub timestamp: DateTime<Utc>,
    pub metadata_id: MetadataId,
    pub kind: RevisionKind,
    pub deltatext_exists: bool,
    pub prev_id: Option<ItemId>,
    pub next_id: Option<ItemId>,
    pub first_on_branch_id: Option<ItemId>,
    pub default_branch_revision: bool,
    pub default_branch_prev_id: Option<ItemId>,
    pub default_branch_next_id: Option<ItemId>,
    pub tag_ids: Vec<ItemId>,
    pub branch_ids: Vec<ItemId>,
    pub branch_commit_ids: Vec<ItemId>,
    /// Symbols whose last possible copy source this revision invalidates.
    pub closed_symbol_ids: Vec<SymbolId>,
}

impl Display for CvsRevision {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}<{}>", self.rev, self.id)
    }
}

/// The sprouting point of a branch on a source revision.
///
/// `next_id` points at the first commit on the branch, if any. A branch
/// node can itself carry `tag_ids`/`branch_ids`: symbols grafted onto the
/// branch root by parent adjustment.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CvsBranch {
    pub id: ItemId,
    pub symbol_id: SymbolId,
    /// CVS branch number, e.g. `1.1.1`. Absent for branches that started
    /// life as tags.
    pub branch_number: Option<String>,
    pub source_lod: SymbolId,
    pub source_id: ItemId,
    pub next_id: Option<ItemId>,
    pub tag_ids: Vec<ItemId>,
    pub branch_ids: Vec<ItemId>,
    /// Set when the ultimate source revision is not a modification.
    pub noop: bool,
}

impl Display for CvsBranch {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "branch:{}@{}<{}>", self.symbol_id, self.source_id, self.id)
    }
}

/// A tag attached to a source revision (or to a branch root after parent
/// adjustment).
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CvsTag {
    pub id: ItemId,
    pub symbol_id: SymbolId,
    pub source_lod: SymbolId,
    pub source_id: ItemId,
    /// Set when the ultimate source revision is not a modification.
    pub noop: bool,
}

impl Display for CvsTag {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "tag:{}@{}<{}>", self.symbol_id, self.source_id, self.id)
    }
}

/// One node of the per-file graph.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CvsItem {
    Revision(CvsRevision),
    Branch(CvsBranch),
    Tag(CvsTag),
}

impl CvsItem {
    pub fn id(&self) -> ItemId {
        match self {
            CvsItem::Revision(rev) => rev.id,
            CvsItem::Branch(branch) => branch.id,
            CvsItem::Tag(tag) => tag.id,
        }
    }

    pub fn as_revision(&self) -> Option<&CvsRevision> {
        match self {
            CvsItem::Revision(rev) => Some(rev),
            _ => None,
        }
    }

    pub fn as_revision_mut(&mut self) -> Option<&mut CvsRevision> {
        match self {
            CvsItem::Revision(rev) => Some(rev),
            _ => None,
        }
    }

    pub fn as_branch(&self) -> Option<&CvsBranch> {
        match self {
            CvsItem::Branch(branch) => Some(branch),
            _ => None,
        }
    }

    pub fn as_branch_mut(&mut self) -> Option<&mut CvsBranch> {
        match self {
            CvsItem::Branch(branch) => Some(branch),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> Option<&CvsTag> {
        match self {
            CvsItem::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn as_tag_mut(&mut self) -> Option<&mut CvsTag> {
        match self {
            CvsItem::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    /// Symbol id for branch and tag nodes; `None` for revisions.
    pub fn symbol_id(&self) -> Option<SymbolId> {
        match self {
            CvsItem::Revision(_) => None,
            CvsItem::Branch(branch) => Some(branch.symbol_id),
            CvsItem::Tag(tag) => Some(tag.symbol_id),
        }
    }

    /// Source revision (or branch-root) id for branch and tag nodes.
    pub fn source_id(&self) -> Option<ItemId> {
        match self {
            CvsItem::Revision(_) => None,
            CvsItem::Branch(branch) => Some(branch.source_id),
            CvsItem::Tag(tag) => Some(tag.source_id),
        }
    }

    /// Outgoing tag sprouts, for the node kinds that can carry them.
    pub fn tag_ids(&self) -> Option<&Vec<ItemId>> {
        match self {
            CvsItem::Revision(rev) => Some(&rev.tag_ids),
            CvsItem::Branch(branch) => Some(&branch.tag_ids),
            CvsItem::Tag(_) => None,
        }
    }

    pub fn tag_ids_mut(&mut self) -> Option<&mut Vec<ItemId>> {
        match self {
            CvsItem::Revision(rev) => Some(&mut rev.tag_ids),
            CvsItem::Branch(branch) => Some(&mut branch.tag_ids),
            CvsItem::Tag(_) => None,
        }
    }

    /// Outgoing branch sprouts, for the node kinds that can carry them.
    pub fn branch_ids(&self) -> Option<&Vec<ItemId>> {
        match self {
            CvsItem::Revision(rev) => Some(&rev.branch_ids),
            CvsItem::Branch(branch) => Some(&branch.branch_ids),
            CvsItem::Tag(_) => None,
        }
    }

    pub fn branch_ids_mut(&mut self) -> Option<&mut Vec<ItemId>> {
        match self {
            CvsItem::Revision(rev) => Some(&mut rev.branch_ids),
            CvsItem::Branch(branch) => Some(&mut branch.branch_ids),
            CvsItem::Tag(_) => None,
        }
    }
}

impl Display for CvsItem {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            CvsItem::Revision(rev) => rev.fmt(f),
            CvsItem::Branch(branch) => branch.fmt(f),
            CvsItem::Tag(tag) => tag.fmt(f),
        }
    }
}

impl From<CvsRevision> for CvsItem {
    fn from(rev: CvsRevision) -> Self {
        CvsItem::Revision(rev)
    }
}

impl From<CvsBranch> for CvsItem {
    fn from(branch: CvsBranch) -> Self {
        CvsItem::Branch(branch)
    }
}

impl From<CvsTag> for CvsItem {
    fn from(tag: CvsTag) -> Self {
        CvsItem::Tag(tag)
    }
}
