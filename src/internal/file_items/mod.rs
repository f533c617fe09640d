//! Per-file item container and line-of-development traversal.
//!
//! [`CvsFileItems`] owns the forest of items that one CVS file expands
//! into: an id -> node arena plus the set of root ids. The rewrite passes
//! live in the sibling modules of this directory and are all methods on
//! the container; this module provides the container itself, the
//! depth-first leaf-first LOD traversal, and the link consistency checker
//! that the passes (and their tests) use to validate the graph invariants.

mod deletes;
mod exclude;
mod ntdbr;
mod symbols;

use std::collections::{BTreeSet, VecDeque};

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::errors::CvsError;
use crate::internal::item::{CvsBranch, CvsItem, CvsRevision, CvsTag, FileId, ItemId, SymbolId};

/// The items of one CVS file.
///
/// - Keys of the arena are unique item ids; iteration order is irrelevant.
/// - The root set contains exactly the revisions with neither a `prev`
///   edge nor a `first_on_branch` edge; rewrites maintain it explicitly.
/// - Serialization round-trips through `(file_id, trunk_id, items[])`;
///   the root set is re-derived on reconstruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "FileItemsSnapshot", into = "FileItemsSnapshot")]
pub struct CvsFileItems {
    file_id: FileId,
    trunk_id: SymbolId,
    items: AHashMap<ItemId, CvsItem>,
    root_ids: BTreeSet<ItemId>,
}

#[derive(Serialize, Deserialize)]
struct FileItemsSnapshot {
    file_id: FileId,
    trunk_id: SymbolId,
    items: Vec<CvsItem>,
}

impl From<CvsFileItems> for FileItemsSnapshot {
    fn from(file_items: CvsFileItems) -> Self {
        let mut items: Vec<CvsItem> = file_items.items.into_values().collect();
        items.sort_by_key(|item| item.id());
        FileItemsSnapshot {
            file_id: file_items.file_id,
            trunk_id: file_items.trunk_id,
            items,
        }
    }
}

impl From<FileItemsSnapshot> for CvsFileItems {
    fn from(snapshot: FileItemsSnapshot) -> Self {
        CvsFileItems::new(snapshot.file_id, snapshot.trunk_id, snapshot.items)
    }
}

impl CvsFileItems {
    /// Build the container from the items the ingestion layer produced.
    /// The root set is derived from the items themselves.
    pub fn new(file_id: FileId, trunk_id: SymbolId, items: Vec<CvsItem>) -> Self {
        let mut arena = AHashMap::with_capacity(items.len());
        let mut root_ids = BTreeSet::new();
        for item in items {
            if let CvsItem::Revision(rev) = &item
                && rev.prev_id.is_none()
                && rev.first_on_branch_id.is_none()
            {
                root_ids.insert(rev.id);
            }
            arena.insert(item.id(), item);
        }
        CvsFileItems {
            file_id,
            trunk_id,
            items: arena,
            root_ids,
        }
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    pub fn trunk_id(&self) -> SymbolId {
        self.trunk_id
    }

    pub fn is_trunk(&self, lod: SymbolId) -> bool {
        lod == self.trunk_id
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    /// Insert or replace an item. Root membership is not touched.
    pub fn add(&mut self, item: impl Into<CvsItem>) {
        let item = item.into();
        self.items.insert(item.id(), item);
    }

    pub fn get(&self, id: ItemId) -> Option<&CvsItem> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut CvsItem> {
        self.items.get_mut(&id)
    }

    /// Remove an item. The caller must have taken the id out of the root
    /// set first; removing a root member is an error.
    pub fn remove(&mut self, id: ItemId) -> Result<CvsItem, CvsError> {
        if self.root_ids.contains(&id) {
            return Err(CvsError::RemoveRootItem(id.to_string()));
        }
        self.items
            .remove(&id)
            .ok_or_else(|| CvsError::DanglingItemId(id.to_string()))
    }

    pub fn root_ids(&self) -> &BTreeSet<ItemId> {
        &self.root_ids
    }

    pub fn add_root(&mut self, id: ItemId) {
        self.root_ids.insert(id);
    }

    pub fn remove_root(&mut self, id: ItemId) -> bool {
        self.root_ids.remove(&id)
    }

    pub fn iter_values(&self) -> impl Iterator<Item = &CvsItem> {
        self.items.values()
    }

    /// Sorted snapshot of all item ids, for deterministic mutation loops.
    pub fn item_ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self.items.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn item(&self, id: ItemId) -> Result<&CvsItem, CvsError> {
        self.items
            .get(&id)
            .ok_or_else(|| CvsError::DanglingItemId(id.to_string()))
    }

    pub fn item_mut(&mut self, id: ItemId) -> Result<&mut CvsItem, CvsError> {
        self.items
            .get_mut(&id)
            .ok_or_else(|| CvsError::DanglingItemId(id.to_string()))
    }

    pub fn revision(&self, id: ItemId) -> Result<&CvsRevision, CvsError> {
        let item = self.item(id)?;
        item.as_revision()
            .ok_or_else(|| CvsError::UnexpectedItemKind(item.to_string(), "revision"))
    }

    pub fn revision_mut(&mut self, id: ItemId) -> Result<&mut CvsRevision, CvsError> {
        let item = self.item_mut(id)?;
        let display = item.to_string();
        item.as_revision_mut()
            .ok_or(CvsError::UnexpectedItemKind(display, "revision"))
    }

    pub fn branch(&self, id: ItemId) -> Result<&CvsBranch, CvsError> {
        let item = self.item(id)?;
        item.as_branch()
            .ok_or_else(|| CvsError::UnexpectedItemKind(item.to_string(), "branch"))
    }

    pub fn branch_mut(&mut self, id: ItemId) -> Result<&mut CvsBranch, CvsError> {
        let item = self.item_mut(id)?;
        let display = item.to_string();
        item.as_branch_mut()
            .ok_or(CvsError::UnexpectedItemKind(display, "branch"))
    }

    pub fn tag(&self, id: ItemId) -> Result<&CvsTag, CvsError> {
        let item = self.item(id)?;
        item.as_tag()
            .ok_or_else(|| CvsError::UnexpectedItemKind(item.to_string(), "tag"))
    }

    pub fn tag_mut(&mut self, id: ItemId) -> Result<&mut CvsTag, CvsError> {
        let item = self.item_mut(id)?;
        let display = item.to_string();
        item.as_tag_mut()
            .ok_or(CvsError::UnexpectedItemKind(display, "tag"))
    }

    /// Follow a symbol's `source_id` through any chain of branch nodes to
    /// the revision it is ultimately rooted on.
    pub fn ultimate_source_revision(
        &self,
        mut source_id: ItemId,
    ) -> Result<&CvsRevision, CvsError> {
        loop {
            match self.item(source_id)? {
                CvsItem::Revision(rev) => return Ok(rev),
                CvsItem::Branch(branch) => source_id = branch.source_id,
                tag @ CvsItem::Tag(_) => {
                    return Err(CvsError::UnexpectedItemKind(
                        tag.to_string(),
                        "revision or branch",
                    ));
                }
            }
        }
    }

    /// Start a depth-first leaf-first walk over the LODs reachable from a
    /// snapshot of the current root set. The cursor takes the container by
    /// shared reference on every step, so the caller may delete nodes in
    /// the already-yielded portion of the graph between yields.
    pub fn lod_cursor(&self) -> LodCursor {
        LodCursor {
            roots: self.root_ids.iter().copied().collect(),
            stack: Vec::new(),
        }
    }

    /// Plain iterator over [`LodItems`] for read-only walks.
    pub fn iter_lods(&self) -> impl Iterator<Item = LodItems> + '_ {
        let mut cursor = self.lod_cursor();
        std::iter::from_fn(move || cursor.next_lod(self))
    }

    /// The items of the single LOD introduced by `branch`, without
    /// recursing into child branches.
    pub fn get_lod_items(&self, branch: &CvsBranch) -> Result<LodItems, CvsError> {
        let mut lod_items = LodItems {
            lod: branch.symbol_id,
            branch_node: Some(branch.id),
            revisions: Vec::new(),
            child_branches: branch.branch_ids.clone(),
            child_tags: branch.tag_ids.clone(),
        };
        let mut id = branch.next_id;
        while let Some(rev_id) = id {
            let rev = self.revision(rev_id)?;
            lod_items.revisions.push(rev_id);
            lod_items.child_branches.extend(rev.branch_ids.iter().copied());
            lod_items.child_tags.extend(rev.tag_ids.iter().copied());
            id = rev.next_id;
        }
        Ok(lod_items)
    }

    /// Verify the structural invariants of the whole graph. Returns
    /// `CvsError::BrokenLink` naming the offending node on the first
    /// violation found.
    pub fn check_link_consistency(&self) -> Result<(), CvsError> {
        for id in self.item_ids() {
            match self.item(id)? {
                CvsItem::Revision(rev) => self.check_revision_links(rev)?,
                CvsItem::Branch(branch) => self.check_branch_links(branch)?,
                CvsItem::Tag(tag) => self.check_tag_links(tag)?,
            }
        }
        for &root_id in &self.root_ids {
            if !self.contains(root_id) {
                return Err(CvsError::BrokenLink(
                    root_id.to_string(),
                    "root id does not resolve".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn broken(item: &dyn std::fmt::Display, what: impl Into<String>) -> CvsError {
        CvsError::BrokenLink(item.to_string(), what.into())
    }

    fn check_revision_links(&self, rev: &CvsRevision) -> Result<(), CvsError> {
        if let Some(prev_id) = rev.prev_id {
            let prev = self
                .revision(prev_id)
                .map_err(|_| Self::broken(rev, format!("prev {prev_id} does not resolve")))?;
            if prev.next_id != Some(rev.id) {
                return Err(Self::broken(rev, format!("prev {prev} does not link back")));
            }
        }
        if let Some(next_id) = rev.next_id {
            let next = self
                .revision(next_id)
                .map_err(|_| Self::broken(rev, format!("next {next_id} does not resolve")))?;
            if next.prev_id != Some(rev.id) {
                return Err(Self::broken(rev, format!("next {next} does not link back")));
            }
        }
        if let Some(branch_id) = rev.first_on_branch_id {
            if rev.prev_id.is_some() {
                return Err(Self::broken(rev, "first-on-branch revision has a prev edge"));
            }
            if !crate::utils::is_branch_revision(&rev.rev) {
                return Err(Self::broken(
                    rev,
                    "first-on-branch revision with a non-branch revision number",
                ));
            }
            let branch = self
                .branch(branch_id)
                .map_err(|_| Self::broken(rev, format!("branch {branch_id} does not resolve")))?;
            if branch.next_id != Some(rev.id) {
                return Err(Self::broken(
                    rev,
                    format!("introducing branch {branch} does not link back"),
                ));
            }
        }
        let should_be_root = rev.prev_id.is_none() && rev.first_on_branch_id.is_none();
        if should_be_root != self.root_ids.contains(&rev.id) {
            return Err(Self::broken(rev, "root set membership is wrong"));
        }
        if let Some(next_id) = rev.default_branch_next_id {
            if !rev.default_branch_revision {
                return Err(Self::broken(
                    rev,
                    "default-branch next edge on a non-default-branch revision",
                ));
            }
            let next = self.revision(next_id).map_err(|_| {
                Self::broken(rev, format!("default-branch next {next_id} does not resolve"))
            })?;
            if next.default_branch_prev_id != Some(rev.id) {
                return Err(Self::broken(
                    rev,
                    format!("default-branch next {next} does not link back"),
                ));
            }
        }
        if let Some(prev_id) = rev.default_branch_prev_id {
            let prev = self.revision(prev_id).map_err(|_| {
                Self::broken(rev, format!("default-branch prev {prev_id} does not resolve"))
            })?;
            if prev.default_branch_next_id != Some(rev.id) {
                return Err(Self::broken(
                    rev,
                    format!("default-branch prev {prev} does not link back"),
                ));
            }
        }
        for &tag_id in &rev.tag_ids {
            let tag = self
                .tag(tag_id)
                .map_err(|_| Self::broken(rev, format!("tag sprout {tag_id} does not resolve")))?;
            if tag.source_id != rev.id {
                return Err(Self::broken(rev, format!("tag {tag} has a different source")));
            }
        }
        for &branch_id in &rev.branch_ids {
            let branch = self.branch(branch_id).map_err(|_| {
                Self::broken(rev, format!("branch sprout {branch_id} does not resolve"))
            })?;
            if branch.source_id != rev.id {
                return Err(Self::broken(
                    rev,
                    format!("branch {branch} has a different source"),
                ));
            }
        }
        for &commit_id in &rev.branch_commit_ids {
            let commit = self.revision(commit_id).map_err(|_| {
                Self::broken(rev, format!("branch commit {commit_id} does not resolve"))
            })?;
            let ok = commit
                .first_on_branch_id
                .and_then(|branch_id| self.branch(branch_id).ok())
                .is_some_and(|branch| branch.source_id == rev.id);
            if !ok {
                return Err(Self::broken(
                    rev,
                    format!("branch commit {commit} is not rooted here"),
                ));
            }
        }
        // Walking the chain from a root must terminate within the arena.
        if rev.prev_id.is_none() {
            let mut steps = 0usize;
            let mut cursor = Some(rev.id);
            while let Some(id) = cursor {
                steps += 1;
                if steps > self.items.len() {
                    return Err(Self::broken(rev, "cycle in next chain"));
                }
                cursor = self.revision(id)?.next_id;
            }
        }
        Ok(())
    }

    fn check_branch_links(&self, branch: &CvsBranch) -> Result<(), CvsError> {
        let source = self
            .item(branch.source_id)
            .map_err(|_| Self::broken(branch, "source does not resolve"))?;
        let listed = source
            .branch_ids()
            .is_some_and(|ids| ids.contains(&branch.id));
        if !listed {
            return Err(Self::broken(
                branch,
                format!("source {source} does not list this branch"),
            ));
        }
        if let Some(next_id) = branch.next_id {
            let first = self.revision(next_id).map_err(|_| {
                Self::broken(branch, format!("first commit {next_id} does not resolve"))
            })?;
            if first.first_on_branch_id != Some(branch.id) {
                return Err(Self::broken(
                    branch,
                    format!("first commit {first} does not link back"),
                ));
            }
        }
        for &tag_id in &branch.tag_ids {
            let tag = self
                .tag(tag_id)
                .map_err(|_| Self::broken(branch, format!("tag sprout {tag_id} does not resolve")))?;
            if tag.source_id != branch.id {
                return Err(Self::broken(
                    branch,
                    format!("tag {tag} has a different source"),
                ));
            }
        }
        for &branch_id in &branch.branch_ids {
            let child = self.branch(branch_id).map_err(|_| {
                Self::broken(branch, format!("branch sprout {branch_id} does not resolve"))
            })?;
            if child.source_id != branch.id {
                return Err(Self::broken(
                    branch,
                    format!("branch {child} has a different source"),
                ));
            }
        }
        Ok(())
    }

    fn check_tag_links(&self, tag: &CvsTag) -> Result<(), CvsError> {
        let source = self
            .item(tag.source_id)
            .map_err(|_| Self::broken(tag, "source does not resolve"))?;
        let listed = source.tag_ids().is_some_and(|ids| ids.contains(&tag.id));
        if !listed {
            return Err(Self::broken(
                tag,
                format!("source {source} does not list this tag"),
            ));
        }
        Ok(())
    }
}

/// The computed view of one line of development.
///
/// All fields hold ids so the view stays valid while the caller mutates
/// the container; resolve through the container when node data is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LodItems {
    pub lod: SymbolId,
    /// The branch node introducing this LOD; `None` for trunk and for
    /// orphaned branches rooted directly in the root set.
    pub branch_node: Option<ItemId>,
    pub revisions: Vec<ItemId>,
    pub child_branches: Vec<ItemId>,
    pub child_tags: Vec<ItemId>,
}

struct LodFrame {
    lod: SymbolId,
    branch_node: Option<ItemId>,
    revisions: Vec<ItemId>,
    child_branches: Vec<ItemId>,
    child_tags: Vec<ItemId>,
    next_rev: Option<ItemId>,
    branch_queue: VecDeque<ItemId>,
    returned_branch: Option<ItemId>,
}

impl LodFrame {
    fn for_root_revision(rev: &CvsRevision) -> LodFrame {
        LodFrame {
            lod: rev.lod,
            branch_node: None,
            revisions: Vec::new(),
            child_branches: Vec::new(),
            child_tags: Vec::new(),
            next_rev: Some(rev.id),
            branch_queue: VecDeque::new(),
            returned_branch: None,
        }
    }

    fn for_branch(branch: &CvsBranch) -> LodFrame {
        LodFrame {
            lod: branch.symbol_id,
            branch_node: Some(branch.id),
            revisions: Vec::new(),
            child_branches: Vec::new(),
            child_tags: branch.tag_ids.clone(),
            next_rev: branch.next_id,
            branch_queue: branch.branch_ids.iter().copied().collect(),
            returned_branch: None,
        }
    }

    fn finish(self) -> LodItems {
        LodItems {
            lod: self.lod,
            branch_node: self.branch_node,
            revisions: self.revisions,
            child_branches: self.child_branches,
            child_tags: self.child_tags,
        }
    }
}

/// Depth-first leaf-first walk over the LODs of a file.
///
/// The root set is snapshotted at construction. Each [`next_lod`] call
/// reads the container's current state, so deletions made by the caller in
/// the already-yielded (leaf-side) portion of the graph are honored: a
/// child branch deleted during the walk is silently dropped from its
/// parent's `child_branches`. Mutations strictly upstream of the current
/// position are undefined.
///
/// [`next_lod`]: LodCursor::next_lod
pub struct LodCursor {
    roots: VecDeque<ItemId>,
    stack: Vec<LodFrame>,
}

impl LodCursor {
    pub fn next_lod(&mut self, file_items: &CvsFileItems) -> Option<LodItems> {
        loop {
            if self.stack.is_empty() {
                let root_id = self.roots.pop_front()?;
                match file_items.get(root_id) {
                    Some(CvsItem::Revision(rev)) => {
                        self.stack.push(LodFrame::for_root_revision(rev));
                    }
                    Some(CvsItem::Branch(branch)) => {
                        self.stack.push(LodFrame::for_branch(branch));
                    }
                    // Deleted while other roots were being walked, or not a
                    // LOD starting point at all.
                    _ => {}
                }
                continue;
            }

            let top = self.stack.len() - 1;
            if let Some(branch_id) = self.stack[top].returned_branch.take() {
                if file_items.contains(branch_id) {
                    self.stack[top].child_branches.push(branch_id);
                }
                continue;
            }

            if let Some(branch_id) = self.stack[top].branch_queue.pop_front() {
                self.stack[top].returned_branch = Some(branch_id);
                if let Some(CvsItem::Branch(branch)) = file_items.get(branch_id) {
                    self.stack.push(LodFrame::for_branch(branch));
                }
                continue;
            }

            if let Some(rev_id) = self.stack[top].next_rev.take() {
                if let Some(CvsItem::Revision(rev)) = file_items.get(rev_id) {
                    let frame = &mut self.stack[top];
                    frame.revisions.push(rev_id);
                    frame.child_tags.extend(rev.tag_ids.iter().copied());
                    frame.branch_queue.extend(rev.branch_ids.iter().copied());
                    frame.next_rev = rev.next_id;
                }
                continue;
            }

            let frame = self.stack.pop().expect("frame checked above");
            return Some(frame.finish());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::item::{MetadataId, RevisionKind};
    use chrono::{TimeZone, Utc};

    pub(crate) const TRUNK: SymbolId = SymbolId(0);

    pub(crate) fn revision(id: u32, rev: &str, lod: SymbolId, kind: RevisionKind) -> CvsRevision {
        CvsRevision {
            id: ItemId(id),
            rev: rev.to_string(),
            lod,
            timestamp: Utc.timestamp_opt(1_000_000_000 + id as i64, 0).unwrap(),
            metadata_id: MetadataId(id),
            kind,
            deltatext_exists: true,
            prev_id: None,
            next_id: None,
            first_on_branch_id: None,
            default_branch_revision: false,
            default_branch_prev_id: None,
            default_branch_next_id: None,
            tag_ids: vec![],
            branch_ids: vec![],
            branch_commit_ids: vec![],
            closed_symbol_ids: vec![],
        }
    }

    pub(crate) fn branch(id: u32, symbol: SymbolId, source_lod: SymbolId, source: u32) -> CvsBranch {
        CvsBranch {
            id: ItemId(id),
            symbol_id: symbol,
            branch_number: None,
            source_lod,
            source_id: ItemId(source),
            next_id: None,
            tag_ids: vec![],
            branch_ids: vec![],
            noop: false,
        }
    }

    pub(crate) fn tag(id: u32, symbol: SymbolId, source_lod: SymbolId, source: u32) -> CvsTag {
        CvsTag {
            id: ItemId(id),
            symbol_id: symbol,
            source_lod,
            source_id: ItemId(source),
            noop: false,
        }
    }

    /// Trunk 1.1 -> 1.2, branch B sprouting at 1.1 with revisions
    /// 1.1.2.1 -> 1.1.2.2, and a tag T on 1.2.
    fn two_lod_fixture() -> CvsFileItems {
        let branch_sym = SymbolId(1);
        let tag_sym = SymbolId(2);

        let mut r11 = revision(1, "1.1", TRUNK, RevisionKind::Add);
        let mut r12 = revision(2, "1.2", TRUNK, RevisionKind::Change);
        let mut b = branch(3, branch_sym, TRUNK, 1);
        let mut b1 = revision(4, "1.1.2.1", branch_sym, RevisionKind::Change);
        let mut b2 = revision(5, "1.1.2.2", branch_sym, RevisionKind::Change);
        let t = tag(6, tag_sym, TRUNK, 2);

        r11.next_id = Some(ItemId(2));
        r12.prev_id = Some(ItemId(1));
        r11.branch_ids = vec![ItemId(3)];
        r11.branch_commit_ids = vec![ItemId(4)];
        b.next_id = Some(ItemId(4));
        b1.first_on_branch_id = Some(ItemId(3));
        b1.next_id = Some(ItemId(5));
        b2.prev_id = Some(ItemId(4));
        r12.tag_ids = vec![ItemId(6)];

        CvsFileItems::new(
            FileId(0x2a),
            TRUNK,
            vec![
                r11.into(),
                r12.into(),
                CvsItem::Branch(b),
                b1.into(),
                b2.into(),
                CvsItem::Tag(t),
            ],
        )
    }

    #[test]
    fn test_roots_derived_from_items() {
        let fi = two_lod_fixture();
        assert_eq!(
            fi.root_ids().iter().copied().collect::<Vec<_>>(),
            vec![ItemId(1)]
        );
        fi.check_link_consistency().unwrap();
    }

    #[test]
    fn test_remove_root_is_rejected() {
        let mut fi = two_lod_fixture();
        assert!(matches!(
            fi.remove(ItemId(1)),
            Err(CvsError::RemoveRootItem(_))
        ));
        fi.remove_root(ItemId(1));
        assert!(fi.remove(ItemId(1)).is_ok());
    }

    #[test]
    fn test_iter_lods_leaf_first() {
        let fi = two_lod_fixture();
        let lods: Vec<LodItems> = fi.iter_lods().collect();
        assert_eq!(lods.len(), 2);
        // The branch LOD is yielded before the trunk LOD it sprouts from.
        assert_eq!(lods[0].lod, SymbolId(1));
        assert_eq!(lods[0].branch_node, Some(ItemId(3)));
        assert_eq!(lods[0].revisions, vec![ItemId(4), ItemId(5)]);
        assert_eq!(lods[1].lod, TRUNK);
        assert_eq!(lods[1].branch_node, None);
        assert_eq!(lods[1].revisions, vec![ItemId(1), ItemId(2)]);
        assert_eq!(lods[1].child_branches, vec![ItemId(3)]);
        assert_eq!(lods[1].child_tags, vec![ItemId(6)]);
    }

    #[test]
    fn test_cursor_drops_branch_deleted_during_walk() {
        let mut fi = two_lod_fixture();
        let mut cursor = fi.lod_cursor();

        let inner = cursor.next_lod(&fi).unwrap();
        assert_eq!(inner.lod, SymbolId(1));
        // Simulate a pass deleting the whole branch it was just handed.
        for rev_id in &inner.revisions {
            fi.remove(*rev_id).unwrap();
        }
        let branch_id = inner.branch_node.unwrap();
        fi.revision_mut(ItemId(1))
            .unwrap()
            .branch_ids
            .retain(|&id| id != branch_id);
        fi.revision_mut(ItemId(1))
            .unwrap()
            .branch_commit_ids
            .clear();
        fi.remove(branch_id).unwrap();

        let outer = cursor.next_lod(&fi).unwrap();
        assert_eq!(outer.lod, TRUNK);
        assert!(outer.child_branches.is_empty());
        assert!(cursor.next_lod(&fi).is_none());
        fi.check_link_consistency().unwrap();
    }

    #[test]
    fn test_get_lod_items_is_non_recursive() {
        let fi = two_lod_fixture();
        let b = fi.branch(ItemId(3)).unwrap();
        let lod_items = fi.get_lod_items(b).unwrap();
        assert_eq!(lod_items.revisions, vec![ItemId(4), ItemId(5)]);
        assert!(lod_items.child_branches.is_empty());
        assert!(lod_items.child_tags.is_empty());
    }

    #[test]
    fn test_serde_round_trip_rederives_roots() {
        let fi = two_lod_fixture();
        let json = serde_json::to_string(&fi).unwrap();
        let back: CvsFileItems = serde_json::from_str(&json).unwrap();
        assert_eq!(back.file_id(), fi.file_id());
        assert_eq!(back.trunk_id(), fi.trunk_id());
        assert_eq!(back.len(), fi.len());
        assert_eq!(back.root_ids(), fi.root_ids());
        back.check_link_consistency().unwrap();
    }

    #[test]
    fn test_consistency_catches_dangling_edge() {
        let mut fi = two_lod_fixture();
        fi.revision_mut(ItemId(2)).unwrap().tag_ids.push(ItemId(99));
        assert!(matches!(
            fi.check_link_consistency(),
            Err(CvsError::BrokenLink(_, _))
        ));
    }

    #[test]
    fn test_ultimate_source_follows_branch_chain() {
        let mut fi = two_lod_fixture();
        // Tag grafted onto the branch node: source chain tag -> branch -> 1.1.
        let grafted = tag(7, SymbolId(5), SymbolId(1), 3);
        fi.branch_mut(ItemId(3)).unwrap().tag_ids.push(ItemId(7));
        fi.add(CvsItem::Tag(grafted));
        let source = fi.ultimate_source_revision(ItemId(3)).unwrap();
        assert_eq!(source.id, ItemId(1));
    }
}
