//! Vendor-branch (non-trunk default branch) normalization.
//!
//! CVS `import` creates a `1.1` revision, an identical `1.1.1.1` revision
//! on the vendor branch `1.1.1`, and leaves the vendor branch as the
//! file's default branch. Revisions on the default branch act as if they
//! were on trunk; this module marks them, removes the spurious `1.1`, and
//! can later graft the surviving vendor revisions back onto trunk once
//! their branch is excluded from the conversion.

use crate::errors::CvsError;
use crate::internal::file_items::{CvsFileItems, LodItems};
use crate::internal::item::{CvsItem, ItemId, RevisionKind};

impl CvsFileItems {
    /// Normalize the non-trunk default branch revisions of this file.
    ///
    /// `ntdbr_ids` lists the revisions on the default branch in order.
    /// When `file_imported` is set and the first of them is the `1.1.1.1`
    /// copy of `1.1` that `cvs import` generates, the `1.1` revision and
    /// the vendor branch node are removed and `1.1.1.1` takes over as a
    /// root. Every listed revision is flagged as a default-branch
    /// revision, and if trunk `1.2` exists the cross-LOD dependency edge
    /// from the last default-branch revision to `1.2` is installed.
    pub fn adjust_ntdbrs(
        &mut self,
        file_imported: bool,
        ntdbr_ids: &[ItemId],
        rev_1_2_id: Option<ItemId>,
    ) -> Result<(), CvsError> {
        let (Some(&first_id), Some(&last_id)) = (ntdbr_ids.first(), ntdbr_ids.last()) else {
            return Ok(());
        };

        if file_imported {
            self.imported_remove_1_1(first_id)?;
        }

        for &id in ntdbr_ids {
            self.revision_mut(id)?.default_branch_revision = true;
        }

        if let Some(rev_1_2_id) = rev_1_2_id {
            let last_is_modification = self.revision(last_id)?.kind.is_modification();
            let rev_1_2 = self.revision_mut(rev_1_2_id)?;
            rev_1_2.default_branch_prev_id = Some(last_id);
            rev_1_2.kind =
                RevisionKind::derive(rev_1_2.kind.is_modification(), last_is_modification);
            self.revision_mut(last_id)?.default_branch_next_id = Some(rev_1_2_id);
        }
        Ok(())
    }

    /// The file was imported: remove the `1.1` revision if `1.1.1.1` is
    /// its verbatim copy (a modification without deltatext), promoting
    /// `1.1.1.1` to a root and transferring `1.1`'s sprouts onto it.
    fn imported_remove_1_1(&mut self, first_ntdbr_id: ItemId) -> Result<(), CvsError> {
        let first = self.revision(first_ntdbr_id)?;
        if first.rev != "1.1.1.1" || !first.kind.is_modification() || first.deltatext_exists {
            return Ok(());
        }
        let Some(vendor_branch_id) = first.first_on_branch_id else {
            return Ok(());
        };
        let source_id = self.branch(vendor_branch_id)?.source_id;
        let rev_1_1 = match self.get(source_id).and_then(CvsItem::as_revision) {
            Some(rev) if rev.rev == "1.1" => rev.clone(),
            _ => return Ok(()),
        };
        tracing::debug!("removing unnecessary revision {rev_1_1}");

        self.remove_root(rev_1_1.id);
        self.remove(rev_1_1.id)?;

        // Its linear successor (1.2, if present) becomes a root.
        if let Some(next_id) = rev_1_1.next_id {
            self.revision_mut(next_id)?.prev_id = None;
            self.add_root(next_id);
        }

        // The vendor branch node is sourced from the deleted 1.1; remove
        // it and detach 1.1.1.1 from the branch-node protocol.
        self.remove(vendor_branch_id)?;
        let first = self.revision_mut(first_ntdbr_id)?;
        first.first_on_branch_id = None;
        let vendor_lod = first.lod;
        self.add_root(first_ntdbr_id);

        // Transfer 1.1's sprouts onto 1.1.1.1.
        for &tag_id in &rev_1_1.tag_ids {
            let tag = self.tag_mut(tag_id)?;
            tag.source_id = first_ntdbr_id;
            tag.source_lod = vendor_lod;
        }
        let mut moved_branch_ids = Vec::new();
        for &branch_id in &rev_1_1.branch_ids {
            if branch_id == vendor_branch_id {
                continue;
            }
            let branch = self.branch_mut(branch_id)?;
            branch.source_id = first_ntdbr_id;
            branch.source_lod = vendor_lod;
            moved_branch_ids.push(branch_id);
        }
        let mut moved_commit_ids = Vec::new();
        for &commit_id in &rev_1_1.branch_commit_ids {
            if commit_id == first_ntdbr_id {
                continue;
            }
            let commit = self.revision_mut(commit_id)?;
            if commit.prev_id == Some(rev_1_1.id) {
                commit.prev_id = Some(first_ntdbr_id);
            }
            moved_commit_ids.push(commit_id);
        }

        let first = self.revision_mut(first_ntdbr_id)?;
        first.tag_ids.extend(rev_1_1.tag_ids.iter().copied());
        first.branch_ids.extend(moved_branch_ids);
        first.branch_commit_ids.extend(moved_commit_ids);

        // 1.1.1.1 is now the initial revision of the file.
        first.kind = RevisionKind::derive(first.kind.is_modification(), false);
        Ok(())
    }

    /// Graft the surviving non-trunk default branch revisions onto trunk.
    ///
    /// At most one LOD can consist purely of default-branch revisions.
    /// Its branch node (if the LOD still has one) is severed, the
    /// revisions are reassigned to trunk, symbols sprouting from them
    /// follow, and the cross-LOD dependency edge to `1.2` is welded into a
    /// normal `next`/`prev` edge.
    pub fn graft_ntdbr_to_trunk(&mut self) -> Result<(), CvsError> {
        let mut cursor = self.lod_cursor();
        let ntdb_lod = loop {
            let Some(lod_items) = cursor.next_lod(self) else {
                return Ok(());
            };
            let Some(&first_id) = lod_items.revisions.first() else {
                continue;
            };
            if self.revision(first_id)?.default_branch_revision {
                break lod_items;
            }
        };
        for &rev_id in &ntdb_lod.revisions {
            let rev = self.revision(rev_id)?;
            if !rev.default_branch_revision {
                return Err(CvsError::BrokenLink(
                    rev.to_string(),
                    "non-default-branch revision amid the default branch".to_string(),
                ));
            }
        }
        tracing::debug!(
            lod = %ntdb_lod.lod,
            revisions = ntdb_lod.revisions.len(),
            "grafting default branch revisions to trunk"
        );

        if let Some(branch_id) = ntdb_lod.branch_node {
            self.sever_branch(&ntdb_lod, branch_id)?;
        }

        let trunk = self.trunk_id();
        for &rev_id in &ntdb_lod.revisions {
            let rev = self.revision_mut(rev_id)?;
            rev.default_branch_revision = false;
            rev.lod = trunk;
        }
        for &branch_id in &ntdb_lod.child_branches {
            self.branch_mut(branch_id)?.source_lod = trunk;
        }
        for &tag_id in &ntdb_lod.child_tags {
            self.tag_mut(tag_id)?.source_lod = trunk;
        }

        if let Some(&last_id) = ntdb_lod.revisions.last() {
            let last = self.revision_mut(last_id)?;
            if let Some(rev_1_2_id) = last.default_branch_next_id.take() {
                last.next_id = Some(rev_1_2_id);
                let rev_1_2 = self.revision_mut(rev_1_2_id)?;
                rev_1_2.default_branch_prev_id = None;
                rev_1_2.prev_id = Some(last_id);
                self.remove_root(rev_1_2_id);
            }
        }
        Ok(())
    }

    /// Sever a branch from its source: the branch node is deleted and the
    /// first revision on the branch (if any) becomes a root, or is spliced
    /// directly after the source revision when the source's own successor
    /// is the revision the severed chain leads to.
    fn sever_branch(&mut self, lod_items: &LodItems, branch_id: ItemId) -> Result<(), CvsError> {
        let source_id = self.branch(branch_id)?.source_id;

        if let Some(ids) = self.item_mut(source_id)?.branch_ids_mut() {
            ids.retain(|&id| id != branch_id);
        }
        let first_id = lod_items.revisions.first().copied();
        if let Some(first_id) = first_id
            && let Some(CvsItem::Revision(source)) = self.get_mut(source_id)
        {
            source.branch_commit_ids.retain(|&id| id != first_id);
        }
        self.remove(branch_id)?;

        let Some(first_id) = first_id else {
            return Ok(());
        };
        // A trunk source whose linear successor is the revision the severed
        // chain depends into gets the chain spliced in between; otherwise
        // the first revision becomes a root.
        let last_id = *lod_items.revisions.last().unwrap_or(&first_id);
        let dependent = self.revision(last_id)?.default_branch_next_id;
        let splice = match self.get(source_id).and_then(CvsItem::as_revision) {
            Some(source) => dependent.is_some() && source.next_id == dependent,
            None => false,
        };

        let first = self.revision_mut(first_id)?;
        first.first_on_branch_id = None;
        if splice {
            first.prev_id = Some(source_id);
            let source = self.revision_mut(source_id)?;
            source.next_id = Some(first_id);
            // The dependent revision's prev edge is rewritten by the
            // caller when the cross edge is welded.
        } else {
            first.prev_id = None;
            self.add_root(first_id);
        }
        Ok(())
    }
}
