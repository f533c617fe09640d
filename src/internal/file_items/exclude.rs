//! Exclusion of symbols and whole branch LODs from the conversion.
//!
//! Excluding a branch deletes its revisions, except that a leading run of
//! default-branch revisions is always retained: those revisions act as
//! trunk history and are grafted onto trunk once the branch itself is
//! gone. Whether a branch may be excluded at all (no surviving symbol may
//! sprout from it) was decided by the earlier symbol collation phase.

use crate::errors::CvsError;
use crate::internal::db::RevisionExcluder;
use crate::internal::file_items::{CvsFileItems, LodItems};
use crate::internal::item::{CvsItem, ItemId};
use crate::internal::symbol::SymbolDb;

impl CvsFileItems {
    /// Drop every tag and every non-trunk LOD, then graft any surviving
    /// default-branch revisions onto trunk. Afterwards only trunk history
    /// remains.
    pub fn exclude_non_trunk(&mut self) -> Result<(), CvsError> {
        let mut ntdbr_remaining = false;
        let mut cursor = self.lod_cursor();
        while let Some(lod_items) = cursor.next_lod(self) {
            for &tag_id in &lod_items.child_tags {
                self.exclude_tag(tag_id)?;
            }
            if !self.is_trunk(lod_items.lod) {
                ntdbr_remaining |= self.exclude_branch(&lod_items)?;
            }
        }
        if ntdbr_remaining {
            self.graft_ntdbr_to_trunk()?;
        }
        Ok(())
    }

    /// Drop the tags and branch LODs whose symbols the user excluded,
    /// grafting surviving default-branch revisions onto trunk. The
    /// collaborating excluder is told whether anything changed.
    pub fn filter_excluded_symbols(
        &mut self,
        symbol_db: &dyn SymbolDb,
        excluder: &mut dyn RevisionExcluder,
    ) -> Result<(), CvsError> {
        let mut changed = false;
        let mut ntdbr_remaining = false;
        let mut cursor = self.lod_cursor();
        while let Some(lod_items) = cursor.next_lod(self) {
            for &tag_id in &lod_items.child_tags {
                let symbol_id = self.tag(tag_id)?.symbol_id;
                let symbol = symbol_db
                    .get(symbol_id)
                    .ok_or_else(|| CvsError::SymbolNotFound(symbol_id.to_string()))?;
                if symbol.is_excluded() {
                    self.exclude_tag(tag_id)?;
                    changed = true;
                }
            }
            let lod_symbol = symbol_db
                .get(lod_items.lod)
                .ok_or_else(|| CvsError::SymbolNotFound(lod_items.lod.to_string()))?;
            if lod_symbol.is_excluded() {
                ntdbr_remaining |= self.exclude_branch(&lod_items)?;
                changed = true;
            }
        }
        if ntdbr_remaining {
            self.graft_ntdbr_to_trunk()?;
        }
        if changed {
            excluder.process_file(self);
        } else {
            excluder.skip_file(self.file_id());
        }
        Ok(())
    }

    /// Remove a tag node and the reference its source holds to it.
    pub(crate) fn exclude_tag(&mut self, tag_id: ItemId) -> Result<(), CvsError> {
        let source_id = self.tag(tag_id)?.source_id;
        self.remove(tag_id)?;
        if let Some(ids) = self.item_mut(source_id)?.tag_ids_mut() {
            ids.retain(|&id| id != tag_id);
        }
        Ok(())
    }

    /// Exclude the branch LOD described by `lod_items`.
    ///
    /// A leading run of default-branch revisions is retained and `true` is
    /// returned to signal that a graft is still needed; otherwise the
    /// branch node and every revision of the LOD are deleted and `false`
    /// is returned.
    pub(crate) fn exclude_branch(&mut self, lod_items: &LodItems) -> Result<bool, CvsError> {
        if let Some(&first_id) = lod_items.revisions.first()
            && self.revision(first_id)?.default_branch_revision
        {
            let mut boundary = lod_items.revisions.len();
            for (idx, &rev_id) in lod_items.revisions.iter().enumerate() {
                if !self.revision(rev_id)?.default_branch_revision {
                    boundary = idx;
                    break;
                }
            }
            if boundary < lod_items.revisions.len() {
                tracing::debug!(
                    lod = %lod_items.lod,
                    dropped = lod_items.revisions.len() - boundary,
                    "truncating excluded branch after its default-branch prefix"
                );
                let last_kept = lod_items.revisions[boundary - 1];
                self.revision_mut(last_kept)?.next_id = None;
                for &rev_id in &lod_items.revisions[boundary..] {
                    self.delete_excluded_revision(rev_id)?;
                }
            }
            return Ok(true);
        }

        tracing::debug!(lod = %lod_items.lod, "excluding branch");
        if let Some(branch_id) = lod_items.branch_node {
            let source_id = self.branch(branch_id)?.source_id;
            if let Some(ids) = self.item_mut(source_id)?.branch_ids_mut() {
                ids.retain(|&id| id != branch_id);
            }
            if let Some(&first_id) = lod_items.revisions.first()
                && let Some(CvsItem::Revision(source)) = self.get_mut(source_id)
            {
                source.branch_commit_ids.retain(|&id| id != first_id);
            }
            self.remove(branch_id)?;
        }
        if let Some(&first_id) = lod_items.revisions.first() {
            self.remove_root(first_id);
            for &rev_id in &lod_items.revisions {
                self.delete_excluded_revision(rev_id)?;
            }
        }
        Ok(false)
    }

    /// Delete one revision of an excluded LOD, keeping the default-branch
    /// cross edge consistent: a deleted revision that trunk `1.2` depended
    /// on releases `1.2` into the root set.
    fn delete_excluded_revision(&mut self, rev_id: ItemId) -> Result<(), CvsError> {
        let removed = self.remove(rev_id)?;
        let Some(rev) = removed.as_revision() else {
            return Err(CvsError::UnexpectedItemKind(removed.to_string(), "revision"));
        };
        if let Some(dependent_id) = rev.default_branch_next_id {
            let dependent = self.revision_mut(dependent_id)?;
            dependent.default_branch_prev_id = None;
            if dependent.prev_id.is_none() {
                self.add_root(dependent_id);
            }
        }
        Ok(())
    }
}
