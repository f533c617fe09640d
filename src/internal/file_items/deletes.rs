//! Removal of dead revisions that CVS fabricates when a file is first
//! added on a branch.
//!
//! Adding a file on a branch makes CVS commit a dead `1.1` revision on
//! trunk (and, on every other branch the file is later added to, a dead
//! first branch revision) with a generated log message. Neither revision
//! carries information the converted history needs, so both are dropped
//! when the generated message is recognized.
//!
//! The message check interpolates the file's current basename; files that
//! were renamed after the generated message was written are not
//! recognized.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::CvsError;
use crate::internal::db::{CvsFileDb, MetadataDb};
use crate::internal::file_items::CvsFileItems;
use crate::internal::item::CvsItem;

static INITIAL_ADD_TAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\n]+\.\n$").expect("static regex"));

static BRANCH_ADD_TAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\n]* on \d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}( [+-]\d{4})?\n$")
        .expect("static regex")
});

/// `file {basename} was initially added on branch {branch}.\n`
fn is_initial_branch_add_message(log_msg: &str, basename: &str) -> bool {
    log_msg
        .strip_prefix(&format!("file {basename} was initially added on branch "))
        .is_some_and(|rest| INITIAL_ADD_TAIL_RE.is_match(rest))
}

/// `file {basename} was added on branch {branch} on {date}\n`
fn is_branch_add_message(log_msg: &str, basename: &str) -> bool {
    log_msg
        .strip_prefix(&format!("file {basename} was added on branch "))
        .is_some_and(|rest| BRANCH_ADD_TAIL_RE.is_match(rest))
}

impl CvsFileItems {
    /// Remove the dead trunk `1.1` revision created when the file was
    /// initially added on a branch. At most one revision is removed per
    /// file; its sprouting branches are cut loose as new roots and its
    /// tags are dropped with it.
    pub fn remove_unneeded_deletes(
        &mut self,
        file_db: &dyn CvsFileDb,
        metadata_db: &dyn MetadataDb,
    ) -> Result<(), CvsError> {
        let basename = file_db
            .get(self.file_id())
            .ok_or_else(|| CvsError::FileNotFound(self.file_id().to_string()))?
            .basename
            .clone();

        let roots: Vec<_> = self.root_ids().iter().copied().collect();
        for root_id in roots {
            let Some(CvsItem::Revision(rev)) = self.get(root_id) else {
                continue;
            };
            if !rev.kind.is_noop() || rev.rev != "1.1" || !self.is_trunk(rev.lod) {
                continue;
            }
            if rev.default_branch_revision || !rev.closed_symbol_ids.is_empty() {
                continue;
            }
            let has_branch_with_commits = rev
                .branch_ids
                .iter()
                .any(|&id| self.branch(id).is_ok_and(|b| b.next_id.is_some()));
            if !has_branch_with_commits {
                continue;
            }
            let log_msg = &metadata_db
                .get(rev.metadata_id)
                .ok_or_else(|| CvsError::MetadataNotFound(rev.metadata_id.to_string()))?
                .log_msg;
            if !is_initial_branch_add_message(log_msg, &basename) {
                continue;
            }
            tracing::debug!("removing unnecessary delete {rev}");

            let rev = rev.clone();
            self.remove_root(rev.id);
            self.remove(rev.id)?;

            if let Some(next_id) = rev.next_id {
                self.revision_mut(next_id)?.prev_id = None;
                self.add_root(next_id);
            }
            for &branch_id in &rev.branch_ids {
                let first_commit_id = self.branch(branch_id)?.next_id;
                self.remove(branch_id)?;
                if let Some(first_id) = first_commit_id {
                    let first = self.revision_mut(first_id)?;
                    first.first_on_branch_id = None;
                    self.add_root(first_id);
                }
            }
            for &tag_id in &rev.tag_ids {
                self.remove(tag_id)?;
            }
            break;
        }
        Ok(())
    }

    /// Remove the dead first revision that CVS commits on a branch when
    /// the file is added on a different branch. The branch node goes with
    /// it; the second revision (if any) is detached as a new root.
    pub fn remove_initial_branch_deletes(
        &mut self,
        file_db: &dyn CvsFileDb,
        metadata_db: &dyn MetadataDb,
    ) -> Result<(), CvsError> {
        let basename = file_db
            .get(self.file_id())
            .ok_or_else(|| CvsError::FileNotFound(self.file_id().to_string()))?
            .basename
            .clone();

        let mut cursor = self.lod_cursor();
        while let Some(lod_items) = cursor.next_lod(self) {
            let Some(branch_id) = lod_items.branch_node else {
                continue;
            };
            let Some(&first_id) = lod_items.revisions.first() else {
                continue;
            };
            let first = self.revision(first_id)?;
            if !first.kind.is_delete()
                || first.default_branch_revision
                || !first.tag_ids.is_empty()
                || !first.branch_ids.is_empty()
            {
                continue;
            }
            let source_id = self.branch(branch_id)?.source_id;
            let source = self.ultimate_source_revision(source_id)?;
            if (first.timestamp - source.timestamp).num_seconds().abs() > 2 {
                continue;
            }
            let log_msg = &metadata_db
                .get(first.metadata_id)
                .ok_or_else(|| CvsError::MetadataNotFound(first.metadata_id.to_string()))?
                .log_msg;
            if !is_branch_add_message(log_msg, &basename) {
                continue;
            }
            tracing::debug!("removing unnecessary initial branch delete {first}");

            let first = first.clone();
            if let Some(ids) = self.item_mut(source_id)?.branch_ids_mut() {
                ids.retain(|&id| id != branch_id);
            }
            if let Some(CvsItem::Revision(source)) = self.get_mut(source_id) {
                source.branch_commit_ids.retain(|&id| id != first_id);
            }
            self.remove(first_id)?;
            self.remove(branch_id)?;

            if let Some(second_id) = first.next_id {
                let second = self.revision_mut(second_id)?;
                second.prev_id = None;
                self.add_root(second_id);
            }
        }
        Ok(())
    }
}
