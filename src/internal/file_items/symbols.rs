//! Symbol node maintenance: forcing nodes to match their project-wide
//! symbol type, refining noop-ness from the ultimate source revision, and
//! regrafting symbols onto their preferred parents.

use crate::errors::CvsError;
use crate::internal::file_items::CvsFileItems;
use crate::internal::item::{CvsBranch, CvsItem, CvsTag, ItemId, SymbolId};
use crate::internal::symbol::{Symbol, SymbolDb};

impl CvsFileItems {
    /// Replace symbol nodes whose kind disagrees with the project-wide
    /// decision for their symbol: a branch node whose symbol became a tag
    /// turns into a tag node (it must have no commits), a tag node whose
    /// symbol became a branch turns into an empty branch node. Ids are
    /// preserved.
    pub fn mutate_symbols(&mut self, symbol_db: &dyn SymbolDb) -> Result<(), CvsError> {
        for id in self.item_ids() {
            let Some(item) = self.get(id) else {
                continue;
            };
            match item {
                // Revisions are affected only indirectly via their sprout
                // lists.
                CvsItem::Revision(_) => {}
                CvsItem::Branch(branch) => {
                    let symbol = lookup(symbol_db, branch.symbol_id)?;
                    if !symbol.is_tag() {
                        continue;
                    }
                    if branch.next_id.is_some() {
                        return Err(CvsError::BranchHasCommits(
                            symbol.name().unwrap_or("").to_string(),
                        ));
                    }
                    let branch = branch.clone();
                    self.add(CvsItem::Tag(CvsTag {
                        id,
                        symbol_id: branch.symbol_id,
                        source_lod: branch.source_lod,
                        source_id: branch.source_id,
                        noop: false,
                    }));
                    let source = self.item_mut(branch.source_id)?;
                    if let Some(ids) = source.branch_ids_mut() {
                        ids.retain(|&sprout| sprout != id);
                    }
                    if let Some(ids) = source.tag_ids_mut() {
                        ids.push(id);
                    }
                }
                CvsItem::Tag(tag) => {
                    let symbol = lookup(symbol_db, tag.symbol_id)?;
                    if !symbol.is_branch() {
                        continue;
                    }
                    let tag = tag.clone();
                    self.add(CvsItem::Branch(CvsBranch {
                        id,
                        symbol_id: tag.symbol_id,
                        branch_number: None,
                        source_lod: tag.source_lod,
                        source_id: tag.source_id,
                        next_id: None,
                        tag_ids: Vec::new(),
                        branch_ids: Vec::new(),
                        noop: false,
                    }));
                    let source = self.item_mut(tag.source_id)?;
                    if let Some(ids) = source.tag_ids_mut() {
                        ids.retain(|&sprout| sprout != id);
                    }
                    if let Some(ids) = source.branch_ids_mut() {
                        ids.push(id);
                    }
                }
            }
        }
        Ok(())
    }

    /// Retag every symbol node as noop or not, depending on whether its
    /// ultimate source revision carries real content.
    pub fn refine_symbols(&mut self) -> Result<(), CvsError> {
        for id in self.item_ids() {
            let source_id = match self.get(id) {
                Some(CvsItem::Branch(branch)) => branch.source_id,
                Some(CvsItem::Tag(tag)) => tag.source_id,
                _ => continue,
            };
            let noop = !self
                .ultimate_source_revision(source_id)?
                .kind
                .is_modification();
            match self.item_mut(id)? {
                CvsItem::Branch(branch) => branch.noop = noop,
                CvsItem::Tag(tag) => tag.noop = noop,
                CvsItem::Revision(_) => {}
            }
        }
        Ok(())
    }

    /// Regraft tags and branches onto their preferred parent branches,
    /// LOD by LOD in leaf-to-trunk order.
    pub fn adjust_parents(&mut self, symbol_db: &dyn SymbolDb) -> Result<(), CvsError> {
        let mut cursor = self.lod_cursor();
        while let Some(lod_items) = cursor.next_lod(self) {
            for &tag_id in &lod_items.child_tags {
                self.adjust_tag_parent(tag_id, symbol_db)?;
            }
            for &branch_id in &lod_items.child_branches {
                self.adjust_branch_parent(branch_id, symbol_db)?;
            }
        }
        Ok(())
    }

    fn adjust_tag_parent(
        &mut self,
        tag_id: ItemId,
        symbol_db: &dyn SymbolDb,
    ) -> Result<(), CvsError> {
        let tag = self.tag(tag_id)?;
        let symbol = lookup(symbol_db, tag.symbol_id)?;
        let Some(preferred_id) = symbol.preferred_parent_id() else {
            return Ok(());
        };
        if tag.source_lod == preferred_id {
            return Ok(());
        }
        let preferred = lookup(symbol_db, preferred_id)?;
        // Grafting onto trunk is not possible.
        if preferred.is_trunk() {
            return Ok(());
        }
        let source_id = tag.source_id;
        let source = self.revision(source_id)?;

        let mut parent_id = None;
        for &candidate_id in &source.branch_ids {
            if self.branch(candidate_id)?.symbol_id == preferred_id {
                parent_id = Some(candidate_id);
                break;
            }
        }
        // The preferred parent does not sprout here; leave the tag alone.
        let Some(parent_id) = parent_id else {
            return Ok(());
        };
        tracing::debug!(tag = %tag_id, parent = %parent_id, "grafting tag onto preferred parent");

        self.revision_mut(source_id)?
            .tag_ids
            .retain(|&id| id != tag_id);
        let parent = self.branch_mut(parent_id)?;
        parent.tag_ids.push(tag_id);
        let parent_lod = parent.symbol_id;
        let tag = self.tag_mut(tag_id)?;
        tag.source_lod = parent_lod;
        tag.source_id = parent_id;
        Ok(())
    }

    fn adjust_branch_parent(
        &mut self,
        branch_id: ItemId,
        symbol_db: &dyn SymbolDb,
    ) -> Result<(), CvsError> {
        let branch = self.branch(branch_id)?;
        let branch_symbol_id = branch.symbol_id;
        let symbol = lookup(symbol_db, branch_symbol_id)?;
        let Some(preferred_id) = symbol.preferred_parent_id() else {
            return Ok(());
        };
        if branch.source_lod == preferred_id {
            return Ok(());
        }
        let preferred = lookup(symbol_db, preferred_id)?;
        if preferred.is_trunk() {
            return Ok(());
        }
        let source_id = branch.source_id;
        let source = self.revision(source_id)?;

        // Only branches listed before this one are eligible parents; the
        // search must hit either the preferred parent or the branch itself.
        let mut parent_id = None;
        let mut reached_self = false;
        for &candidate_id in &source.branch_ids {
            let candidate_symbol = self.branch(candidate_id)?.symbol_id;
            if candidate_symbol == preferred_id {
                parent_id = Some(candidate_id);
                break;
            }
            if candidate_symbol == branch_symbol_id {
                reached_self = true;
                break;
            }
        }
        let Some(parent_id) = parent_id else {
            if reached_self {
                return Ok(());
            }
            return Err(CvsError::ParentSearchExhausted(
                symbol.name().unwrap_or("").to_string(),
            ));
        };
        tracing::debug!(branch = %branch_id, parent = %parent_id, "grafting branch onto preferred parent");

        self.revision_mut(source_id)?
            .branch_ids
            .retain(|&id| id != branch_id);
        let parent = self.branch_mut(parent_id)?;
        parent.branch_ids.push(branch_id);
        let parent_lod = parent.symbol_id;
        let branch = self.branch_mut(branch_id)?;
        branch.source_lod = parent_lod;
        branch.source_id = parent_id;
        Ok(())
    }
}

fn lookup<'db>(symbol_db: &'db dyn SymbolDb, id: SymbolId) -> Result<&'db Symbol, CvsError> {
    symbol_db
        .get(id)
        .ok_or_else(|| CvsError::SymbolNotFound(id.to_string()))
}
