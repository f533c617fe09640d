//! The symbol openings/closings logger.
//!
//! As revisions are replayed into the target repository in chronological
//! order, each symbol attached to a revision gets an *opening* record (the
//! earliest target revision the symbol could copy this file from) and
//! later a *closing* record (the first target revision at which that
//! source is stale). The downstream symbol filler picks a copy source
//! from the half-open interval `[opening, closing)`.
//!
//! A closing's target revision number is usually unknown while its
//! revision is being logged, so closings are parked in a temp file and
//! resolved at finalization against the persistence manager. Likewise,
//! tags that should be filled from a sibling branch (per the pairings
//! database) park a *branchings* record until the branch's own fill
//! revisions are known.
//!
//! Record format, byte-exact and stable:
//! `"{name} {svnrevnum:08} {O|C} {branch_name_or_*} {file_id:x}\n"`.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};

use ahash::AHashMap;

use crate::config::SymbolingsConfig;
use crate::errors::CvsError;
use crate::internal::db::PersistenceManager;
use crate::internal::file_items::CvsFileItems;
use crate::internal::item::{CvsItem, FileId, ItemId, SymbolId};
use crate::internal::record::pairings::PairingsDatabase;
use crate::internal::symbol::SymbolDb;

pub const OPENING: char = 'O';
pub const CLOSING: char = 'C';

/// Streaming sink for symbol opening/closing records.
pub struct OpeningsClosingsLogger {
    config: SymbolingsConfig,
    pairings: PairingsDatabase,
    symbolings: BufWriter<File>,
    closings: BufWriter<File>,
    branchings: BufWriter<File>,
    /// Candidate default-branch openings per file, closed out when the
    /// file's next trunk revision is logged.
    default_branch_notes: AHashMap<FileId, Vec<String>>,
}

impl OpeningsClosingsLogger {
    pub fn new(config: SymbolingsConfig, pairings: PairingsDatabase) -> Result<Self, CvsError> {
        fs::create_dir_all(&config.output_dir)?;
        let symbolings = BufWriter::new(File::create(config.symbolings_path())?);
        let closings = BufWriter::new(File::create(config.closings_tmp_path())?);
        let branchings = BufWriter::new(File::create(config.branchings_tmp_path())?);
        Ok(Self {
            config,
            pairings,
            symbolings,
            closings,
            branchings,
            default_branch_notes: AHashMap::new(),
        })
    }

    /// Log the openings and closings arising from one revision as it is
    /// assigned `svn_revnum`. `done_symbols` names symbols whose fills are
    /// already complete and that need no further closings.
    pub fn log_revision(
        &mut self,
        file_items: &CvsFileItems,
        rev_id: ItemId,
        svn_revnum: u32,
        done_symbols: &HashSet<String>,
        symbol_db: &dyn SymbolDb,
    ) -> Result<(), CvsError> {
        let rev = file_items.revision(rev_id)?;
        let file_id = file_items.file_id();
        let lod_marker = self.lod_marker(file_items, symbol_db, rev.lod)?;

        let names = sprout_names(file_items, symbol_db, rev.tag_ids.iter().chain(&rev.branch_ids))?;
        let branch_names = sprout_names(file_items, symbol_db, rev.branch_ids.iter())?;

        if rev.default_branch_revision {
            // These symbols may also need to be fillable from trunk; note
            // them until the file's next trunk revision closes them out.
            let notes = self.default_branch_notes.entry(file_id).or_default();
            for name in &names {
                if !notes.contains(name) {
                    notes.push(name.clone());
                }
            }
        } else if file_items.is_trunk(rev.lod)
            && let Some(notes) = self.default_branch_notes.remove(&file_id)
        {
            for name in notes {
                self.write_symboling(&name, svn_revnum, CLOSING, "*", file_id)?;
            }
        }

        if !rev.kind.is_delete() {
            for name in &names {
                self.write_symboling(name, svn_revnum, OPENING, &lod_marker, file_id)?;
                if !branch_names.is_empty()
                    && let Some(best_branch) = self.pairings.best_branch(name)
                    && branch_names.iter().any(|branch| branch == best_branch)
                {
                    writeln!(
                        self.branchings,
                        "{:x} {} {} {}",
                        file_id.0, svn_revnum, name, best_branch
                    )?;
                }
                if let Some(next_id) = rev.next_id {
                    writeln!(
                        self.closings,
                        "{} {} {} {:x}",
                        name, next_id, lod_marker, file_id.0
                    )?;
                }
            }
        }

        // The first commit on a branch makes the branch's source revision
        // a stale copy source for the symbols that are filled from this
        // branch.
        if let Some(branch_node_id) = rev.first_on_branch_id {
            let source_id = file_items.branch(branch_node_id)?.source_id;
            let source = file_items.item(source_id)?;
            let source_names = sprout_names(
                file_items,
                symbol_db,
                source
                    .tag_ids()
                    .into_iter()
                    .flatten()
                    .chain(source.branch_ids().into_iter().flatten()),
            )?;
            let source_marker = self.lod_marker(file_items, symbol_db, source_lod_of(source))?;
            for name in source_names {
                if done_symbols.contains(&name) {
                    continue;
                }
                if self.pairings.best_branch(&name) == Some(lod_marker.as_str()) {
                    self.write_symboling(&name, svn_revnum, CLOSING, &source_marker, file_id)?;
                }
            }
        }
        Ok(())
    }

    /// Resolve the parked closings and branchings records against the
    /// persistence manager and append the results to the symbolings file.
    pub fn close(mut self, persistence: &dyn PersistenceManager) -> Result<(), CvsError> {
        self.closings.flush()?;
        self.branchings.flush()?;

        for line in fs::read_to_string(self.config.closings_tmp_path())?.lines() {
            let mut fields = line.split(' ');
            let (Some(name), Some(rev_id), Some(branch), Some(file_id), None) = (
                fields.next(),
                fields.next(),
                fields.next(),
                fields.next(),
                fields.next(),
            ) else {
                return Err(CvsError::InvalidRecordLine("closings", line.to_string()));
            };
            let rev_id: u32 = rev_id
                .parse()
                .map_err(|_| CvsError::InvalidRecordLine("closings", line.to_string()))?;
            let file_id = FileId(
                u32::from_str_radix(file_id, 16)
                    .map_err(|_| CvsError::InvalidRecordLine("closings", line.to_string()))?,
            );
            let Some(svn_revnum) = persistence.svn_revnum(ItemId(rev_id)) else {
                continue;
            };
            if persistence
                .last_filled(name)
                .is_some_and(|last| svn_revnum >= last)
            {
                continue;
            }
            self.write_symboling(name, svn_revnum, CLOSING, branch, file_id)?;
        }

        for line in fs::read_to_string(self.config.branchings_tmp_path())?.lines() {
            let mut fields = line.split(' ');
            let (Some(file_id), Some(svn_revnum), Some(name), Some(best_branch), None) = (
                fields.next(),
                fields.next(),
                fields.next(),
                fields.next(),
                fields.next(),
            ) else {
                return Err(CvsError::InvalidRecordLine("branchings", line.to_string()));
            };
            let file_id = FileId(
                u32::from_str_radix(file_id, 16)
                    .map_err(|_| CvsError::InvalidRecordLine("branchings", line.to_string()))?,
            );
            let svn_revnum: u32 = svn_revnum
                .parse()
                .map_err(|_| CvsError::InvalidRecordLine("branchings", line.to_string()))?;
            let Some(last_filled) = persistence.last_filled(name) else {
                continue;
            };
            let Some(branch_revnum) = persistence.first_fill_after(best_branch, svn_revnum) else {
                continue;
            };
            if branch_revnum >= last_filled {
                continue;
            }
            self.write_symboling(name, branch_revnum, OPENING, best_branch, file_id)?;
        }

        self.symbolings.flush()?;
        Ok(())
    }

    fn write_symboling(
        &mut self,
        name: &str,
        svn_revnum: u32,
        kind: char,
        branch: &str,
        file_id: FileId,
    ) -> Result<(), CvsError> {
        writeln!(
            self.symbolings,
            "{} {:08} {} {} {:x}",
            name, svn_revnum, kind, branch, file_id.0
        )?;
        Ok(())
    }

    /// `"*"` for trunk, the symbol's name otherwise.
    fn lod_marker(
        &self,
        file_items: &CvsFileItems,
        symbol_db: &dyn SymbolDb,
        lod: SymbolId,
    ) -> Result<String, CvsError> {
        if file_items.is_trunk(lod) {
            return Ok("*".to_string());
        }
        symbol_db
            .get(lod)
            .and_then(|symbol| symbol.name())
            .map(str::to_string)
            .ok_or_else(|| CvsError::SymbolNotFound(lod.to_string()))
    }
}

/// The LOD a symbol sprouting from `item` belongs to: the revision's own
/// LOD, or the branch's symbol for sprouts carried on a branch node.
fn source_lod_of(item: &CvsItem) -> SymbolId {
    match item {
        CvsItem::Revision(rev) => rev.lod,
        CvsItem::Branch(branch) => branch.symbol_id,
        CvsItem::Tag(tag) => tag.source_lod,
    }
}

/// Resolve sprout item ids to their symbol names.
fn sprout_names<'ids>(
    file_items: &CvsFileItems,
    symbol_db: &dyn SymbolDb,
    ids: impl Iterator<Item = &'ids ItemId>,
) -> Result<Vec<String>, CvsError> {
    let mut names = Vec::new();
    for &id in ids {
        let symbol_id = file_items
            .item(id)?
            .symbol_id()
            .ok_or_else(|| CvsError::UnexpectedItemKind(id.to_string(), "symbol node"))?;
        let name = symbol_db
            .get(symbol_id)
            .and_then(|symbol| symbol.name())
            .ok_or_else(|| CvsError::SymbolNotFound(symbol_id.to_string()))?;
        names.push(name.to_string());
    }
    Ok(names)
}
