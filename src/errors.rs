//! Error types for the cvs-internal crate.
//!
//! This module defines a unified error enumeration used across the item
//! graph, the rewrite passes, and the symbol interval recorder. It
//! integrates with `thiserror` to provide rich `Display` implementations
//! and error source chaining where applicable.
//!
//! Notes:
//! - Each variant carries contextual details via its message payload.
//! - Dangling ids, unexpected item kinds, and exhausted searches are
//!   invariant violations that abort the per-file job; the caller decides
//!   whether to abort the whole conversion.

use thiserror::Error;

#[derive(Error, Debug)]
/// Unified error enumeration for the cvs-internal library.
///
/// - Used across the item container, rewrite passes, pairings files and
///   the openings/closings recorder.
/// - Implements `std::error::Error` via `thiserror`.
pub enum CvsError {
    /// An edge referenced an item id that does not resolve in the container.
    #[error("item id `{0}` does not resolve in this file")]
    DanglingItemId(String),

    /// An item had a different kind than the operation requires.
    #[error("item `{0}` is not a {1}")]
    UnexpectedItemKind(String, &'static str),

    /// `remove` was called on an item still registered as a root.
    #[error("cannot remove item `{0}` while it is a member of the root set")]
    RemoveRootItem(String),

    /// A branch that carries commits was asked to become a tag.
    #[error("branch `{0}` has commits and cannot be changed into a tag")]
    BranchHasCommits(String),

    /// The preferred-parent search ran past the end of the sprout list.
    #[error("preferred-parent search for `{0}` did not terminate as expected")]
    ParentSearchExhausted(String),

    /// A structural invariant does not hold; names the offending node.
    #[error("broken link at {0}: {1}")]
    BrokenLink(String, String),

    /// A symbol id was not known to the symbol store.
    #[error("symbol id `{0}` is not in the symbol database")]
    SymbolNotFound(String),

    /// A metadata id was not known to the metadata store.
    #[error("metadata id `{0}` is not in the metadata database")]
    MetadataNotFound(String),

    /// A file id was not known to the file store.
    #[error("file id `{0}` is not in the file database")]
    FileNotFound(String),

    /// A line in the pairings list file could not be parsed.
    #[error("malformed pairings line: `{0}`")]
    InvalidPairingsLine(String),

    /// A line in a recorder temp file could not be parsed back.
    #[error("malformed {0} record: `{1}`")]
    InvalidRecordLine(&'static str, String),

    /// An invalid regular expression was supplied for a symbol transform.
    #[error("invalid symbol transform pattern: {0}")]
    InvalidTransformPattern(String),

    /// I/O error from an underlying reader or writer.
    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
}
