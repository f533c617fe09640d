//! Configuration for the recorder output files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Locations of the symbol interval recorder's output files.
///
/// The symbolings file is the final artifact consumed by the downstream
/// symbol filler; the two `.tmp` files hold records whose target revision
/// numbers are only resolvable at finalization.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SymbolingsConfig {
    pub output_dir: PathBuf,
    pub symbolings_file: String,
    pub closings_tmp_file: String,
    pub branchings_tmp_file: String,
    pub pairings_file: String,
}

impl Default for SymbolingsConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            symbolings_file: "symbolic-names.txt".to_string(),
            closings_tmp_file: "symbolic-names-closings.tmp".to_string(),
            branchings_tmp_file: "symbolic-names-branchings.tmp".to_string(),
            pairings_file: "pairings-list.txt".to_string(),
        }
    }
}

impl SymbolingsConfig {
    /// Convenience constructor placing every file under `output_dir`.
    pub fn in_dir(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    pub fn symbolings_path(&self) -> PathBuf {
        self.output_dir.join(&self.symbolings_file)
    }

    pub fn closings_tmp_path(&self) -> PathBuf {
        self.output_dir.join(&self.closings_tmp_file)
    }

    pub fn branchings_tmp_path(&self) -> PathBuf {
        self.output_dir.join(&self.branchings_tmp_file)
    }

    pub fn pairings_path(&self) -> PathBuf {
        self.output_dir.join(&self.pairings_file)
    }
}
