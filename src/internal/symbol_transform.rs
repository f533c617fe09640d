//! User-configurable renaming and dropping of symbol names before they
//! enter the symbol store.
//!
//! Transforms run in sequence over each `(name, revision)` pair read from
//! a source file; the first transform that drops a name wins, otherwise
//! each transform sees the previous one's output.

use regex::Regex;

use crate::errors::CvsError;

use ahash::AHashMap;

/// One rule applied to symbol names as they are read from a source file.
pub trait SymbolTransform {
    /// Transform `name` (attached to revision string `revision`).
    ///
    /// Returns the name to use instead (possibly unchanged), or `None` to
    /// drop the symbol entirely.
    fn transform(&self, name: &str, revision: &str) -> Option<String>;
}

/// Rewrite names that fully match a pattern via a replacement template.
pub struct RegexpSymbolTransform {
    pattern: Regex,
    replacement: String,
}

impl RegexpSymbolTransform {
    pub fn new(pattern: &str, replacement: &str) -> Result<Self, CvsError> {
        let pattern = Regex::new(&format!("^(?:{pattern})$"))
            .map_err(|err| CvsError::InvalidTransformPattern(err.to_string()))?;
        Ok(Self {
            pattern,
            replacement: replacement.to_string(),
        })
    }
}

impl SymbolTransform for RegexpSymbolTransform {
    fn transform(&self, name: &str, _revision: &str) -> Option<String> {
        if self.pattern.is_match(name) {
            Some(self.pattern.replace(name, &self.replacement).into_owned())
        } else {
            Some(name.to_string())
        }
    }
}

/// Drop every name that fully matches a pattern.
pub struct IgnoreSymbolTransform {
    pattern: Regex,
}

impl IgnoreSymbolTransform {
    pub fn new(pattern: &str) -> Result<Self, CvsError> {
        let pattern = Regex::new(&format!("^(?:{pattern})$"))
            .map_err(|err| CvsError::InvalidTransformPattern(err.to_string()))?;
        Ok(Self { pattern })
    }
}

impl SymbolTransform for IgnoreSymbolTransform {
    fn transform(&self, name: &str, _revision: &str) -> Option<String> {
        if self.pattern.is_match(name) {
            None
        } else {
            Some(name.to_string())
        }
    }
}

/// Explicit name -> name table supplied by the user.
///
/// Mapping a name to the empty string drops the symbol.
#[derive(Default)]
pub struct SymbolMapper {
    map: AHashMap<String, String>,
}

impl SymbolMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one mapping. Overwriting an existing entry is allowed but
    /// suspicious, so it is reported and the new value wins.
    pub fn add(&mut self, name: &str, replacement: &str) {
        if let Some(old) = self
            .map
            .insert(name.to_string(), replacement.to_string())
            && old != replacement
        {
            tracing::warn!(
                "overwriting symbol mapping for `{name}`: `{old}` -> `{replacement}`"
            );
        }
    }
}

impl SymbolTransform for SymbolMapper {
    fn transform(&self, name: &str, _revision: &str) -> Option<String> {
        match self.map.get(name) {
            Some(replacement) if replacement.is_empty() => None,
            Some(replacement) => Some(replacement.clone()),
            None => Some(name.to_string()),
        }
    }
}

/// Run `name` through every transform in order.
pub fn apply_transforms(
    transforms: &[Box<dyn SymbolTransform>],
    name: &str,
    revision: &str,
) -> Option<String> {
    let mut name = name.to_string();
    for transform in transforms {
        name = transform.transform(&name, revision)?;
    }
    Some(name)
}
