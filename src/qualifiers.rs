//! Resource qualifiers encoded in package asset paths.
//!
//! Packaged apps ship one logo in many variants and describe each variant in
//! its folder or file name: `Assets/contrast-black/Square44x44Logo.scale-200.png`
//! or `Square44x44Logo.targetsize-32_altform-unplated.png`. A segment is a
//! `_`-separated list of `name-value` tokens.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QualifierError {
    #[error("qualifier token {0:?} has no '-' separator")]
    MissingSeparator(String),
}

/// Lower-cased `name -> value` pairs collected from one asset path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Qualifiers {
    map: HashMap<String, String>,
}

impl Qualifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses one path segment into `self`. A later duplicate name overwrites
    /// the earlier value.
    pub fn parse_segment(&mut self, segment: &str) -> Result<(), QualifierError> {
        for token in segment.split('_') {
            let (name, value) = token
                .split_once('-')
                .ok_or_else(|| QualifierError::MissingSeparator(token.to_string()))?;
            self.map.insert(name.to_lowercase(), value.to_lowercase());
        }
        Ok(())
    }

    /// Collects the qualifiers of a path relative to the asset folder: every
    /// directory segment plus the dotted suffix of the extension-stripped
    /// file name.
    pub fn from_relative_path(rel: &str) -> Result<Self, QualifierError> {
        let mut q = Self::new();
        let segments: Vec<&str> = rel.split(['/', '\\']).filter(|s| !s.is_empty()).collect();
        let Some((file_name, dirs)) = segments.split_last() else {
            return Ok(q);
        };
        for dir in dirs {
            q.parse_segment(dir)?;
        }
        if let Some(suffix) = file_suffix(file_name) {
            q.parse_segment(suffix)?;
        }
        Ok(q)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// True when `name` is present with exactly `value`.
    pub fn is(&self, name: &str, value: &str) -> bool {
        self.get(name) == Some(value)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// `Logo.scale-200.png` -> `scale-200`; `Logo.png` -> None
fn file_suffix(file_name: &str) -> Option<&str> {
    let stem = Path::new(file_name).file_stem()?.to_str()?;
    Path::new(stem).extension()?.to_str()
}
