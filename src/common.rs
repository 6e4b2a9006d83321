// clusterconfig-core/src/common.rs

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SettingsError};

/// Shared, immutable string used for node names, keys and values.
pub type SharedStr = Arc<str>;

/// Configuration for the tree codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodecConfig {
    /// Capacity of the string interning cache. `None` disables interning.
    pub interning_cache_capacity: Option<usize>,
    /// Bytes pre-allocated for every output buffer.
    pub initial_buffer_capacity: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        CodecConfig {
            interning_cache_capacity: None,
            // Most patches and subtrees fit into one page.
            initial_buffer_capacity: 4096,
        }
    }
}

impl CodecConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interning_cache_capacity == Some(0) {
            return Err(SettingsError::ConfigError(
                "interning cache capacity must be positive when set".to_string(),
            ));
        }
        if self.initial_buffer_capacity == 0 {
            return Err(SettingsError::ConfigError(
                "initial buffer capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Parses and validates a JSON document such as `{"interningCacheCapacity": 10000}`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: CodecConfig = serde_json::from_str(json)
            .map_err(|e| SettingsError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[inline]
fn fold_char(c: char) -> char {
    if c.is_ascii() {
        return c.to_ascii_uppercase();
    }
    // Simple (one-to-one) case mapping only; expanding mappings leave the char as is.
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

// UTF-16 code units of a folded char, so supplementary-plane names sort
// below U+E000..U+FFFF as they do in UTF-16 ordinal order.
#[inline]
fn folded_units(s: &str) -> impl Iterator<Item = u16> + '_ {
    s.chars().flat_map(|c| {
        let mut units = [0u16; 2];
        let len = fold_char(c).encode_utf16(&mut units).len();
        units.into_iter().take(len)
    })
}

/// Case-insensitive ordinal comparison of node names.
///
/// Names are folded to upper case and compared as UTF-16 code units. This is
/// the order in which Object children are written to the wire; the binary
/// patcher and the path lookup rely on every encoder and decoder agreeing on it.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    if a.is_ascii() && b.is_ascii() {
        return a.bytes().map(|c| c.to_ascii_uppercase()).cmp(b.bytes().map(|c| c.to_ascii_uppercase()));
    }
    folded_units(a).cmp(folded_units(b))
}

pub fn names_equal(a: &str, b: &str) -> bool {
    if a.len() == b.len() && a.eq_ignore_ascii_case(b) {
        return true;
    }
    compare_names(a, b) == Ordering::Equal
}

/// Compares optional names; two absent names are equal, absent never equals present.
pub fn optional_names_equal(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => names_equal(a, b),
        _ => false,
    }
}

/// Orders optional names with absent names first.
pub fn compare_optional_names(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_names(a, b),
    }
}

/// A map key that hashes and compares case-insensitively.
#[derive(Debug, Clone)]
pub struct NodeName(SharedStr);

impl NodeName {
    pub fn new(name: impl Into<SharedStr>) -> Self {
        NodeName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn shared(&self) -> &SharedStr {
        &self.0
    }
}

impl PartialEq for NodeName {
    fn eq(&self, other: &Self) -> bool {
        names_equal(&self.0, &other.0)
    }
}

impl Eq for NodeName {}

impl Hash for NodeName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for c in self.0.chars() {
            state.write_u32(fold_char(c) as u32);
        }
        state.write_u8(0xff);
    }
}

impl PartialOrd for NodeName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeName {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_names(&self.0, &other.0)
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeName {
    fn from(value: &str) -> Self {
        NodeName::new(value)
    }
}
