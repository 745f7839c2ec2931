//! Engine configuration
//!
//! All tunables live in one plain struct passed by value into the
//! compiler and the listing service. No globals, no env magic.

/// Maximum prefix length the store indexes for equality comparisons.
/// Non-wildcard filters compare against `left(val, 127)` to match the
/// store's own truncation convention.
pub const INDEX_PREFIX_LEN: usize = 127;

/// Engine tunables
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Placement pass limit = factor * number of non-master descriptors
    pub max_pass_factor: usize,
    /// Truncation length for non-wildcard filter comparisons
    pub index_prefix_len: usize,
    /// Page size used when the caller does not supply a limit
    pub default_limit: i64,
    /// Offset used when the caller does not supply one
    pub default_offset: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_pass_factor: 2,
            index_prefix_len: INDEX_PREFIX_LEN,
            default_limit: 100,
            default_offset: 0,
        }
    }
}
