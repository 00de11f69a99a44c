//! Environment limits.
//!
//! The engine needs its map size and named-database limit before the store
//! file is mapped, so both travel together in an [`EnvConfig`] handed to
//! [`Environment::open_with_config`](crate::Environment::open_with_config).
//!
//! Defaults: 1 GiB map, 10 named sub-databases. These are policy values,
//! not engine limits; bigger stores pass their own config.

use crate::constants::{DEFAULT_MAP_SIZE, DEFAULT_MAX_DBS, PAGE_SIZE};

/// Limits applied to an environment when it is opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnvConfig {
    /// Upper bound on the memory map, in bytes. Rounded down to a page
    /// boundary when the environment is opened.
    pub map_size: usize,

    /// Maximum number of named sub-databases.
    pub max_dbs: u32,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            map_size: DEFAULT_MAP_SIZE,
            max_dbs: DEFAULT_MAX_DBS,
        }
    }
}

impl EnvConfig {
    pub fn new(map_size: usize, max_dbs: u32) -> Self {
        Self { map_size, max_dbs }
    }

    pub fn with_map_size(mut self, map_size: usize) -> Self {
        self.map_size = map_size;
        self
    }

    pub fn with_max_dbs(mut self, max_dbs: u32) -> Self {
        self.max_dbs = max_dbs;
        self
    }

    /// Map size actually handed to the engine: the largest multiple of
    /// [`PAGE_SIZE`] not above the request. `None` if that is zero.
    pub fn page_aligned_map_size(&self) -> Option<usize> {
        let aligned = self.map_size - self.map_size % PAGE_SIZE;
        (aligned > 0).then_some(aligned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_size_never_rounds_up() {
        let cfg = EnvConfig::default().with_map_size(10 * PAGE_SIZE + 1);
        assert_eq!(cfg.page_aligned_map_size(), Some(10 * PAGE_SIZE));

        let cfg = EnvConfig::default().with_map_size(2 * PAGE_SIZE - 1);
        assert_eq!(cfg.page_aligned_map_size(), Some(PAGE_SIZE));
    }

    #[test]
    fn aligned_map_size_is_kept() {
        let cfg = EnvConfig::default();
        assert_eq!(cfg.page_aligned_map_size(), Some(DEFAULT_MAP_SIZE));
    }

    #[test]
    fn sub_page_map_size_is_rejected() {
        assert_eq!(EnvConfig::new(PAGE_SIZE - 1, 1).page_aligned_map_size(), None);
        assert_eq!(EnvConfig::new(0, 1).page_aligned_map_size(), None);
    }
}
