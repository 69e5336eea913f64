//! Run configuration

use crate::layout::LayoutKind;
use thiserror::Error;

/// Lanes per workgroup unless configured otherwise
pub const DEFAULT_WORK_GROUP_SIZE: u32 = 256;

/// Invalid run configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Work-group size must be positive
    #[error("work-group size must be at least 1")]
    ZeroWorkGroupSize,
}

/// Options of one multi-graph BFS run
///
/// ```
/// use trueno_multibfs::{LayoutKind, RunConfig};
///
/// let config = RunConfig::new()
///     .with_layout(LayoutKind::Vectorized)
///     .with_work_group_size(128);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    /// Aggregate layout
    pub layout: LayoutKind,
    /// Lanes per group; also the per-level frontier capacity
    pub work_group_size: u32,
    /// Copy results back into the caller's graphs after the run
    pub write_back: bool,
    /// Reject graphs with a level wider than the group before launching
    pub check_frontier_bound: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            layout: LayoutKind::default(),
            work_group_size: DEFAULT_WORK_GROUP_SIZE,
            write_back: true,
            check_frontier_bound: true,
        }
    }
}

impl RunConfig {
    /// Default configuration (compressed, 256 lanes, write-back on)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the layout
    #[must_use]
    pub const fn with_layout(mut self, layout: LayoutKind) -> Self {
        self.layout = layout;
        self
    }

    /// Set the work-group size
    #[must_use]
    pub const fn with_work_group_size(mut self, work_group_size: u32) -> Self {
        self.work_group_size = work_group_size;
        self
    }

    /// Enable or disable result write-back
    #[must_use]
    pub const fn with_write_back(mut self, write_back: bool) -> Self {
        self.write_back = write_back;
        self
    }

    /// Enable or disable the host-side frontier width check
    #[must_use]
    pub const fn with_frontier_check(mut self, check: bool) -> Self {
        self.check_frontier_bound = check;
        self
    }

    /// Check values the device layer cannot
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroWorkGroupSize`] for a zero width.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.work_group_size == 0 {
            return Err(ConfigError::ZeroWorkGroupSize);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.layout, LayoutKind::Compressed);
        assert_eq!(config.work_group_size, 256);
        assert!(config.write_back);
        assert!(config.check_frontier_bound);
    }

    #[test]
    fn test_builder_and_validate() {
        let config = RunConfig::new()
            .with_layout(LayoutKind::Vectorized)
            .with_write_back(false)
            .with_frontier_check(false)
            .with_work_group_size(0);
        assert_eq!(config.layout, LayoutKind::Vectorized);
        assert!(!config.write_back);
        assert!(!config.check_frontier_bound);
        assert_eq!(config.validate(), Err(ConfigError::ZeroWorkGroupSize));
    }
}
