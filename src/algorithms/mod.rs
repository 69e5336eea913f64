//! Host-side graph algorithms
//!
//! Sequential reference traversals used for frontier pre-checks and result
//! verification.

pub mod traversal;

pub use traversal::{bfs_reference, level_widths, max_level_width, verify_bfs_tree, BfsTree};
