//! # isocrate contour
//!
//! Iso-surface extraction from regular scalar volumes and truncated signed
//! distance fields using the Flying Edges algorithm.
//!
//! The engine is edge based: the volume is swept one x-row at a time, each
//! edge is classified once, and the output arrays are allocated up front from
//! a prefix sum so the final pass can write them in parallel.

pub mod boundary;
pub mod case_table;
pub mod classify;
pub mod edge_cases;
pub mod edge_class;
pub mod emit;
pub mod flying_edges;
pub mod gradient;
pub mod offsets;
pub mod parallel;
pub mod scan;

// Re-export commonly used items
pub use case_table::CanonicalCaseTable;
pub use edge_cases::{CaseEntry, EdgeCaseTable, Voxel};
pub use edge_class::{EdgeCase, EdgeClass, EdgeState, VertexState};
pub use flying_edges::*;
pub use offsets::{OffsetPlan, RowCounts, RowOffsets};
pub use parallel::{init_thread_pool, ThreadPoolConfig};
pub use scan::{ContourParams, EdgeGrid, RowScan};
