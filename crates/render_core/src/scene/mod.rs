//! Scene management system
//!
//! Spatial hierarchy of the scene. Objects reference a [`NodeId`] in the
//! [`TransformGraph`]; draws read their world matrices from it each frame.
//!
//! ## Architecture
//!
//! ```text
//! Application (moves nodes)
//!      ↓
//! TransformGraph (dirty flags, cached world matrices)
//!      ↓
//! Render passes (read world matrices per draw)
//! ```

mod transform_graph;

pub use transform_graph::{TransformGraph, TransformError, TransformResult};
pub use crate::foundation::collections::NodeId;
