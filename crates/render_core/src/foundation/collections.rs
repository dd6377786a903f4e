//! Specialized collection types
//!
//! Stable handles for engine-owned objects. Every handle is a generational
//! slot-map key, so a handle that outlives its object is detected instead of
//! aliasing whatever reuses the slot.

pub use slotmap::{SlotMap, SecondaryMap, Key};

slotmap::new_key_type! {
    /// Handle to a node in a [`TransformGraph`](crate::scene::TransformGraph)
    pub struct NodeId;

    /// Handle to a material owned by a [`ShaderStateCache`](crate::render::material::ShaderStateCache)
    pub struct MaterialId;

    /// Handle to a pass registered with a [`RenderQueueScheduler`](crate::render::pass::RenderQueueScheduler)
    pub struct PassHandle;
}
