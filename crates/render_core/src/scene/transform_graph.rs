//! Hierarchical transform graph
//!
//! Nodes carry a local position/rotation/scale and a cached world matrix.
//! World matrices are recomputed lazily: a mutation marks the node and every
//! descendant dirty, and [`TransformGraph::world_matrix`] recomputes only
//! the dirty part of the ancestor chain.
//!
//! ## Invariants
//!
//! - A dirty node never has a clean descendant, except below a baked static
//!   node (whose world matrix can no longer change).
//! - A node's world matrix is cleaned only after its parent's.
//! - A static node bakes its world matrix on the first computation and keeps
//!   it forever, whatever happens to its local values or ancestors.

use thiserror::Error;

use crate::foundation::collections::{NodeId, SlotMap};
use crate::foundation::math::{Mat4, Quat, Transform, Vec3, Vec4};

/// Errors returned by [`TransformGraph`] operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// The handle does not refer to a live node
    #[error("Transform node {0:?} does not exist")]
    NodeNotFound(NodeId),

    /// A node cannot be its own parent
    #[error("Transform node {0:?} cannot be parented to itself")]
    SelfParent(NodeId),

    /// Parenting would create a loop in the hierarchy
    #[error("Parenting {node:?} under {parent:?} would create a cycle")]
    CycleDetected {
        /// Node being re-parented
        node: NodeId,
        /// Requested parent, which is a descendant of `node`
        parent: NodeId,
    },
}

/// Result type for transform graph operations
pub type TransformResult<T> = Result<T, TransformError>;

#[derive(Debug, Clone)]
struct TransformNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    local: Transform,
    world: Mat4,
    dirty: bool,
    is_static: bool,
    baked: bool,
}

impl TransformNode {
    fn new(local: Transform) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            local,
            world: Mat4::identity(),
            dirty: true,
            is_static: false,
            baked: false,
        }
    }
}

/// Owner of every transform node
#[derive(Debug, Default)]
pub struct TransformGraph {
    nodes: SlotMap<NodeId, TransformNode>,
}

impl TransformGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the graph holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `node` refers to a live node
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    /// Create a root node with the given local transform
    pub fn create_node(&mut self, local: Transform) -> NodeId {
        self.nodes.insert(TransformNode::new(local))
    }

    /// Create a node already attached to `parent`
    pub fn create_child(&mut self, parent: NodeId, local: Transform) -> TransformResult<NodeId> {
        self.node(parent)?;
        let child = self.create_node(local);
        self.set_parent(child, Some(parent))?;
        Ok(child)
    }

    /// Remove a node; its children become roots
    pub fn remove_node(&mut self, node: NodeId) -> TransformResult<Transform> {
        let removed = self.nodes.remove(node).ok_or(TransformError::NodeNotFound(node))?;

        if let Some(parent) = removed.parent {
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.children.retain(|&child| child != node);
            }
        }

        for &child in &removed.children {
            if let Some(child_node) = self.nodes.get_mut(child) {
                child_node.parent = None;
            }
            self.mark_dirty(child);
        }

        log::debug!("Removed transform node {:?} ({} children detached)", node, removed.children.len());
        Ok(removed.local)
    }

    /// Attach `node` to `parent`, or make it a root with `None`
    ///
    /// The node leaves its previous parent's child list and joins the new
    /// one. Re-parenting to the current parent is a no-op.
    pub fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>) -> TransformResult<()> {
        let old_parent = self.node(node)?.parent;

        if let Some(new_parent) = parent {
            if new_parent == node {
                return Err(TransformError::SelfParent(node));
            }
            self.node(new_parent)?;
            if self.is_ancestor(node, new_parent) {
                return Err(TransformError::CycleDetected { node, parent: new_parent });
            }
        }

        if old_parent == parent {
            return Ok(());
        }

        if let Some(old) = old_parent {
            self.nodes[old].children.retain(|&child| child != node);
        }
        if let Some(new_parent) = parent {
            self.nodes[new_parent].children.push(node);
        }
        self.nodes[node].parent = parent;
        self.mark_dirty(node);

        log::trace!("Re-parented {:?}: {:?} -> {:?}", node, old_parent, parent);
        Ok(())
    }

    /// Parent of `node`, if any
    pub fn parent(&self, node: NodeId) -> TransformResult<Option<NodeId>> {
        Ok(self.node(node)?.parent)
    }

    /// Children of `node` in attachment order
    pub fn children(&self, node: NodeId) -> TransformResult<&[NodeId]> {
        Ok(&self.node(node)?.children)
    }

    /// Nodes without a parent
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(id, _)| id)
    }

    /// Local transform of `node`
    pub fn local(&self, node: NodeId) -> TransformResult<&Transform> {
        Ok(&self.node(node)?.local)
    }

    /// Replace position, rotation and scale at once
    pub fn set_local(&mut self, node: NodeId, position: Vec3, rotation: Quat, scale: Vec3) -> TransformResult<()> {
        self.update_local(node, |local| *local = Transform::new(position, rotation, scale))
    }

    /// Replace the whole local transform
    pub fn set_transform(&mut self, node: NodeId, transform: Transform) -> TransformResult<()> {
        self.update_local(node, |local| *local = transform)
    }

    /// Set the local position
    pub fn set_position(&mut self, node: NodeId, position: Vec3) -> TransformResult<()> {
        self.update_local(node, |local| local.position = position)
    }

    /// Set the local rotation
    pub fn set_rotation(&mut self, node: NodeId, rotation: Quat) -> TransformResult<()> {
        self.update_local(node, |local| local.rotation = rotation)
    }

    /// Set the local scale
    pub fn set_scale(&mut self, node: NodeId, scale: Vec3) -> TransformResult<()> {
        self.update_local(node, |local| local.scale = scale)
    }

    /// Whether the cached world matrix of `node` is stale
    pub fn is_dirty(&self, node: NodeId) -> TransformResult<bool> {
        Ok(self.node(node)?.dirty)
    }

    /// Flag `node` as static
    ///
    /// A clean node bakes its current world matrix immediately; a dirty one
    /// bakes the next time it is computed. Baked matrices are never
    /// recomputed. Marking an already baked node again does nothing.
    pub fn mark_static(&mut self, node: NodeId) -> TransformResult<()> {
        let entry = self.node_mut(node)?;
        entry.is_static = true;
        if !entry.dirty && !entry.baked {
            entry.baked = true;
            log::debug!("Baked static transform {:?}", node);
        }
        Ok(())
    }

    /// Whether `node` is flagged static
    pub fn is_static(&self, node: NodeId) -> TransformResult<bool> {
        Ok(self.node(node)?.is_static)
    }

    /// Whether `node` has baked its world matrix
    pub fn is_baked(&self, node: NodeId) -> TransformResult<bool> {
        Ok(self.node(node)?.baked)
    }

    /// World matrix of `node`, recomputing the dirty part of its ancestry
    pub fn world_matrix(&mut self, node: NodeId) -> TransformResult<Mat4> {
        let entry = self.node(node)?;
        if entry.baked || !entry.dirty {
            return Ok(entry.world);
        }

        // Dirty ancestors, nearest first; the parent of the last one is clean
        let mut chain = vec![node];
        let mut cursor = entry.parent;
        while let Some(ancestor) = cursor {
            let ancestor_node = &self.nodes[ancestor];
            if ancestor_node.baked || !ancestor_node.dirty {
                break;
            }
            chain.push(ancestor);
            cursor = ancestor_node.parent;
        }

        for &id in chain.iter().rev() {
            let parent_world = self.nodes[id]
                .parent
                .map_or_else(Mat4::identity, |parent| self.nodes[parent].world);

            let entry = &mut self.nodes[id];
            entry.world = parent_world * entry.local.to_matrix();
            entry.dirty = false;
            if entry.is_static {
                entry.baked = true;
                log::debug!("Baked static transform {:?}", id);
            }
        }

        Ok(self.nodes[node].world)
    }

    /// World-space position of `node`
    pub fn world_position(&mut self, node: NodeId) -> TransformResult<Vec3> {
        let world = self.world_matrix(node)?;
        Ok(Vec3::new(world[(0, 3)], world[(1, 3)], world[(2, 3)]))
    }

    /// World-space direction the node faces (its local −Z), normalized
    pub fn forward(&mut self, node: NodeId) -> TransformResult<Vec3> {
        let world = self.world_matrix(node)?;
        let forward = (world * Vec4::new(0.0, 0.0, -1.0, 0.0)).xyz();
        Ok(forward.try_normalize(f32::EPSILON).unwrap_or_else(|| Vec3::new(0.0, 0.0, -1.0)))
    }

    /// Recompute every dirty world matrix, returning how many nodes were dirty
    pub fn update_world_matrices(&mut self) -> usize {
        let dirty: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.dirty && !node.baked)
            .map(|(id, _)| id)
            .collect();

        for &id in &dirty {
            // Handles come from the live slot map above
            let _ = self.world_matrix(id);
        }
        dirty.len()
    }

    fn node(&self, node: NodeId) -> TransformResult<&TransformNode> {
        self.nodes.get(node).ok_or(TransformError::NodeNotFound(node))
    }

    fn node_mut(&mut self, node: NodeId) -> TransformResult<&mut TransformNode> {
        self.nodes.get_mut(node).ok_or(TransformError::NodeNotFound(node))
    }

    fn update_local(&mut self, node: NodeId, update: impl FnOnce(&mut Transform)) -> TransformResult<()> {
        update(&mut self.node_mut(node)?.local);
        self.mark_dirty(node);
        Ok(())
    }

    /// True when `ancestor` appears on the parent chain of `node` (or is `node`)
    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes.get(current).and_then(|entry| entry.parent);
        }
        false
    }

    /// Dirty `node` and its descendants, stopping at dirty subtrees and baked nodes
    fn mark_dirty(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let Some(entry) = self.nodes.get_mut(current) else {
                continue;
            };
            if entry.baked || entry.dirty {
                continue;
            }
            entry.dirty = true;
            stack.extend(entry.children.iter().copied());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::constants::HALF_PI;
    use approx::assert_relative_eq;

    fn translation(x: f32, y: f32, z: f32) -> Transform {
        Transform::from_position(Vec3::new(x, y, z))
    }

    fn position_of(matrix: &Mat4) -> Vec3 {
        Vec3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)])
    }

    #[test]
    fn test_set_local_dirties_and_world_matrix_cleans() {
        let mut graph = TransformGraph::new();
        let node = graph.create_node(Transform::identity());
        graph.world_matrix(node).unwrap();
        assert!(!graph.is_dirty(node).unwrap());

        graph.set_position(node, Vec3::new(1.0, 2.0, 3.0)).unwrap();
        assert!(graph.is_dirty(node).unwrap());

        let world = graph.world_matrix(node).unwrap();
        assert!(!graph.is_dirty(node).unwrap());
        assert_relative_eq!(position_of(&world), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_parent_mutation_dirties_child() {
        let mut graph = TransformGraph::new();
        let parent = graph.create_node(translation(1.0, 0.0, 0.0));
        let child = graph.create_child(parent, translation(0.0, 1.0, 0.0)).unwrap();
        graph.world_matrix(child).unwrap();
        assert!(!graph.is_dirty(parent).unwrap());
        assert!(!graph.is_dirty(child).unwrap());

        graph.set_position(parent, Vec3::new(5.0, 0.0, 0.0)).unwrap();
        assert!(graph.is_dirty(child).unwrap());

        let world = graph.world_matrix(child).unwrap();
        assert_relative_eq!(position_of(&world), Vec3::new(5.0, 1.0, 0.0));
        assert!(!graph.is_dirty(parent).unwrap());
    }

    #[test]
    fn test_child_world_composes_parent_rotation() {
        let mut graph = TransformGraph::new();
        let parent = graph.create_node(Transform::from_position_rotation(
            Vec3::new(0.0, 0.0, -2.0),
            Quat::from_axis_angle(&Vec3::y_axis(), HALF_PI),
        ));
        let child = graph.create_child(parent, translation(1.0, 0.0, 0.0)).unwrap();

        let world = graph.world_matrix(child).unwrap();

        // +X rotated 90° about Y becomes -Z
        assert_relative_eq!(position_of(&world), Vec3::new(0.0, 0.0, -3.0), epsilon = 1e-5);
    }

    #[test]
    fn test_static_node_keeps_first_bake() {
        let mut graph = TransformGraph::new();
        let node = graph.create_node(translation(1.0, 0.0, 0.0));
        graph.mark_static(node).unwrap();

        let first = graph.world_matrix(node).unwrap();
        assert!(graph.is_baked(node).unwrap());

        graph.set_position(node, Vec3::new(9.0, 9.0, 9.0)).unwrap();
        assert!(!graph.is_dirty(node).unwrap());
        assert_eq!(graph.world_matrix(node).unwrap(), first);
        assert_eq!(graph.local(node).unwrap().position, Vec3::new(9.0, 9.0, 9.0));
    }

    #[test]
    fn test_static_after_evaluation_bakes_current_matrix() {
        let mut graph = TransformGraph::new();
        let node = graph.create_node(translation(1.0, 0.0, 0.0));
        graph.world_matrix(node).unwrap();
        graph.mark_static(node).unwrap();

        let first = graph.world_matrix(node).unwrap();
        graph.set_position(node, Vec3::new(9.0, 9.0, 9.0)).unwrap();
        let second = graph.world_matrix(node).unwrap();

        assert!(graph.is_baked(node).unwrap());
        assert_eq!(second, first);
        assert_relative_eq!(position_of(&second), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_parent_move_after_child_bake_is_ignored() {
        let mut graph = TransformGraph::new();
        let root = graph.create_node(translation(2.0, 0.0, 0.0));
        let child = graph.create_child(root, translation(0.0, 3.0, 0.0)).unwrap();
        graph.mark_static(child).unwrap();
        let baked = graph.world_matrix(child).unwrap();

        graph.set_position(root, Vec3::new(-50.0, 0.0, 0.0)).unwrap();

        assert_eq!(graph.world_matrix(child).unwrap(), baked);
        assert_relative_eq!(position_of(&graph.world_matrix(root).unwrap()), Vec3::new(-50.0, 0.0, 0.0));
    }

    #[test]
    fn test_baked_parent_shields_children_from_ancestor_changes() {
        let mut graph = TransformGraph::new();
        let root = graph.create_node(translation(1.0, 0.0, 0.0));
        let baked = graph.create_child(root, translation(0.0, 1.0, 0.0)).unwrap();
        let leaf = graph.create_child(baked, translation(0.0, 0.0, 1.0)).unwrap();
        graph.mark_static(baked).unwrap();
        graph.world_matrix(leaf).unwrap();

        graph.set_position(root, Vec3::new(100.0, 0.0, 0.0)).unwrap();

        assert!(!graph.is_dirty(leaf).unwrap());
        assert_relative_eq!(position_of(&graph.world_matrix(leaf).unwrap()), Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_reparent_updates_both_child_lists_and_world() {
        let mut graph = TransformGraph::new();
        let a = graph.create_node(translation(1.0, 0.0, 0.0));
        let c = graph.create_node(translation(0.0, 0.0, 10.0));
        let b = graph.create_child(a, translation(0.0, 1.0, 0.0)).unwrap();
        assert_relative_eq!(position_of(&graph.world_matrix(b).unwrap()), Vec3::new(1.0, 1.0, 0.0));

        graph.set_parent(b, Some(c)).unwrap();

        assert!(graph.children(a).unwrap().is_empty());
        assert_eq!(graph.children(c).unwrap(), &[b]);
        assert_eq!(graph.parent(b).unwrap(), Some(c));
        assert!(graph.is_dirty(b).unwrap());
        assert_relative_eq!(position_of(&graph.world_matrix(b).unwrap()), Vec3::new(0.0, 1.0, 10.0));
    }

    #[test]
    fn test_cycles_and_self_parenting_rejected() {
        let mut graph = TransformGraph::new();
        let a = graph.create_node(Transform::identity());
        let b = graph.create_child(a, Transform::identity()).unwrap();
        let c = graph.create_child(b, Transform::identity()).unwrap();

        assert_eq!(graph.set_parent(a, Some(a)), Err(TransformError::SelfParent(a)));
        assert_eq!(
            graph.set_parent(a, Some(c)),
            Err(TransformError::CycleDetected { node: a, parent: c })
        );
        assert_eq!(graph.parent(a).unwrap(), None);
    }

    #[test]
    fn test_remove_node_detaches_children() {
        let mut graph = TransformGraph::new();
        let root = graph.create_node(translation(3.0, 0.0, 0.0));
        let middle = graph.create_child(root, Transform::identity()).unwrap();
        let leaf = graph.create_child(middle, translation(0.0, 1.0, 0.0)).unwrap();
        graph.world_matrix(leaf).unwrap();

        graph.remove_node(middle).unwrap();

        assert!(!graph.contains(middle));
        assert!(graph.children(root).unwrap().is_empty());
        assert_eq!(graph.parent(leaf).unwrap(), None);
        assert_relative_eq!(position_of(&graph.world_matrix(leaf).unwrap()), Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(graph.world_matrix(middle), Err(TransformError::NodeNotFound(middle)));
    }

    #[test]
    fn test_forward_follows_rotation() {
        let mut graph = TransformGraph::new();
        let node = graph.create_node(Transform::from_position_rotation(
            Vec3::zeros(),
            Quat::from_axis_angle(&Vec3::y_axis(), HALF_PI),
        ));

        assert_relative_eq!(graph.forward(node).unwrap(), Vec3::new(-1.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_update_world_matrices_cleans_everything() {
        let mut graph = TransformGraph::new();
        let root = graph.create_node(Transform::identity());
        let a = graph.create_child(root, translation(1.0, 0.0, 0.0)).unwrap();
        let b = graph.create_child(a, translation(1.0, 0.0, 0.0)).unwrap();

        assert_eq!(graph.update_world_matrices(), 3);
        assert!(!graph.is_dirty(b).unwrap());
        assert_eq!(graph.update_world_matrices(), 0);
    }
}
