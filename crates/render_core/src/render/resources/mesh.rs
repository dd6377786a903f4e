//! GPU mesh with object-space bounds

use crate::foundation::math::Vec3;
use crate::render::gpu::{BufferHandle, BufferKind, GpuBackend};
use crate::render::{RenderError, RenderResult};
use crate::spatial::AABB;
use super::{PendingRelease, ReleaseQueue};

/// Indexed triangle mesh uploaded to the backend
///
/// The bounding box is computed from the vertex positions at upload time and
/// is what culling and shadow fitting test against.
#[derive(Debug)]
pub struct Mesh {
    label: String,
    bounding_box: AABB,
    vertices: BufferHandle,
    indices: BufferHandle,
    index_count: u32,
    released: bool,
    release_queue: ReleaseQueue,
}

impl Mesh {
    /// Upload positions and triangle indices
    pub fn from_positions(
        backend: &mut dyn GpuBackend,
        label: impl Into<String>,
        positions: &[Vec3],
        indices: &[u32],
        release_queue: &ReleaseQueue,
    ) -> RenderResult<Self> {
        let label = label.into();

        let bounding_box = AABB::from_points(positions.iter().copied())
            .ok_or_else(|| RenderError::ResourceCreationFailed(format!("mesh '{}' has no vertices", label)))?;

        if let Some(&bad) = indices.iter().find(|&&index| index as usize >= positions.len()) {
            return Err(RenderError::ResourceCreationFailed(format!(
                "mesh '{}' index {} out of range for {} vertices",
                label,
                bad,
                positions.len()
            )));
        }
        let index_count = u32::try_from(indices.len())
            .map_err(|_| RenderError::ResourceCreationFailed(format!("mesh '{}' has too many indices", label)))?;

        let flat: Vec<f32> = positions.iter().flat_map(|p| [p.x, p.y, p.z]).collect();
        let vertices = backend.create_buffer(BufferKind::Vertex, bytemuck::cast_slice(&flat))?;
        let index_buffer = match backend.create_buffer(BufferKind::Index, bytemuck::cast_slice(indices)) {
            Ok(handle) => handle,
            Err(err) => {
                backend.delete_buffer(vertices);
                return Err(err);
            }
        };

        log::debug!("Uploaded mesh '{}' ({} vertices, {} indices)", label, positions.len(), index_count);

        Ok(Self {
            label,
            bounding_box,
            vertices,
            indices: index_buffer,
            index_count,
            released: false,
            release_queue: release_queue.clone(),
        })
    }

    /// Axis-aligned box centered on the origin with the given half extents
    pub fn cuboid(
        backend: &mut dyn GpuBackend,
        label: impl Into<String>,
        half_extents: Vec3,
        release_queue: &ReleaseQueue,
    ) -> RenderResult<Self> {
        let h = half_extents;
        let positions = [
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
        ];
        #[rustfmt::skip]
        let indices = [
            0, 2, 1, 0, 3, 2, // -Z
            4, 5, 6, 4, 6, 7, // +Z
            0, 1, 5, 0, 5, 4, // -Y
            3, 6, 2, 3, 7, 6, // +Y
            0, 4, 7, 0, 7, 3, // -X
            1, 2, 6, 1, 6, 5, // +X
        ];
        Self::from_positions(backend, label, &positions, &indices, release_queue)
    }

    /// Name of the mesh
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Object-space bounds
    pub fn bounding_box(&self) -> &AABB {
        &self.bounding_box
    }

    /// Vertex buffer handle
    pub fn vertex_buffer(&self) -> BufferHandle {
        self.vertices
    }

    /// Index buffer handle
    pub fn index_buffer(&self) -> BufferHandle {
        self.indices
    }

    /// Number of indices to draw
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Issue an indexed draw of the whole mesh with the current program
    pub fn draw(&self, backend: &mut dyn GpuBackend) {
        backend.draw_indexed(self.vertices, self.indices, self.index_count);
    }

    /// Delete both buffers now
    pub fn release(mut self, backend: &mut dyn GpuBackend) {
        backend.delete_buffer(self.vertices);
        backend.delete_buffer(self.indices);
        self.released = true;
    }
}

impl Drop for Mesh {
    fn drop(&mut self) {
        if !self.released {
            log::warn!("Mesh '{}' dropped without release, deferring deletion", self.label);
            self.release_queue.push(PendingRelease::Buffer(self.vertices));
            self.release_queue.push(PendingRelease::Buffer(self.indices));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::gpu::{GpuCall, HeadlessBackend};

    #[test]
    fn test_bounding_box_from_positions() {
        let mut backend = HeadlessBackend::new();
        let queue = ReleaseQueue::new();
        let mesh = Mesh::cuboid(&mut backend, "crate", Vec3::new(1.0, 2.0, 3.0), &queue).unwrap();

        assert_eq!(mesh.bounding_box().min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(mesh.bounding_box().max, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(mesh.index_count(), 36);

        mesh.release(&mut backend);
        assert_eq!(backend.live_buffers(), 0);
    }

    #[test]
    fn test_rejects_out_of_range_indices() {
        let mut backend = HeadlessBackend::new();
        let queue = ReleaseQueue::new();
        let positions = [Vec3::zeros(), Vec3::x(), Vec3::y()];

        let result = Mesh::from_positions(&mut backend, "broken", &positions, &[0, 1, 3], &queue);

        assert!(matches!(result, Err(RenderError::ResourceCreationFailed(_))));
        assert_eq!(backend.live_buffers(), 0);
    }

    #[test]
    fn test_draw_uses_both_buffers() {
        let mut backend = HeadlessBackend::new();
        let queue = ReleaseQueue::new();
        let positions = [Vec3::zeros(), Vec3::x(), Vec3::y()];
        let mesh = Mesh::from_positions(&mut backend, "tri", &positions, &[0, 1, 2], &queue).unwrap();

        mesh.draw(&mut backend);

        assert_eq!(
            backend.calls().last(),
            Some(&GpuCall::DrawIndexed {
                program: None,
                vertices: mesh.vertex_buffer(),
                indices: mesh.index_buffer(),
                index_count: 3,
            })
        );
        drop(mesh);
        assert_eq!(queue.len(), 2);
    }
}
