//! Spatial sort index and its lifetime marker stages.
//!
//! Positions are projected onto a fixed, deliberately skewed axis and sorted
//! by signed plane distance. A radius query then needs only a binary search
//! plus a short scan of the matching distance window.
//!
//! The index is built once per import by [`ComputeSpatialSort`], consumed by
//! smooth normal generation, tangent generation, and vertex joining, and
//! dropped by [`DestroySpatialSort`]. Stages outside that bracket must not
//! touch it.

use glam::Vec3;

use crate::errors::{ImportError, Result};
use crate::postprocess::{PostProcessStage, PostProcessSteps, SharedPostState};
use crate::scene::Scene;

#[derive(Debug, Clone, Copy)]
struct Entry {
    index: u32,
    position: Vec3,
    distance: f32,
}

/// Positions sorted by distance along a fixed projection axis.
#[derive(Debug, Default)]
pub struct SpatialSort {
    plane_normal: Vec3,
    entries: Vec<Entry>,
}

impl SpatialSort {
    #[must_use]
    pub fn new(positions: &[Vec3]) -> Self {
        // Any axis works as long as no coordinate plane is parallel to it;
        // skewed components keep axis-aligned geometry from collapsing onto
        // a few distance values.
        let plane_normal = Vec3::new(0.8523, 0.34321, 0.5736).normalize();
        let mut entries: Vec<Entry> = positions
            .iter()
            .enumerate()
            .map(|(i, &position)| Entry {
                index: i as u32,
                position,
                distance: position.dot(plane_normal),
            })
            .collect();
        entries.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Self {
            plane_normal,
            entries,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Collects the indices of all positions within `radius` of `position`
    /// into `out` (cleared first).
    pub fn find_positions(&self, position: Vec3, radius: f32, out: &mut Vec<u32>) {
        out.clear();
        let distance = position.dot(self.plane_normal);
        let start = self
            .entries
            .partition_point(|e| e.distance < distance - radius);
        let radius_sq = radius * radius;
        for entry in &self.entries[start..] {
            if entry.distance > distance + radius {
                break;
            }
            if entry.position.distance_squared(position) <= radius_sq {
                out.push(entry.index);
            }
        }
    }
}

/// Flags whose stages consume the spatial sort index.
pub(crate) const CONSUMER_STEPS: PostProcessSteps = PostProcessSteps::GEN_SMOOTH_NORMALS
    .union(PostProcessSteps::CALC_TANGENT_SPACE)
    .union(PostProcessSteps::JOIN_IDENTICAL_VERTICES);

/// Construction marker: builds one index per mesh into the shared state.
pub struct ComputeSpatialSort;

impl PostProcessStage for ComputeSpatialSort {
    fn name(&self) -> &'static str {
        "spatial-sort-setup"
    }

    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.intersects(CONSUMER_STEPS)
    }

    fn execute(&mut self, scene: &mut Scene, shared: &mut SharedPostState) -> Result<()> {
        if shared.has_spatial_sorts() {
            return Err(ImportError::OrderingBroken(
                "spatial sort state already present before the construction marker".into(),
            ));
        }
        let sorts = scene
            .meshes
            .iter()
            .map(|mesh| SpatialSort::new(&mesh.positions))
            .collect();
        shared.install_spatial_sorts(sorts);
        Ok(())
    }
}

/// Destruction marker: drops the shared index.
pub struct DestroySpatialSort;

impl PostProcessStage for DestroySpatialSort {
    fn name(&self) -> &'static str {
        "spatial-sort-teardown"
    }

    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.intersects(CONSUMER_STEPS)
    }

    fn execute(&mut self, _scene: &mut Scene, shared: &mut SharedPostState) -> Result<()> {
        shared.clear();
        Ok(())
    }
}
