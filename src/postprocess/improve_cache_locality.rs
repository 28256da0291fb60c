//! Vertex cache locality optimization (Tipsify).
//!
//! Reorders triangle faces so consecutive triangles revisit recently used
//! vertices, following Sander et al.'s "Fast Triangle Reordering for Vertex
//! Locality and Reduced Overdraw". Vertices are then renumbered by first
//! use so the pre-transform fetch pattern is sequential too. Only pure
//! triangle meshes are touched.

use crate::errors::Result;
use crate::importer::{config, PropertyStore};
use crate::postprocess::util::copy_vertices_by_order;
use crate::postprocess::{PostProcessStage, PostProcessSteps, SharedPostState};
use crate::scene::{Face, PrimitiveTypes, Scene};

pub struct ImproveCacheLocality {
    cache_size: u32,
}

impl Default for ImproveCacheLocality {
    fn default() -> Self {
        Self { cache_size: 12 }
    }
}

impl PostProcessStage for ImproveCacheLocality {
    fn name(&self) -> &'static str {
        "improve-cache-locality"
    }

    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.contains(PostProcessSteps::IMPROVE_CACHE_LOCALITY)
    }

    fn setup_properties(&mut self, props: &PropertyStore) {
        self.cache_size = props.get_int(config::PP_ICL_CACHE_SIZE, 12).max(3) as u32;
    }

    fn execute(&mut self, scene: &mut Scene, _shared: &mut SharedPostState) -> Result<()> {
        for mesh in &mut scene.meshes {
            if mesh.primitive_types != PrimitiveTypes::TRIANGLE || mesh.face_count() < 2 {
                continue;
            }

            let face_order = tipsify(&mesh.faces, mesh.vertex_count(), self.cache_size);
            let reordered: Vec<Face> = face_order
                .iter()
                .map(|&f| mesh.faces[f].clone())
                .collect();

            // Renumber vertices by first use.
            let count = mesh.vertex_count();
            const UNSET: u32 = u32::MAX;
            let mut old_to_new = vec![UNSET; count];
            let mut order: Vec<u32> = Vec::with_capacity(count);
            for face in &reordered {
                for &index in &face.indices {
                    if old_to_new[index as usize] == UNSET {
                        old_to_new[index as usize] = order.len() as u32;
                        order.push(index);
                    }
                }
            }
            // Unreferenced vertices keep a slot at the end.
            for (old, slot) in old_to_new.iter_mut().enumerate() {
                if *slot == UNSET {
                    *slot = order.len() as u32;
                    order.push(old as u32);
                }
            }

            let mut rebuilt = copy_vertices_by_order(mesh, &order);
            rebuilt.faces = reordered;
            for face in &mut rebuilt.faces {
                for index in &mut face.indices {
                    *index = old_to_new[*index as usize];
                }
            }
            rebuilt.primitive_types = mesh.primitive_types;
            *mesh = rebuilt;
        }
        Ok(())
    }
}

const NONE: u32 = u32::MAX;

/// Returns the optimized face order.
fn tipsify(faces: &[Face], vertex_count: usize, cache_size: u32) -> Vec<usize> {
    // Triangles adjacent to each vertex.
    let mut adjacency: Vec<Vec<u32>> = vec![Vec::new(); vertex_count];
    for (f, face) in faces.iter().enumerate() {
        for &v in &face.indices {
            adjacency[v as usize].push(f as u32);
        }
    }
    let mut live: Vec<u32> = adjacency.iter().map(|a| a.len() as u32).collect();

    let mut time: u32 = cache_size + 1;
    let mut cache_time: Vec<u32> = vec![0; vertex_count];
    let mut emitted = vec![false; faces.len()];
    let mut dead_end: Vec<u32> = Vec::new();
    let mut output: Vec<usize> = Vec::with_capacity(faces.len());
    let mut input_cursor = 1usize;

    let mut fanning: u32 = if vertex_count > 0 { 0 } else { NONE };
    let mut candidates: Vec<u32> = Vec::new();

    while fanning != NONE {
        candidates.clear();
        for &f in &adjacency[fanning as usize] {
            if emitted[f as usize] {
                continue;
            }
            emitted[f as usize] = true;
            output.push(f as usize);
            for &v in &faces[f as usize].indices {
                candidates.push(v);
                dead_end.push(v);
                live[v as usize] -= 1;
                if time - cache_time[v as usize] > cache_size {
                    cache_time[v as usize] = time;
                    time += 1;
                }
            }
        }

        // Next fanning vertex: the candidate still in cache (with room for
        // its remaining triangles) that entered it longest ago.
        let mut best = NONE;
        let mut best_priority = -1i64;
        for &v in &candidates {
            if live[v as usize] == 0 {
                continue;
            }
            let age = i64::from(time - cache_time[v as usize]);
            let priority = if age + 2 * i64::from(live[v as usize]) <= i64::from(cache_size) {
                age
            } else {
                0
            };
            if priority > best_priority {
                best_priority = priority;
                best = v;
            }
        }

        if best == NONE {
            // Dead-end: back up, then fall back to input order.
            while let Some(v) = dead_end.pop() {
                if live[v as usize] > 0 {
                    best = v;
                    break;
                }
            }
            if best == NONE {
                while input_cursor < vertex_count {
                    if live[input_cursor] > 0 {
                        best = input_cursor as u32;
                        break;
                    }
                    input_cursor += 1;
                }
            }
        }
        fanning = best;
    }

    // Faces whose vertices were never reached (isolated data) keep their
    // relative order at the end.
    if output.len() < faces.len() {
        let mut seen = vec![false; faces.len()];
        for &f in &output {
            seen[f] = true;
        }
        for f in 0..faces.len() {
            if !seen[f] {
                output.push(f);
            }
        }
    }
    output
}
