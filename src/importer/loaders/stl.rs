//! STL loader (stereolithography).
//!
//! Handles both encodings:
//!
//! - ASCII: begins with the `solid` token, triangles as
//!   `facet normal` / `vertex` blocks
//! - binary: 80-byte comment header, little-endian triangle count, then 50
//!   bytes per triangle (normal, three vertices, attribute word)
//!
//! Signature probing accepts a file when the ASCII token matches or when the
//! binary triangle count is consistent with the file size. Output is a
//! single mesh under the root, in verbose layout, with per-vertex normals
//! replicated from the stored facet normals.

use glam::Vec3;

use crate::errors::{ImportError, Result};
use crate::importer::{simple_extension_check, SceneLoader};
use crate::io::{read_to_end, IoSystem};
use crate::scene::{Face, Mesh, Scene};

const BINARY_HEADER_SIZE: usize = 84;
const BINARY_TRIANGLE_SIZE: usize = 50;

#[derive(Debug, Default)]
pub struct StlLoader;

impl SceneLoader for StlLoader {
    fn name(&self) -> &'static str {
        "stl"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["stl"]
    }

    fn can_read(&self, path: &str, io: Option<&dyn IoSystem>, check_sig: bool) -> bool {
        if !check_sig {
            return simple_extension_check(path, self.extensions());
        }
        let Some(io) = io else {
            return simple_extension_check(path, self.extensions());
        };
        let Ok(mut stream) = io.open(path) else {
            return false;
        };
        let size = stream.size() as usize;
        let Ok(prefix) = crate::io::read_prefix(&mut *stream, BINARY_HEADER_SIZE) else {
            return false;
        };
        if prefix.starts_with(b"solid") {
            return true;
        }
        if prefix.len() == BINARY_HEADER_SIZE {
            let count = u32::from_le_bytes([prefix[80], prefix[81], prefix[82], prefix[83]]);
            return BINARY_HEADER_SIZE + count as usize * BINARY_TRIANGLE_SIZE == size;
        }
        false
    }

    fn intern_read(&self, path: &str, io: &dyn IoSystem) -> Result<Scene> {
        let mut stream = io.open(path)?;
        let bytes = read_to_end(&mut *stream)?;

        // ASCII files may still begin with "solid"-prefixed binary headers;
        // require an actual facet statement before parsing as text.
        let mesh = if bytes.starts_with(b"solid") && contains_token(&bytes, b"facet") {
            parse_ascii(&bytes, path)?
        } else {
            parse_binary(&bytes, path)?
        };

        let mut scene = Scene::new();
        let root = scene.root();
        let node = scene.create_child_node(root, mesh.name.clone());
        scene.meshes.push(mesh);
        scene.nodes[node].mesh_indices.push(0);
        Ok(scene)
    }
}

fn contains_token(bytes: &[u8], token: &[u8]) -> bool {
    bytes.windows(token.len()).any(|w| w == token)
}

struct TriangleSink {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    faces: Vec<Face>,
}

impl TriangleSink {
    fn new() -> Self {
        Self {
            positions: Vec::new(),
            normals: Vec::new(),
            faces: Vec::new(),
        }
    }

    fn push(&mut self, normal: Vec3, vertices: [Vec3; 3]) {
        let base = self.positions.len() as u32;
        // Zero stored normals are common in the wild; fall back to the
        // geometric face normal.
        let normal = if normal.length_squared() > 1e-12 {
            normal.normalize()
        } else {
            let edge1 = vertices[1] - vertices[0];
            let edge2 = vertices[2] - vertices[0];
            edge1.cross(edge2).normalize_or_zero()
        };
        for vertex in vertices {
            self.positions.push(vertex);
            self.normals.push(normal);
        }
        self.faces.push(Face::new(base..base + 3));
    }

    fn build(self, name: String, path: &str) -> Result<Mesh> {
        if self.faces.is_empty() {
            return Err(ImportError::Decode(format!(
                "STL: {path} contains no facets"
            )));
        }
        let mut mesh = Mesh::new(name);
        mesh.positions = self.positions;
        mesh.normals = self.normals;
        mesh.faces = self.faces;
        mesh.update_primitive_types();
        Ok(mesh)
    }
}

fn parse_ascii(bytes: &[u8], path: &str) -> Result<Mesh> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| ImportError::Decode(format!("STL: {path} is not valid UTF-8")))?;

    let mut sink = TriangleSink::new();
    let mut solid_name = String::from("STL");
    let mut facet_normal = Vec3::ZERO;
    let mut vertices: Vec<Vec3> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("solid") => {
                if let Some(name) = tokens.next() {
                    solid_name = name.to_string();
                }
            }
            Some("facet") => {
                // "facet normal nx ny nz"
                if tokens.next() == Some("normal") {
                    facet_normal = parse_vec3(&mut tokens, path)?;
                }
                vertices.clear();
            }
            Some("vertex") => vertices.push(parse_vec3(&mut tokens, path)?),
            Some("endfacet") => {
                if vertices.len() != 3 {
                    return Err(ImportError::Decode(format!(
                        "STL: facet with {} vertices in {path}",
                        vertices.len()
                    )));
                }
                sink.push(facet_normal, [vertices[0], vertices[1], vertices[2]]);
            }
            _ => {}
        }
    }
    sink.build(solid_name, path)
}

fn parse_binary(bytes: &[u8], path: &str) -> Result<Mesh> {
    if bytes.len() < BINARY_HEADER_SIZE {
        return Err(ImportError::Decode(format!(
            "STL: {path} is too small for a binary header"
        )));
    }
    let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as usize;
    let expected = BINARY_HEADER_SIZE + count * BINARY_TRIANGLE_SIZE;
    if bytes.len() < expected {
        return Err(ImportError::Decode(format!(
            "STL: {path} is truncated ({} bytes, {expected} expected)",
            bytes.len()
        )));
    }

    let mut sink = TriangleSink::new();
    for i in 0..count {
        let record = &bytes[BINARY_HEADER_SIZE + i * BINARY_TRIANGLE_SIZE..];
        let normal = read_vec3(record, 0);
        let vertices = [
            read_vec3(record, 12),
            read_vec3(record, 24),
            read_vec3(record, 36),
        ];
        sink.push(normal, vertices);
    }
    sink.build(String::from("STL"), path)
}

fn read_vec3(bytes: &[u8], offset: usize) -> Vec3 {
    let f = |o: usize| {
        f32::from_le_bytes([
            bytes[offset + o],
            bytes[offset + o + 1],
            bytes[offset + o + 2],
            bytes[offset + o + 3],
        ])
    };
    Vec3::new(f(0), f(4), f(8))
}

fn parse_vec3(tokens: &mut std::str::SplitWhitespace<'_>, path: &str) -> Result<Vec3> {
    let mut component = || -> Result<f32> {
        tokens
            .next()
            .ok_or_else(|| ImportError::Decode(format!("STL: missing coordinate in {path}")))?
            .parse()
            .map_err(|_| ImportError::Decode(format!("STL: malformed coordinate in {path}")))
    };
    Ok(Vec3::new(component()?, component()?, component()?))
}
