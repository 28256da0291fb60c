//! Wavefront OBJ loader.
//!
//! Decodes positions, normals, texture coordinates, polygonal faces, object
//! groups (mapped to child nodes), and `usemtl` material slots. Vertices are
//! emitted in verbose layout: every face references its own run of freshly
//! appended vertices.
//!
//! Material libraries (`mtllib`) are not resolved; `usemtl` names become
//! name-only materials so slot assignment survives the import.

use glam::Vec3;

use crate::errors::{ImportError, Result};
use crate::importer::{search_file_header_for_token, simple_extension_check, SceneLoader};
use crate::io::{read_to_end, IoSystem};
use crate::scene::material::{keys, Material};
use crate::scene::{Face, Mesh, Scene};

const SIGNATURE_TOKENS: &[&str] = &["mtllib", "usemtl", "v ", "vt ", "vn ", "f "];

#[derive(Debug, Default)]
pub struct ObjLoader;

/// Accumulates one output mesh in verbose layout.
struct MeshBuilder {
    name: String,
    material: Option<String>,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    uvs: Vec<Vec3>,
    any_normal: bool,
    any_uv: bool,
    faces: Vec<Face>,
}

impl MeshBuilder {
    fn new(name: &str, material: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            material,
            positions: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            any_normal: false,
            any_uv: false,
            faces: Vec::new(),
        }
    }

    fn build(self, material_index: u32) -> Mesh {
        let mut mesh = Mesh::new(self.name);
        mesh.positions = self.positions;
        if self.any_normal {
            mesh.normals = self.normals;
        }
        if self.any_uv {
            mesh.uvs[0] = self.uvs;
            mesh.uv_components[0] = 2;
        }
        mesh.faces = self.faces;
        mesh.material_index = material_index;
        mesh.update_primitive_types();
        mesh
    }
}

/// One `v/vt/vn` reference, already resolved to zero-based pool indices.
struct FaceVertex {
    position: usize,
    uv: Option<usize>,
    normal: Option<usize>,
}

impl SceneLoader for ObjLoader {
    fn name(&self) -> &'static str {
        "obj"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["obj"]
    }

    fn can_read(&self, path: &str, io: Option<&dyn IoSystem>, check_sig: bool) -> bool {
        if !check_sig {
            return simple_extension_check(path, self.extensions());
        }
        match io {
            Some(io) => {
                search_file_header_for_token(io, path, SIGNATURE_TOKENS, 200).unwrap_or(false)
            }
            None => simple_extension_check(path, self.extensions()),
        }
    }

    fn intern_read(&self, path: &str, io: &dyn IoSystem) -> Result<Scene> {
        let mut stream = io.open(path)?;
        let bytes = read_to_end(&mut *stream)?;
        let text = std::str::from_utf8(&bytes)
            .map_err(|_| ImportError::Decode(format!("OBJ: {path} is not valid UTF-8")))?;

        let mut positions: Vec<Vec3> = Vec::new();
        let mut normals: Vec<Vec3> = Vec::new();
        let mut uvs: Vec<Vec3> = Vec::new();

        let mut material_names: Vec<String> = Vec::new();
        let mut builders: Vec<MeshBuilder> = Vec::new();
        let mut current = MeshBuilder::new("default", None);

        for (line_no, raw_line) in text.lines().enumerate() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let mut tokens = line.split_whitespace();
            let Some(keyword) = tokens.next() else {
                continue;
            };

            match keyword {
                "v" => positions.push(parse_vec3(&mut tokens, line_no)?),
                "vn" => normals.push(parse_vec3(&mut tokens, line_no)?),
                "vt" => {
                    let u = parse_float(tokens.next(), line_no)?;
                    let v = tokens.next().map_or(Ok(0.0), |t| {
                        parse_float(Some(t), line_no)
                    })?;
                    uvs.push(Vec3::new(u, v, 0.0));
                }
                "o" | "g" => {
                    let name = tokens.next().unwrap_or("default").to_string();
                    flush(&mut builders, &mut current);
                    current = MeshBuilder::new(&name, None);
                }
                "usemtl" => {
                    let material = tokens.next().unwrap_or("default").to_string();
                    if !material_names.contains(&material) {
                        material_names.push(material.clone());
                    }
                    if current.material.as_deref() != Some(material.as_str()) {
                        let name = current.name.clone();
                        flush(&mut builders, &mut current);
                        current = MeshBuilder::new(&name, Some(material));
                    }
                }
                "f" => {
                    let mut face_vertices = Vec::new();
                    for token in tokens {
                        face_vertices.push(parse_face_vertex(
                            token,
                            positions.len(),
                            uvs.len(),
                            normals.len(),
                            line_no,
                        )?);
                    }
                    if face_vertices.len() < 3 {
                        return Err(ImportError::Decode(format!(
                            "OBJ: face with fewer than 3 vertices in line {}",
                            line_no + 1
                        )));
                    }
                    emit_face(&mut current, &face_vertices, &positions, &uvs, &normals);
                }
                // mtllib, s, and other statements carry no geometry
                _ => {}
            }
        }
        flush(&mut builders, &mut current);

        if builders.is_empty() {
            return Err(ImportError::Decode(format!(
                "OBJ: {path} contains no faces"
            )));
        }

        let mut scene = Scene::new();
        for name in &material_names {
            let mut material = Material::new();
            material.set_string(keys::NAME, name.clone());
            scene.materials.push(material);
        }

        let root = scene.root();
        for builder in builders {
            let material_index = builder
                .material
                .as_ref()
                .and_then(|name| material_names.iter().position(|m| m == name))
                .unwrap_or(0) as u32;
            let node = scene.create_child_node(root, builder.name.clone());
            let mesh_index = scene.meshes.len() as u32;
            scene.meshes.push(builder.build(material_index));
            scene.nodes[node].mesh_indices.push(mesh_index);
        }
        Ok(scene)
    }
}

fn flush(builders: &mut Vec<MeshBuilder>, current: &mut MeshBuilder) {
    if !current.faces.is_empty() {
        let name = current.name.clone();
        builders.push(std::mem::replace(current, MeshBuilder::new(&name, None)));
    }
}

fn emit_face(
    builder: &mut MeshBuilder,
    face_vertices: &[FaceVertex],
    positions: &[Vec3],
    uvs: &[Vec3],
    normals: &[Vec3],
) {
    let base = builder.positions.len() as u32;
    for fv in face_vertices {
        builder.positions.push(positions[fv.position]);
        match fv.uv {
            Some(i) => {
                builder.uvs.push(uvs[i]);
                builder.any_uv = true;
            }
            None => builder.uvs.push(Vec3::ZERO),
        }
        match fv.normal {
            Some(i) => {
                builder.normals.push(normals[i]);
                builder.any_normal = true;
            }
            None => builder.normals.push(Vec3::ZERO),
        }
    }
    builder
        .faces
        .push(Face::new(base..base + face_vertices.len() as u32));
}

fn parse_face_vertex(
    token: &str,
    position_count: usize,
    uv_count: usize,
    normal_count: usize,
    line_no: usize,
) -> Result<FaceVertex> {
    let mut parts = token.split('/');
    let position = resolve_index(parts.next(), position_count, line_no)?
        .ok_or_else(|| bad_line("missing vertex index", line_no))?;
    let uv = resolve_index(parts.next(), uv_count, line_no)?;
    let normal = resolve_index(parts.next(), normal_count, line_no)?;
    Ok(FaceVertex {
        position,
        uv,
        normal,
    })
}

/// Resolves a 1-based (or negative, pool-relative) OBJ index. An absent or
/// empty component resolves to `None`.
fn resolve_index(part: Option<&str>, pool_len: usize, line_no: usize) -> Result<Option<usize>> {
    let Some(part) = part else { return Ok(None) };
    if part.is_empty() {
        return Ok(None);
    }
    let raw: i64 = part
        .parse()
        .map_err(|_| bad_line("malformed index", line_no))?;
    let resolved = if raw > 0 {
        (raw - 1) as usize
    } else if raw < 0 {
        let back = (-raw) as usize;
        if back > pool_len {
            return Err(bad_line("relative index out of range", line_no));
        }
        pool_len - back
    } else {
        return Err(bad_line("index 0 is invalid", line_no));
    };
    if resolved >= pool_len {
        return Err(bad_line("index out of range", line_no));
    }
    Ok(Some(resolved))
}

fn parse_vec3(tokens: &mut std::str::SplitWhitespace<'_>, line_no: usize) -> Result<Vec3> {
    let x = parse_float(tokens.next(), line_no)?;
    let y = parse_float(tokens.next(), line_no)?;
    let z = parse_float(tokens.next(), line_no)?;
    Ok(Vec3::new(x, y, z))
}

fn parse_float(token: Option<&str>, line_no: usize) -> Result<f32> {
    token
        .ok_or_else(|| bad_line("missing component", line_no))?
        .parse()
        .map_err(|_| bad_line("malformed number", line_no))
}

fn bad_line(what: &str, line_no: usize) -> ImportError {
    ImportError::Decode(format!("OBJ: {what} in line {}", line_no + 1))
}
