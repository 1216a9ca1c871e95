//! OBJ parser: explicit state structs, one pass over the text, then a
//! finalize step that generates normals/tangents and flattens each object
//! into triangle-expanded buffers.

use crate::error::ParseError;
use crate::geometry;

/// One parsed object: flat triangle-expanded attribute arrays plus the name
/// of the material its faces use. No index buffer; every corner is distinct.
#[derive(Debug, Default, Clone)]
pub struct MeshData {
    pub name: String,
    pub material: String,
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    /// xyz tangent + w handedness per vertex.
    pub tangents: Vec<f32>,
    pub uvs: Vec<f32>,
    /// Second UV set (lightmap), already normalized by 1024. May be empty.
    pub uv2s: Vec<f32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }
}

/// Geometry collected for one `o`/`g` scope. Indices are float offsets into
/// the shared pools (vertex index * 3, uv index * 2).
#[derive(Debug, Default)]
struct ObjectState {
    name: String,
    from_declaration: bool,
    smooth: bool,
    materials: Vec<String>,
    vertex_indices: Vec<usize>,
    uv_indices: Vec<usize>,
    uv2s: Vec<f32>,
    has_lines: bool,
}

/// Whole-file parser state: shared attribute pools plus the object list.
#[derive(Debug, Default)]
struct ParserState {
    vertices: Vec<f32>,
    normals: Vec<f32>,
    uvs: Vec<f32>,
    uv2s: Vec<f32>,
    material_libraries: Vec<String>,
    objects: Vec<ObjectState>,
}

impl ParserState {
    fn new() -> Self {
        let mut state = Self::default();
        state.objects.push(ObjectState {
            from_declaration: false,
            smooth: true,
            ..ObjectState::default()
        });
        state
    }

    fn current(&mut self) -> &mut ObjectState {
        self.objects.last_mut().expect("object list never empty")
    }

    /// Start a new `o`/`g` scope. The implicit initial object is renamed in
    /// place; later declarations push a fresh object inheriting the previous
    /// scope's active material.
    fn start_object(&mut self, name: &str) {
        let current = self.current();
        if !current.from_declaration {
            current.name = name.to_string();
            current.from_declaration = true;
            return;
        }
        let inherited = current.materials.last().cloned();
        let smooth = current.smooth;
        self.objects.push(ObjectState {
            name: name.to_string(),
            from_declaration: true,
            smooth,
            materials: inherited.into_iter().collect(),
            ..ObjectState::default()
        });
    }

    fn resolve_index(
        value: i64,
        pool_len: usize,
        components: usize,
        line: usize,
    ) -> Result<usize, ParseError> {
        let count = (pool_len / components) as i64;
        let index = if value > 0 {
            value - 1
        } else if value < 0 {
            value + count
        } else {
            return Err(ParseError::new(line, "index 0 is not a valid OBJ index"));
        };
        if index < 0 || index >= count {
            return Err(ParseError::new(
                line,
                format!("index {value} out of range (pool has {count} entries)"),
            ));
        }
        Ok(index as usize * components)
    }

    fn resolve_vertex(&self, value: i64, line: usize) -> Result<usize, ParseError> {
        Self::resolve_index(value, self.vertices.len(), 3, line)
    }

    fn resolve_uv(&self, value: i64, line: usize) -> Result<usize, ParseError> {
        Self::resolve_index(value, self.uvs.len(), 2, line)
    }

    fn resolve_normal(&self, value: i64, line: usize) -> Result<usize, ParseError> {
        Self::resolve_index(value, self.normals.len(), 3, line)
    }

    fn resolve_uv2(&self, value: i64, line: usize) -> Result<usize, ParseError> {
        Self::resolve_index(value, self.uv2s.len(), 2, line)
    }
}

/// One corner reference of an `f` line.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FaceRef {
    vertex: i64,
    uv: Option<i64>,
    normal: Option<i64>,
    uv2: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FaceFormat {
    Vertex,
    VertexUv,
    VertexNormal,
    VertexUvNormal,
    VertexUvUv2,
}

fn parse_face_ref(token: &str, line: usize) -> Result<(FaceRef, FaceFormat), ParseError> {
    let bad = || ParseError::new(line, format!("unexpected face corner: '{token}'"));
    let parts: Vec<&str> = token.split('/').collect();
    let int = |s: &str| s.parse::<i64>().map_err(|_| bad());
    match parts.as_slice() {
        [v] => Ok((
            FaceRef {
                vertex: int(v)?,
                uv: None,
                normal: None,
                uv2: None,
            },
            FaceFormat::Vertex,
        )),
        [v, t] => Ok((
            FaceRef {
                vertex: int(v)?,
                uv: Some(int(t)?),
                normal: None,
                uv2: None,
            },
            FaceFormat::VertexUv,
        )),
        [v, t, n] if t.is_empty() => Ok((
            FaceRef {
                vertex: int(v)?,
                uv: None,
                normal: Some(int(n)?),
                uv2: None,
            },
            FaceFormat::VertexNormal,
        )),
        [v, t, n] => Ok((
            FaceRef {
                vertex: int(v)?,
                uv: Some(int(t)?),
                normal: Some(int(n)?),
                uv2: None,
            },
            FaceFormat::VertexUvNormal,
        )),
        // v/t//t2: second UV set in the slot a normal would occupy.
        [v, t, empty, t2] if empty.is_empty() => Ok((
            FaceRef {
                vertex: int(v)?,
                uv: Some(int(t)?),
                normal: None,
                uv2: Some(int(t2)?),
            },
            FaceFormat::VertexUvUv2,
        )),
        _ => Err(bad()),
    }
}

fn add_face(state: &mut ParserState, refs: &[FaceRef], line: usize) -> Result<(), ParseError> {
    let v: Vec<usize> = refs
        .iter()
        .map(|r| state.resolve_vertex(r.vertex, line))
        .collect::<Result<_, _>>()?;

    // Triangle, or a quad fanned into two triangles.
    let triangles: Vec<[usize; 3]> = if refs.len() == 3 {
        vec![[v[0], v[1], v[2]]]
    } else {
        vec![[v[0], v[1], v[3]], [v[1], v[2], v[3]]]
    };

    if refs[0].uv.is_some() {
        let uv: Vec<usize> = refs
            .iter()
            .map(|r| state.resolve_uv(r.uv.expect("consistent face format"), line))
            .collect::<Result<_, _>>()?;
        let uv_triangles: Vec<[usize; 3]> = if refs.len() == 3 {
            vec![[uv[0], uv[1], uv[2]]]
        } else {
            vec![[uv[0], uv[1], uv[3]], [uv[1], uv[2], uv[3]]]
        };
        for tri in uv_triangles {
            state.current().uv_indices.extend_from_slice(&tri);
        }
    }

    if refs[0].normal.is_some() {
        // Output normals are generated from faces; parsed references are
        // only resolved so bad indices still fail the load.
        for r in refs {
            state.resolve_normal(r.normal.expect("consistent face format"), line)?;
        }
    }

    if refs[0].uv2.is_some() {
        let uv2: Vec<usize> = refs
            .iter()
            .map(|r| state.resolve_uv2(r.uv2.expect("consistent face format"), line))
            .collect::<Result<_, _>>()?;
        let uv2_triangles: Vec<[usize; 3]> = if refs.len() == 3 {
            vec![[uv2[0], uv2[1], uv2[2]]]
        } else {
            vec![[uv2[0], uv2[1], uv2[3]], [uv2[1], uv2[2], uv2[3]]]
        };
        let pool: Vec<f32> = state.uv2s.clone();
        let object = state.current();
        for tri in uv2_triangles {
            for corner in tri {
                object.uv2s.push(pool[corner] / 1024.0);
                object.uv2s.push(pool[corner + 1] / 1024.0);
            }
        }
    }

    for tri in triangles {
        state.current().vertex_indices.extend_from_slice(&tri);
    }
    Ok(())
}

fn parse_floats(tokens: &[&str], want: usize, line: usize) -> Result<Vec<f32>, ParseError> {
    if tokens.len() < want {
        return Err(ParseError::new(
            line,
            format!("expected {want} components, found {}", tokens.len()),
        ));
    }
    tokens[..want]
        .iter()
        .map(|t| {
            t.parse::<f32>()
                .map_err(|_| ParseError::new(line, format!("bad number: '{t}'")))
        })
        .collect()
}

/// Parse OBJ text into per-object triangle-expanded meshes.
pub fn parse_obj(text: &str) -> Result<Vec<MeshData>, ParseError> {
    let mut state = ParserState::new();

    'lines: for (line_no, raw) in text.lines().enumerate() {
        let line_no = line_no + 1;
        let line = raw.trim_start();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        // Unescaped NUL ends the meaningful content of the file.
        if line.starts_with('\0') {
            break 'lines;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens[0] {
            "v" => {
                let v = parse_floats(&tokens[1..], 3, line_no)?;
                state.vertices.extend_from_slice(&v);
            }
            "vn" => {
                let v = parse_floats(&tokens[1..], 3, line_no)?;
                state.normals.extend_from_slice(&v);
            }
            "vt" => {
                let v = parse_floats(&tokens[1..], 2, line_no)?;
                // V axis flipped: OBJ uses bottom-left origin, textures
                // sample top-left.
                state.uvs.push(v[0]);
                state.uvs.push(-v[1]);
            }
            "vt2" => {
                let v = parse_floats(&tokens[1..], 2, line_no)?;
                state.uv2s.extend_from_slice(&v);
            }
            "f" => {
                let corners = &tokens[1..];
                if corners.len() < 3 || corners.len() > 4 {
                    return Err(ParseError::new(
                        line_no,
                        format!("face must have 3 or 4 corners, found {}", corners.len()),
                    ));
                }
                let mut refs = Vec::with_capacity(corners.len());
                let mut format = None;
                for corner in corners {
                    let (r, f) = parse_face_ref(corner, line_no)?;
                    if *format.get_or_insert(f) != f {
                        return Err(ParseError::new(
                            line_no,
                            format!("mixed face corner formats: '{line}'"),
                        ));
                    }
                    refs.push(r);
                }
                add_face(&mut state, &refs, line_no)?;
            }
            "l" => {
                // Polyline records are accepted but produce no triangles;
                // validate the indices and move on.
                for part in &tokens[1..] {
                    for piece in part.split('/').filter(|p| !p.is_empty()) {
                        piece.parse::<i64>().map_err(|_| {
                            ParseError::new(line_no, format!("bad line record: '{line}'"))
                        })?;
                    }
                }
                state.current().has_lines = true;
            }
            "o" | "g" => {
                let name = line[1..].trim();
                state.start_object(name);
            }
            "usemtl" => {
                let name = line["usemtl".len()..].trim().to_string();
                state.current().materials.push(name);
            }
            "mtllib" => {
                let name = line["mtllib".len()..].trim().to_string();
                state.material_libraries.push(name);
            }
            "s" => {
                let smooth = match tokens.get(1).copied() {
                    Some("1") | Some("on") => true,
                    Some("off") => false,
                    Some(v) if !v.is_empty() && v.chars().all(|c| c.is_ascii_digit()) => false,
                    _ => {
                        return Err(ParseError::new(
                            line_no,
                            format!("unexpected smoothing value: '{line}'"),
                        ))
                    }
                };
                // Smoothing is recorded but does not change normal
                // generation, which always face-averages.
                state.current().smooth = smooth;
            }
            _ => {
                return Err(ParseError::new(line_no, format!("unexpected line: '{line}'")));
            }
        }
    }

    finalize(state)
}

/// Generate pool-wide normals and tangent frames, then flatten every object
/// that produced faces.
fn finalize(state: ParserState) -> Result<Vec<MeshData>, ParseError> {
    let pool_len = state.vertices.len();
    let vertex_count = pool_len / 3;

    let mut pool_normals = vec![0.0f32; pool_len];
    for object in &state.objects {
        geometry::accumulate_face_normals(
            &state.vertices,
            &object.vertex_indices,
            &mut pool_normals,
        );
    }
    geometry::normalize_normals(&mut pool_normals);

    let mut tangent_acc = vec![0.0f32; pool_len];
    let mut bitangent_acc = vec![0.0f32; pool_len];
    for object in &state.objects {
        if object.uv_indices.len() == object.vertex_indices.len() {
            geometry::accumulate_tangents(
                &state.vertices,
                &state.uvs,
                &object.vertex_indices,
                &object.uv_indices,
                &mut tangent_acc,
                &mut bitangent_acc,
            );
        }
    }
    let mut pool_tangents = vec![0.0f32; vertex_count * 4];
    geometry::orthogonalize_tangents(
        &pool_normals,
        &tangent_acc,
        &bitangent_acc,
        &mut pool_tangents,
    );

    let mut meshes = Vec::new();
    for object in &state.objects {
        // o/g declarations without faces (or line-only scopes) are dropped.
        if object.vertex_indices.is_empty() {
            continue;
        }
        let corner_count = object.vertex_indices.len();
        let has_uvs = object.uv_indices.len() == corner_count;
        if !has_uvs && !object.uv_indices.is_empty() {
            log::warn!(
                "object '{}': {} of {} corners have UVs; emitting zeroed UVs and tangents",
                object.name,
                object.uv_indices.len(),
                corner_count
            );
        }

        let mut mesh = MeshData {
            name: object.name.clone(),
            material: object.materials.first().cloned().unwrap_or_default(),
            positions: Vec::with_capacity(corner_count * 3),
            normals: Vec::with_capacity(corner_count * 3),
            tangents: Vec::with_capacity(corner_count * 4),
            uvs: Vec::with_capacity(corner_count * 2),
            uv2s: object.uv2s.clone(),
        };

        for (corner, &base) in object.vertex_indices.iter().enumerate() {
            mesh.positions
                .extend_from_slice(&state.vertices[base..base + 3]);
            mesh.normals
                .extend_from_slice(&pool_normals[base..base + 3]);
            let t = base / 3 * 4;
            mesh.tangents
                .extend_from_slice(&pool_tangents[t..t + 4]);
            if has_uvs {
                let uv = object.uv_indices[corner];
                mesh.uvs.extend_from_slice(&state.uvs[uv..uv + 2]);
            } else {
                mesh.uvs.extend_from_slice(&[0.0, 0.0]);
            }
        }

        meshes.push(mesh);
    }
    Ok(meshes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    const TRIANGLE: &str = "\
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vt 1 0
vt 0 1
vn 0 0 1
vn 0 0 1
vn 0 0 1
f 1/1/1 2/2/2 3/3/3
";

    #[test]
    fn face_line_produces_one_triangle_with_resolved_attributes() {
        let meshes = parse_obj(TRIANGLE).unwrap();
        assert_eq!(meshes.len(), 1);
        let mesh = &meshes[0];
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.positions, vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        // vt v-coordinates are negated on read.
        assert_eq!(mesh.uvs, vec![0.0, -0.0, 1.0, -0.0, 0.0, -1.0]);
    }

    #[test]
    fn generated_normals_equal_face_normal_for_lone_triangle() {
        let meshes = parse_obj(TRIANGLE).unwrap();
        let mesh = &meshes[0];
        for n in mesh.normals.chunks_exact(3) {
            let n = Vec3::new(n[0], n[1], n[2]);
            assert!((n - Vec3::Z).length() < 1e-6, "normal {n:?}");
        }
    }

    #[test]
    fn tangents_orthogonal_to_normals() {
        let meshes = parse_obj(TRIANGLE).unwrap();
        let mesh = &meshes[0];
        for (n, t) in mesh
            .normals
            .chunks_exact(3)
            .zip(mesh.tangents.chunks_exact(4))
        {
            let n = Vec3::new(n[0], n[1], n[2]);
            let t3 = Vec3::new(t[0], t[1], t[2]);
            assert!(n.dot(t3).abs() < 1e-4);
            assert!(t[3] == 1.0 || t[3] == -1.0);
        }
    }

    #[test]
    fn negative_indices_resolve_from_pool_end() {
        let text = "\
v 0 0 0
v 1 0 0
v 0 1 0
f -3 -2 -1
";
        let meshes = parse_obj(text).unwrap();
        assert_eq!(meshes[0].positions[0..3], [0.0, 0.0, 0.0]);
        assert_eq!(meshes[0].positions[6..9], [0.0, 1.0, 0.0]);
    }

    #[test]
    fn quad_fans_into_two_triangles() {
        let text = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
f 1 2 3 4
";
        let meshes = parse_obj(text).unwrap();
        assert_eq!(meshes[0].vertex_count(), 6);
        // Fan order: (a, b, d), (b, c, d).
        assert_eq!(meshes[0].positions[0..3], [0.0, 0.0, 0.0]);
        assert_eq!(meshes[0].positions[6..9], [0.0, 1.0, 0.0]);
        assert_eq!(meshes[0].positions[9..12], [1.0, 0.0, 0.0]);
    }

    #[test]
    fn objects_split_on_o_lines_and_carry_materials() {
        let text = "\
mtllib scene.mtl
o first
v 0 0 0
v 1 0 0
v 0 1 0
usemtl wood
f 1 2 3
o second
v 0 0 1
v 1 0 1
v 0 1 1
f 4 5 6
";
        let meshes = parse_obj(text).unwrap();
        assert_eq!(meshes.len(), 2);
        assert_eq!(meshes[0].name, "first");
        assert_eq!(meshes[0].material, "wood");
        // Material inherited by the next object until a new usemtl.
        assert_eq!(meshes[1].material, "wood");
    }

    #[test]
    fn malformed_line_fails_with_line_number() {
        let text = "v 0 0 0\nbogus 1 2 3\n";
        let err = parse_obj(text).unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn mixed_face_formats_rejected() {
        let text = "\
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
f 1/1 2 3
";
        assert!(parse_obj(text).is_err());
    }

    #[test]
    fn index_zero_rejected() {
        let text = "v 0 0 0\nf 0 0 0\n";
        assert!(parse_obj(text).is_err());
    }

    #[test]
    fn nul_line_ends_content() {
        let text = "\
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
\0garbage that would not parse
";
        let meshes = parse_obj(text).unwrap();
        assert_eq!(meshes.len(), 1);
    }

    #[test]
    fn smoothing_flag_parsed_without_changing_normals() {
        let text = "\
s off
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
";
        let meshes = parse_obj(text).unwrap();
        // Normals still face-averaged even with smoothing off.
        assert!((meshes[0].normals[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn uv2_faces_emit_normalized_second_uv_set() {
        let text = "\
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vt 1 0
vt 0 1
vt2 512 1024
vt2 0 0
vt2 1024 512
f 1/1//1 2/2//2 3/3//3
";
        let meshes = parse_obj(text).unwrap();
        let uv2s = &meshes[0].uv2s;
        assert_eq!(uv2s.len(), 6);
        assert!((uv2s[0] - 0.5).abs() < 1e-6);
        assert!((uv2s[1] - 1.0).abs() < 1e-6);
    }
}
