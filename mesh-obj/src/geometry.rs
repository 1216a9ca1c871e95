//! Normal and tangent generation over the shared vertex pool.
//!
//! Accumulation is sequential by design: the float sums depend on face
//! order, so parallelizing these loops would change the output.

use glam::{Vec2, Vec3};

/// Accumulate area-weighted face normals into `normals` (3 floats per pool
/// vertex), one cross product per triangle added to each corner. Call
/// [`normalize_normals`] once afterwards.
pub fn accumulate_face_normals(vertices: &[f32], indices: &[usize], normals: &mut [f32]) {
    for tri in indices.chunks_exact(3) {
        let (ia, ib, ic) = (tri[0], tri[1], tri[2]);
        let a = Vec3::from_slice(&vertices[ia..ia + 3]);
        let b = Vec3::from_slice(&vertices[ib..ib + 3]);
        let c = Vec3::from_slice(&vertices[ic..ic + 3]);

        // Unnormalized cross product: magnitude carries the area weight.
        let n = (a - b).cross(a - c);

        for &base in &[ia, ib, ic] {
            normals[base] += n.x;
            normals[base + 1] += n.y;
            normals[base + 2] += n.z;
        }
    }
}

/// Normalize every pool normal in place. Zero-length sums stay zero.
pub fn normalize_normals(normals: &mut [f32]) {
    for n in normals.chunks_exact_mut(3) {
        let v = Vec3::new(n[0], n[1], n[2]).normalize_or_zero();
        n[0] = v.x;
        n[1] = v.y;
        n[2] = v.z;
    }
}

/// Accumulate per-triangle tangents/bitangents from UV derivatives into the
/// pool-sized accumulators (3 floats per vertex each). Faces with a
/// degenerate UV basis are skipped.
pub fn accumulate_tangents(
    vertices: &[f32],
    uvs: &[f32],
    vertex_indices: &[usize],
    uv_indices: &[usize],
    tangents: &mut [f32],
    bitangents: &mut [f32],
) {
    for (tri, uv_tri) in vertex_indices
        .chunks_exact(3)
        .zip(uv_indices.chunks_exact(3))
    {
        let (ia, ib, ic) = (tri[0], tri[1], tri[2]);
        let v1 = Vec3::from_slice(&vertices[ia..ia + 3]);
        let v2 = Vec3::from_slice(&vertices[ib..ib + 3]);
        let v3 = Vec3::from_slice(&vertices[ic..ic + 3]);

        let w1 = Vec2::new(uvs[uv_tri[0]], uvs[uv_tri[0] + 1]);
        let w2 = Vec2::new(uvs[uv_tri[1]], uvs[uv_tri[1] + 1]);
        let w3 = Vec2::new(uvs[uv_tri[2]], uvs[uv_tri[2] + 1]);

        let e1 = v2 - v1;
        let e2 = v3 - v1;
        let s = w2 - w1;
        let t = w3 - w1;

        let denom = s.x * t.y - t.x * s.y;
        if denom.abs() < 1e-12 {
            continue;
        }
        let r = 1.0 / denom;

        let sdir = (e1 * t.y - e2 * s.y) * r;
        let tdir = (e2 * s.x - e1 * t.x) * r;

        for &base in &[ia, ib, ic] {
            tangents[base] += sdir.x;
            tangents[base + 1] += sdir.y;
            tangents[base + 2] += sdir.z;
            bitangents[base] += tdir.x;
            bitangents[base + 1] += tdir.y;
            bitangents[base + 2] += tdir.z;
        }
    }
}

/// Gram-Schmidt-orthogonalize the accumulated tangents against the
/// normalized pool normals and resolve handedness. Output is 4 floats per
/// pool vertex: xyz tangent, w = ±1.
pub fn orthogonalize_tangents(
    normals: &[f32],
    tangents: &[f32],
    bitangents: &[f32],
    out: &mut [f32],
) {
    let count = normals.len() / 3;
    for i in 0..count {
        let base = i * 3;
        let n = Vec3::from_slice(&normals[base..base + 3]);
        let t = Vec3::from_slice(&tangents[base..base + 3]);
        let b = Vec3::from_slice(&bitangents[base..base + 3]);

        let orthogonal = (t - n * n.dot(t)).normalize_or_zero();
        let w = if n.cross(t).dot(b) < 0.0 { -1.0 } else { 1.0 };

        let j = i * 4;
        out[j] = orthogonal.x;
        out[j + 1] = orthogonal.y;
        out[j + 2] = orthogonal.z;
        out[j + 3] = w;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One XY-plane triangle: every vertex normal must equal the geometric
    // face normal since only one face touches the pool.
    #[test]
    fn single_triangle_normals_match_face_normal() {
        let vertices = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let indices = [0usize, 3, 6];
        let mut normals = vec![0.0f32; 9];
        accumulate_face_normals(&vertices, &indices, &mut normals);
        normalize_normals(&mut normals);

        // (a-b) x (a-c) = (-1,0,0) x (0,-1,0) = (0,0,1)
        for n in normals.chunks_exact(3) {
            assert!((n[0]).abs() < 1e-6);
            assert!((n[1]).abs() < 1e-6);
            assert!((n[2] - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn tangents_are_orthogonal_to_normals() {
        let vertices = [0.0, 0.0, 0.0, 1.0, 0.0, 0.5, 0.0, 1.0, 0.25];
        let indices = [0usize, 3, 6];
        let uvs = [0.0f32, 0.0, 1.0, 0.0, 0.0, 1.0];
        let uv_indices = [0usize, 2, 4];

        let mut normals = vec![0.0f32; 9];
        accumulate_face_normals(&vertices, &indices, &mut normals);
        normalize_normals(&mut normals);

        let mut tangents = vec![0.0f32; 9];
        let mut bitangents = vec![0.0f32; 9];
        accumulate_tangents(
            &vertices,
            &uvs,
            &indices,
            &uv_indices,
            &mut tangents,
            &mut bitangents,
        );

        let mut out = vec![0.0f32; 12];
        orthogonalize_tangents(&normals, &tangents, &bitangents, &mut out);

        for i in 0..3 {
            let n = Vec3::from_slice(&normals[i * 3..i * 3 + 3]);
            let t = Vec3::new(out[i * 4], out[i * 4 + 1], out[i * 4 + 2]);
            assert!((t.length() - 1.0).abs() < 1e-4, "tangent not unit: {t:?}");
            assert!(n.dot(t).abs() < 1e-4, "tangent not orthogonal: {}", n.dot(t));
            assert!(out[i * 4 + 3].abs() == 1.0);
        }
    }

    #[test]
    fn degenerate_uv_face_is_skipped() {
        let vertices = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let indices = [0usize, 3, 6];
        // All three corners share one UV: no valid derivative basis.
        let uvs = [0.5f32, 0.5];
        let uv_indices = [0usize, 0, 0];
        let mut tangents = vec![0.0f32; 9];
        let mut bitangents = vec![0.0f32; 9];
        accumulate_tangents(
            &vertices,
            &uvs,
            &indices,
            &uv_indices,
            &mut tangents,
            &mut bitangents,
        );
        assert!(tangents.iter().all(|&x| x == 0.0));
    }
}
