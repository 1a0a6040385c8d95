//! Wavefront OBJ reader/writer. Polygons are fan-triangulated; texture
//! coordinates and normals are stored per vertex position index.

use std::fmt::Write as _;
use std::path::Path;

use crate::engine::components::mesh::{Mesh, MeshError};
use crate::engine::utils::math::{Vector2, Vector3};

struct Corner {
    vertex: u32,
    tex_coord: Option<usize>,
    normal: Option<usize>,
}

fn parse_floats<'a>(tokens: impl Iterator<Item = &'a str>, line_no: usize) -> Result<Vec<f32>, MeshError> {
    tokens
        .map(|t| {
            t.parse::<f32>()
                .map_err(|_| MeshError::Parse(format!("line {}: invalid number '{}'", line_no, t)))
        })
        .collect()
}

/// Resolves a 1-based (or negative, relative) OBJ index into a 0-based one.
fn resolve_index(token: &str, count: usize, line_no: usize) -> Result<usize, MeshError> {
    let raw: i64 = token
        .parse()
        .map_err(|_| MeshError::Parse(format!("line {}: invalid index '{}'", line_no, token)))?;
    let resolved = match raw {
        0 => None,
        r if r > 0 => Some(r - 1).filter(|v| *v < count as i64),
        r => Some(count as i64 + r).filter(|v| *v >= 0),
    };
    resolved
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| MeshError::Parse(format!("line {}: index {} out of range", line_no, raw)))
}

fn parse_corner(token: &str, mesh: &Mesh, n_tc: usize, n_nrm: usize, line_no: usize) -> Result<Corner, MeshError> {
    let mut parts = token.split('/');
    let vertex = resolve_index(parts.next().unwrap_or_default(), mesh.vertex.len(), line_no)?;
    let tex_coord = match parts.next() {
        Some(t) if !t.is_empty() => Some(resolve_index(t, n_tc, line_no)?),
        _ => None,
    };
    let normal = match parts.next() {
        Some(n) if !n.is_empty() => Some(resolve_index(n, n_nrm, line_no)?),
        _ => None,
    };
    let vertex = u32::try_from(vertex)
        .map_err(|_| MeshError::Parse(format!("line {}: vertex index too large", line_no)))?;
    Ok(Corner { vertex, tex_coord, normal })
}

pub fn parse(text: &str, mesh: &mut Mesh) -> Result<(), MeshError> {
    let mut tex_coords: Vec<Vector2> = Vec::new();
    let mut normals: Vec<Vector3> = Vec::new();
    let mut colors: Vec<Vector3> = Vec::new();
    let mut corners: Vec<Corner> = Vec::new();

    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };
        match keyword {
            "v" => {
                let values = parse_floats(tokens, line_no)?;
                if values.len() < 3 {
                    return Err(MeshError::Parse(format!("line {}: vertex needs 3 coordinates", line_no)));
                }
                mesh.vertex.push(Vector3::new(values[0], values[1], values[2]));
                if values.len() >= 6 {
                    colors.push(Vector3::new(values[3], values[4], values[5]));
                }
            }
            "vt" => {
                let values = parse_floats(tokens, line_no)?;
                if values.len() < 2 {
                    return Err(MeshError::Parse(format!("line {}: texture coordinate needs 2 values", line_no)));
                }
                tex_coords.push(Vector2::new(values[0], values[1]));
            }
            "vn" => {
                let values = parse_floats(tokens, line_no)?;
                if values.len() < 3 {
                    return Err(MeshError::Parse(format!("line {}: normal needs 3 values", line_no)));
                }
                normals.push(Vector3::new(values[0], values[1], values[2]));
            }
            "f" => {
                let face = tokens
                    .map(|t| parse_corner(t, mesh, tex_coords.len(), normals.len(), line_no))
                    .collect::<Result<Vec<_>, _>>()?;
                if face.len() < 3 {
                    return Err(MeshError::Parse(format!("line {}: face with fewer than 3 vertices", line_no)));
                }
                for k in 1..face.len() - 1 {
                    mesh.triangle.push([face[0].vertex, face[k].vertex, face[k + 1].vertex]);
                }
                corners.extend(face);
            }
            _ => {}
        }
    }

    let n = mesh.vertex.len();
    if colors.len() == n && n > 0 {
        mesh.vertex_color = colors;
    }
    if corners.iter().any(|c| c.tex_coord.is_some()) {
        mesh.tex_coord = vec![Vector2::zero(); n];
        for c in corners.iter() {
            if let (Some(t), Some(slot)) = (c.tex_coord, mesh.tex_coord.get_mut(c.vertex as usize)) {
                *slot = tex_coords[t];
            }
        }
    }
    if corners.iter().any(|c| c.normal.is_some()) {
        mesh.normal = vec![Vector3::zero(); n];
        for c in corners.iter() {
            if let (Some(k), Some(slot)) = (c.normal, mesh.normal.get_mut(c.vertex as usize)) {
                *slot = normals[k];
            }
        }
    }
    Ok(())
}

pub fn read(path: &Path, mesh: &mut Mesh) -> Result<(), MeshError> {
    let text = std::fs::read_to_string(path)?;
    parse(&text, mesh)
}

pub fn to_string(mesh: &Mesh) -> String {
    let n = mesh.vertex.len();
    let has_color = mesh.vertex_color.len() == n && n > 0;
    let has_tc = mesh.tex_coord.len() == n && n > 0;
    let has_nrm = mesh.normal.len() == n && n > 0;

    let mut out = String::new();
    let _ = writeln!(out, "# {} vertices, {} triangles", n, mesh.triangle.len());
    for (i, v) in mesh.vertex.iter().enumerate() {
        if has_color {
            let c = mesh.vertex_color[i];
            let _ = writeln!(out, "v {} {} {} {} {} {}", v.x, v.y, v.z, c.x, c.y, c.z);
        } else {
            let _ = writeln!(out, "v {} {} {}", v.x, v.y, v.z);
        }
    }
    if has_tc {
        for t in mesh.tex_coord.iter() {
            let _ = writeln!(out, "vt {} {}", t.x, t.y);
        }
    }
    if has_nrm {
        for nrm in mesh.normal.iter() {
            let _ = writeln!(out, "vn {} {} {}", nrm.x, nrm.y, nrm.z);
        }
    }
    for tri in mesh.triangle.iter() {
        let corners: Vec<String> = tri
            .iter()
            .map(|&i| {
                let k = i + 1;
                match (has_tc, has_nrm) {
                    (true, true) => format!("{k}/{k}/{k}"),
                    (true, false) => format!("{k}/{k}"),
                    (false, true) => format!("{k}//{k}"),
                    (false, false) => format!("{k}"),
                }
            })
            .collect();
        let _ = writeln!(out, "f {}", corners.join(" "));
    }
    out
}

pub fn write(path: &Path, mesh: &Mesh) -> Result<(), MeshError> {
    std::fs::write(path, to_string(mesh))?;
    Ok(())
}
