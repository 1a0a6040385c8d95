//! Plain text triangle soup: a `n_vertex n_triangle` header, then one
//! `x y z` line per vertex, then one `a b c` line (0-based) per triangle.

use std::fmt::Write as _;
use std::path::Path;

use crate::engine::components::mesh::{Mesh, MeshError};
use crate::engine::utils::math::Vector3;

fn next_number<'a, T: std::str::FromStr>(tokens: &mut impl Iterator<Item = &'a str>, what: &str) -> Result<T, MeshError> {
    let token = tokens
        .next()
        .ok_or_else(|| MeshError::Parse(format!("unexpected end of file while reading {}", what)))?;
    token
        .parse()
        .map_err(|_| MeshError::Parse(format!("invalid {} '{}'", what, token)))
}

pub fn parse(text: &str, mesh: &mut Mesh) -> Result<(), MeshError> {
    let mut tokens = text.split_ascii_whitespace();
    let n_vertex: usize = next_number(&mut tokens, "vertex count")?;
    let n_triangle: usize = next_number(&mut tokens, "triangle count")?;

    for _ in 0..n_vertex {
        let x = next_number(&mut tokens, "coordinate")?;
        let y = next_number(&mut tokens, "coordinate")?;
        let z = next_number(&mut tokens, "coordinate")?;
        mesh.vertex.push(Vector3::new(x, y, z));
    }
    for _ in 0..n_triangle {
        let a = next_number(&mut tokens, "index")?;
        let b = next_number(&mut tokens, "index")?;
        let c = next_number(&mut tokens, "index")?;
        mesh.triangle.push([a, b, c]);
    }
    Ok(())
}

pub fn read(path: &Path, mesh: &mut Mesh) -> Result<(), MeshError> {
    let text = std::fs::read_to_string(path)?;
    parse(&text, mesh)
}

pub fn write(path: &Path, mesh: &Mesh) -> Result<(), MeshError> {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", mesh.vertex.len(), mesh.triangle.len());
    for v in mesh.vertex.iter() {
        let _ = writeln!(out, "{} {} {}", v.x, v.y, v.z);
    }
    for [a, b, c] in mesh.triangle.iter() {
        let _ = writeln!(out, "{} {} {}", a, b, c);
    }
    std::fs::write(path, out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_vertices_and_triangles() {
        let mut mesh = Mesh::new();
        parse("4 2\n0 0 0\n1 0 0\n1 1 0\n0 1 0\n0 1 2\n0 2 3\n", &mut mesh).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn short_file_is_an_error() {
        let err = parse("3 1\n0 0 0\n1 0 0\n", &mut Mesh::new()).unwrap_err();
        assert!(matches!(err, MeshError::Parse(_)));
    }

    #[test]
    fn huge_header_count_is_a_parse_error() {
        let err = parse("1000000000000000000 1\n0 0 0\n", &mut Mesh::new()).unwrap_err();
        assert!(matches!(err, MeshError::Parse(_)));
        let err = parse("1 1000000000000000000\n0 0 0\n0 0 0\n", &mut Mesh::new()).unwrap_err();
        assert!(matches!(err, MeshError::Parse(_)));
    }

    #[test]
    fn negative_index_is_rejected() {
        assert!(parse("3 1\n0 0 0\n1 0 0\n0 1 0\n0 -1 2\n", &mut Mesh::new()).is_err());
    }
}
