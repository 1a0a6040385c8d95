//! Stanford PLY reader (ascii, binary little and big endian) and ascii writer.

use std::fmt::Write as _;
use std::path::Path;

use crate::engine::components::mesh::{Mesh, MeshError};
use crate::engine::utils::math::{Vector2, Vector3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl Scalar {
    fn parse(name: &str) -> Result<Self, MeshError> {
        Ok(match name {
            "char" | "int8" => Scalar::I8,
            "uchar" | "uint8" => Scalar::U8,
            "short" | "int16" => Scalar::I16,
            "ushort" | "uint16" => Scalar::U16,
            "int" | "int32" => Scalar::I32,
            "uint" | "uint32" => Scalar::U32,
            "float" | "float32" => Scalar::F32,
            "double" | "float64" => Scalar::F64,
            _ => return Err(MeshError::Parse(format!("unknown PLY property type '{}'", name))),
        })
    }

    fn size(self) -> usize {
        match self {
            Scalar::I8 | Scalar::U8 => 1,
            Scalar::I16 | Scalar::U16 => 2,
            Scalar::I32 | Scalar::U32 | Scalar::F32 => 4,
            Scalar::F64 => 8,
        }
    }
}

#[derive(Debug, Clone)]
enum Property {
    Scalar { name: String, ty: Scalar },
    List { name: String, count: Scalar, item: Scalar },
}

#[derive(Debug, Clone)]
struct Element {
    name: String,
    count: usize,
    properties: Vec<Property>,
}

struct Header {
    encoding: Encoding,
    elements: Vec<Element>,
    body_offset: usize,
}

fn parse_header(bytes: &[u8]) -> Result<Header, MeshError> {
    let mut offset = 0;
    let mut encoding = None;
    let mut elements: Vec<Element> = Vec::new();
    let mut first = true;

    loop {
        let end = bytes[offset..]
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| MeshError::Parse("PLY header is not terminated by end_header".into()))?;
        let line = std::str::from_utf8(&bytes[offset..offset + end])
            .map_err(|_| MeshError::Parse("PLY header is not valid text".into()))?
            .trim();
        offset += end + 1;

        if first {
            if line != "ply" {
                return Err(MeshError::Parse("missing 'ply' magic".into()));
            }
            first = false;
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            ["format", kind, _version] => {
                encoding = Some(match *kind {
                    "ascii" => Encoding::Ascii,
                    "binary_little_endian" => Encoding::BinaryLittleEndian,
                    "binary_big_endian" => Encoding::BinaryBigEndian,
                    other => return Err(MeshError::Parse(format!("unknown PLY format '{}'", other))),
                });
            }
            ["element", name, count] => {
                let count = count
                    .parse()
                    .map_err(|_| MeshError::Parse(format!("invalid element count '{}'", count)))?;
                elements.push(Element { name: name.to_string(), count, properties: Vec::new() });
            }
            ["property", "list", count, item, name] => {
                let element = elements
                    .last_mut()
                    .ok_or_else(|| MeshError::Parse("property before any element".into()))?;
                element.properties.push(Property::List {
                    name: name.to_string(),
                    count: Scalar::parse(count)?,
                    item: Scalar::parse(item)?,
                });
            }
            ["property", ty, name] => {
                let element = elements
                    .last_mut()
                    .ok_or_else(|| MeshError::Parse("property before any element".into()))?;
                element.properties.push(Property::Scalar { name: name.to_string(), ty: Scalar::parse(ty)? });
            }
            ["end_header"] => break,
            ["comment", ..] | ["obj_info", ..] | [] => {}
            _ => return Err(MeshError::Parse(format!("unexpected PLY header line '{}'", line))),
        }
    }

    let encoding = encoding.ok_or_else(|| MeshError::Parse("PLY header has no format line".into()))?;
    Ok(Header { encoding, elements, body_offset: offset })
}

/// Sequential value reader over the PLY body.
enum Body<'a> {
    Ascii(std::str::SplitAsciiWhitespace<'a>),
    Binary { data: &'a [u8], pos: usize, big_endian: bool },
}

impl Body<'_> {
    fn read(&mut self, ty: Scalar) -> Result<f64, MeshError> {
        match self {
            Body::Ascii(tokens) => {
                let token = tokens
                    .next()
                    .ok_or_else(|| MeshError::Parse("unexpected end of PLY data".into()))?;
                token
                    .parse::<f64>()
                    .map_err(|_| MeshError::Parse(format!("invalid PLY value '{}'", token)))
            }
            Body::Binary { data, pos, big_endian } => {
                let size = ty.size();
                let raw = data
                    .get(*pos..*pos + size)
                    .ok_or_else(|| MeshError::Parse("unexpected end of PLY data".into()))?;
                *pos += size;
                let mut buf = [0u8; 8];
                buf[..size].copy_from_slice(raw);
                if *big_endian {
                    buf[..size].reverse();
                }
                Ok(match ty {
                    Scalar::I8 => i8::from_le_bytes([buf[0]]) as f64,
                    Scalar::U8 => buf[0] as f64,
                    Scalar::I16 => i16::from_le_bytes([buf[0], buf[1]]) as f64,
                    Scalar::U16 => u16::from_le_bytes([buf[0], buf[1]]) as f64,
                    Scalar::I32 => i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
                    Scalar::U32 => u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
                    Scalar::F32 => f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
                    Scalar::F64 => f64::from_le_bytes(buf),
                })
            }
        }
    }
}

fn property_value(names: &[&str], props: &[(String, f64)]) -> Option<f64> {
    props.iter().find(|(n, _)| names.contains(&n.as_str())).map(|(_, v)| *v)
}

fn color_channel(value: f64, ty: Option<Scalar>) -> f32 {
    match ty {
        Some(Scalar::F32) | Some(Scalar::F64) => value as f32,
        _ => (value / 255.0) as f32,
    }
}

pub fn parse(bytes: &[u8], mesh: &mut Mesh) -> Result<(), MeshError> {
    let header = parse_header(bytes)?;
    let rest = &bytes[header.body_offset..];
    let mut body = match header.encoding {
        Encoding::Ascii => Body::Ascii(
            std::str::from_utf8(rest)
                .map_err(|_| MeshError::Parse("ascii PLY body is not valid text".into()))?
                .split_ascii_whitespace(),
        ),
        Encoding::BinaryLittleEndian => Body::Binary { data: rest, pos: 0, big_endian: false },
        Encoding::BinaryBigEndian => Body::Binary { data: rest, pos: 0, big_endian: true },
    };

    for element in header.elements.iter() {
        let has = |names: &[&str]| {
            element
                .properties
                .iter()
                .any(|p| matches!(p, Property::Scalar { name, .. } if names.contains(&name.as_str())))
        };
        let color_type = element.properties.iter().find_map(|p| match p {
            Property::Scalar { name, ty } if name == "red" => Some(*ty),
            _ => None,
        });
        let has_normal = has(&["nx"]);
        let has_tc = has(&["u", "s", "texture_u", "texture_s"]);
        let has_color = color_type.is_some();

        for _ in 0..element.count {
            let mut scalars: Vec<(String, f64)> = Vec::with_capacity(element.properties.len());
            let mut lists: Vec<(String, Vec<f64>)> = Vec::new();
            for prop in element.properties.iter() {
                match prop {
                    Property::Scalar { name, ty } => scalars.push((name.clone(), body.read(*ty)?)),
                    Property::List { name, count, item } => {
                        let n = body.read(*count)? as usize;
                        let values = (0..n).map(|_| body.read(*item)).collect::<Result<Vec<_>, _>>()?;
                        lists.push((name.clone(), values));
                    }
                }
            }

            match element.name.as_str() {
                "vertex" => {
                    let get = |names: &[&str]| property_value(names, &scalars).unwrap_or(0.0) as f32;
                    mesh.vertex.push(Vector3::new(get(&["x"]), get(&["y"]), get(&["z"])));
                    if has_normal {
                        mesh.normal.push(Vector3::new(get(&["nx"]), get(&["ny"]), get(&["nz"])));
                    }
                    if has_tc {
                        mesh.tex_coord.push(Vector2::new(
                            get(&["u", "s", "texture_u", "texture_s"]),
                            get(&["v", "t", "texture_v", "texture_t"]),
                        ));
                    }
                    if has_color {
                        let channel = |name: &str| {
                            color_channel(property_value(&[name], &scalars).unwrap_or(0.0), color_type)
                        };
                        mesh.vertex_color.push(Vector3::new(channel("red"), channel("green"), channel("blue")));
                    }
                }
                "face" => {
                    let indices = lists
                        .iter()
                        .find(|(n, _)| n == "vertex_indices" || n == "vertex_index")
                        .map(|(_, v)| v)
                        .ok_or_else(|| MeshError::Parse("face element without vertex_indices".into()))?;
                    if indices.len() < 3 {
                        return Err(MeshError::Parse("face with fewer than 3 vertices".into()));
                    }
                    let index = |k: usize| -> Result<u32, MeshError> {
                        let v = indices[k];
                        if v < 0.0 || v > u32::MAX as f64 {
                            return Err(MeshError::Parse(format!("invalid vertex index {}", v)));
                        }
                        Ok(v as u32)
                    };
                    for k in 1..indices.len() - 1 {
                        mesh.triangle.push([index(0)?, index(k)?, index(k + 1)?]);
                    }
                }
                _ => {}
            }
        }
    }
    Ok(())
}

pub fn read(path: &Path, mesh: &mut Mesh) -> Result<(), MeshError> {
    let bytes = std::fs::read(path)?;
    parse(&bytes, mesh)
}

pub fn to_string(mesh: &Mesh) -> String {
    let n = mesh.vertex.len();
    let has_nrm = mesh.normal.len() == n && n > 0;
    let has_tc = mesh.tex_coord.len() == n && n > 0;
    let has_color = mesh.vertex_color.len() == n && n > 0;

    let mut out = String::new();
    let _ = writeln!(out, "ply\nformat ascii 1.0\ncomment oglkit");
    let _ = writeln!(out, "element vertex {}", n);
    let _ = writeln!(out, "property float x\nproperty float y\nproperty float z");
    if has_nrm {
        let _ = writeln!(out, "property float nx\nproperty float ny\nproperty float nz");
    }
    if has_tc {
        let _ = writeln!(out, "property float u\nproperty float v");
    }
    if has_color {
        let _ = writeln!(out, "property uchar red\nproperty uchar green\nproperty uchar blue");
    }
    let _ = writeln!(out, "element face {}", mesh.triangle.len());
    let _ = writeln!(out, "property list uchar int vertex_indices\nend_header");

    for i in 0..n {
        let v = mesh.vertex[i];
        let _ = write!(out, "{} {} {}", v.x, v.y, v.z);
        if has_nrm {
            let nrm = mesh.normal[i];
            let _ = write!(out, " {} {} {}", nrm.x, nrm.y, nrm.z);
        }
        if has_tc {
            let t = mesh.tex_coord[i];
            let _ = write!(out, " {} {}", t.x, t.y);
        }
        if has_color {
            let c = mesh.vertex_color[i];
            let byte = |x: f32| (x.clamp(0.0, 1.0) * 255.0).round() as u8;
            let _ = write!(out, " {} {} {}", byte(c.x), byte(c.y), byte(c.z));
        }
        out.push('\n');
    }
    for [a, b, c] in mesh.triangle.iter() {
        let _ = writeln!(out, "3 {} {} {}", a, b, c);
    }
    out
}

pub fn write(path: &Path, mesh: &Mesh) -> Result<(), MeshError> {
    std::fs::write(path, to_string(mesh))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_triangle(big_endian: bool) -> Vec<u8> {
        let format = if big_endian { "binary_big_endian" } else { "binary_little_endian" };
        let mut bytes = format!(
            "ply\nformat {} 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\n\
             element face 1\nproperty list uchar int vertex_indices\nend_header\n",
            format
        )
        .into_bytes();
        let coords = [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        for c in coords {
            bytes.extend(if big_endian { c.to_be_bytes() } else { c.to_le_bytes() });
        }
        bytes.push(3);
        for i in [0i32, 1, 2] {
            bytes.extend(if big_endian { i.to_be_bytes() } else { i.to_le_bytes() });
        }
        bytes
    }

    #[test]
    fn reads_binary_little_and_big_endian() {
        for big_endian in [false, true] {
            let mut mesh = Mesh::new();
            parse(&binary_triangle(big_endian), &mut mesh).unwrap();
            assert_eq!(mesh.vertex[1], Vector3::new(1.0, 0.0, 0.0));
            assert_eq!(mesh.vertex[2], Vector3::new(0.0, 1.0, 0.0));
            assert_eq!(mesh.triangle, vec![[0, 1, 2]]);
        }
    }

    #[test]
    fn ascii_colors_are_normalized() {
        let text = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\n\
                    property uchar red\nproperty uchar green\nproperty uchar blue\nelement face 0\n\
                    property list uchar int vertex_indices\nend_header\n0 0 0 255 0 51\n";
        let mut mesh = Mesh::new();
        parse(text.as_bytes(), &mut mesh).unwrap();
        assert_eq!(mesh.vertex_color, vec![Vector3::new(1.0, 0.0, 0.2)]);
    }

    #[test]
    fn unknown_elements_are_skipped() {
        let text = "ply\nformat ascii 1.0\ncomment made by hand\nelement vertex 3\nproperty float x\n\
                    property float y\nproperty float z\nelement edge 1\nproperty int vertex1\nproperty int vertex2\n\
                    element face 1\nproperty list uchar uint vertex_indices\nend_header\n\
                    0 0 0\n1 0 0\n0 1 0\n0 1\n3 0 1 2\n";
        let mut mesh = Mesh::new();
        parse(text.as_bytes(), &mut mesh).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle, vec![[0, 1, 2]]);
    }

    #[test]
    fn truncated_body_is_an_error() {
        let mut bytes = binary_triangle(false);
        bytes.truncate(bytes.len() - 2);
        assert!(parse(&bytes, &mut Mesh::new()).is_err());
    }

    #[test]
    fn missing_magic_is_an_error() {
        assert!(parse(b"obj\nend_header\n", &mut Mesh::new()).is_err());
    }
}
