use std::path::Path;
use std::rc::Rc;

use gltf::buffer::Data;

use crate::engine::components::mesh::Mesh;
use crate::engine::components::texture::{GlTexture, TextureType};
use crate::engine::loaders::image_loader::Image;
use crate::engine::managers::texture_manager::TextureManager;
use crate::engine::utils::math::{Matrix3, Matrix4, Vector2, Vector3, Vector4};

/// Parsed asset: document plus resolved binary buffers.
pub struct GltfAsset {
    pub document: gltf::Document,
    pub buffers: Vec<Data>,
}

pub fn open(path: &Path) -> Result<GltfAsset, gltf::Error> {
    let gltf::Gltf { document, blob } = gltf::Gltf::open(path)?;
    let buffers = gltf::import_buffers(&document, path.parent(), blob)?;
    Ok(GltfAsset { document, buffers })
}

/// Every mesh node reachable from the scenes, with its world transform.
/// Walks the node tree with an explicit stack. Falls back to all meshes
/// (identity transform) when the asset declares no scene.
pub fn mesh_instances(document: &gltf::Document) -> Vec<(gltf::Mesh<'_>, Matrix4)> {
    if document.scenes().len() == 0 {
        return document.meshes().map(|m| (m, Matrix4::identity())).collect();
    }
    let mut instances = Vec::new();
    let mut stack: Vec<(gltf::Node<'_>, Matrix4)> = document
        .scenes()
        .flat_map(|scene| scene.nodes().map(|n| (n, Matrix4::identity())).collect::<Vec<_>>())
        .collect();
    while let Some((node, parent)) = stack.pop() {
        let local = Matrix4 { m: bytemuck::cast(node.transform().matrix()) };
        let world = parent * local;
        if let Some(mesh) = node.mesh() {
            instances.push((mesh, world));
        }
        stack.extend(node.children().map(|child| (child, world)));
    }
    instances
}

fn transform_point(m: &Matrix4, p: [f32; 3]) -> Vector3 {
    (*m * Vector4::new(p[0], p[1], p[2], 1.0)).truncate()
}

fn linear_part(m: &Matrix4) -> Matrix3 {
    let mut r = Matrix3::identity();
    for row in 0..3 {
        for col in 0..3 {
            r.set(row, col, m.get(row, col));
        }
    }
    r
}

/// Copies one triangle primitive into a CPU mesh, baked into world space.
pub fn read_primitive(primitive: &gltf::Primitive<'_>, buffers: &[Data], world: &Matrix4) -> Result<Mesh, String> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        return Err(format!("primitive mode {:?} is not supported", primitive.mode()));
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));
    let linear = linear_part(world);

    let mut mesh = Mesh::new();
    mesh.vertex = reader
        .read_positions()
        .ok_or("primitive has no POSITION attribute")?
        .map(|p| transform_point(world, p))
        .collect();
    if let Some(normals) = reader.read_normals() {
        mesh.normal = normals.map(|n| (linear * Vector3::from(n)).normalized()).collect();
    }
    if let Some(tex_coords) = reader.read_tex_coords(0) {
        mesh.tex_coord = tex_coords.into_f32().map(Vector2::from).collect();
    }
    if let Some(colors) = reader.read_colors(0) {
        mesh.vertex_color = colors.into_rgb_f32().map(Vector3::from).collect();
    }
    if let Some(tangents) = reader.read_tangents() {
        mesh.tangent = tangents
            .map(|t| (linear * Vector3::new(t[0], t[1], t[2])).normalized())
            .collect();
    }

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..mesh.vertex.len() as u32).collect(),
    };
    if indices.len() % 3 != 0 {
        return Err(format!("{} indices do not form whole triangles", indices.len()));
    }
    mesh.triangle = indices.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
    mesh.validate().map_err(|e| e.to_string())?;
    Ok(mesh)
}

/// Material slots mapped onto texture types: base color, normal map, metallic-roughness.
fn material_slots<'a>(material: &gltf::Material<'a>) -> Vec<(TextureType, gltf::Texture<'a>)> {
    let pbr = material.pbr_metallic_roughness();
    let mut slots = Vec::new();
    if let Some(info) = pbr.base_color_texture() {
        slots.push((TextureType::Diffuse, info.texture()));
    }
    if let Some(normal) = material.normal_texture() {
        slots.push((TextureType::Normal, normal.texture()));
    }
    if let Some(info) = pbr.metallic_roughness_texture() {
        slots.push((TextureType::Specular, info.texture()));
    }
    slots
}

/// Loads (or reuses) the textures a material references. Failures are
/// appended to `failures` and the texture is skipped.
pub fn material_textures(
    material: &gltf::Material<'_>,
    asset: &GltfAsset,
    base_dir: &Path,
    model_key: &str,
    textures: &mut TextureManager,
    failures: &mut Vec<String>,
) -> Vec<Rc<GlTexture>> {
    let mut loaded = Vec::new();
    for (ty, texture) in material_slots(material) {
        let image = texture.source();
        let result = match image.source() {
            gltf::image::Source::Uri { uri, .. } if uri.starts_with("data:") => {
                Err(format!("image {} uses a data URI, which is not supported", image.index()))
            }
            gltf::image::Source::Uri { uri, .. } => {
                let path = base_dir.join(uri);
                textures.add_as(&path.to_string_lossy(), "", ty).map_err(|e| e.to_string())
            }
            gltf::image::Source::View { view, .. } => {
                let key = format!("{}#image{}", model_key, image.index());
                if let Some(existing) = textures.get(&key) {
                    Ok(Rc::clone(existing))
                } else {
                    embedded_bytes(&view, &asset.buffers)
                        .and_then(|bytes| Image::decode_guess(bytes).map_err(|e| e.to_string()))
                        .and_then(|decoded| textures.add_image(&key, &decoded, ty).map_err(|e| e.to_string()))
                }
            }
        };
        match result {
            Ok(texture) => loaded.push(texture),
            Err(err) => failures.push(format!("{} texture: {}", ty.as_str(), err)),
        }
    }
    loaded
}

fn embedded_bytes<'a>(view: &gltf::buffer::View<'_>, buffers: &'a [Data]) -> Result<&'a [u8], String> {
    let buffer = buffers
        .get(view.buffer().index())
        .ok_or_else(|| format!("buffer {} missing", view.buffer().index()))?;
    buffer
        .0
        .get(view.offset()..view.offset() + view.length())
        .ok_or_else(|| "image buffer view out of range".to_string())
}
