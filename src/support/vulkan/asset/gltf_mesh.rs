use crate::vulkan::{asset::Vertex, bytes_of_slice, TextureDescription};
use ash::vk;
use image::{buffer::ConvertBuffer, ImageBuffer, Luma, LumaA, Rgb, Rgba};
use log::{debug, info, warn};
use snafu::{OptionExt, ResultExt, Snafu};
use std::path::{Path, PathBuf};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub enum Error {
    #[snafu(display("Failed to load glTF asset '{}': {}", path.display(), source))]
    LoadGltf { path: PathBuf, source: gltf::Error },

    #[snafu(display("The asset contains no meshes"))]
    NoMeshes,

    #[snafu(display("The first mesh contains no primitives"))]
    NoPrimitives,

    #[snafu(display("The primitive has no vertex positions"))]
    MissingPositions,

    #[snafu(display("The primitive has no indices"))]
    MissingIndices,

    #[snafu(display(
        "The primitive is empty ({} vertices, {} indices)",
        vertices,
        indices
    ))]
    EmptyPrimitive { vertices: usize, indices: usize },

    #[snafu(display("Image {} has a pixel buffer that does not match its dimensions", index))]
    InvalidImageData { index: usize },

    #[snafu(display("Image {} uses unsupported pixel format {:?}", index, format))]
    UnsupportedImageFormat {
        index: usize,
        format: gltf::image::Format,
    },
}

/// Index data at the width the asset stores it.
#[derive(Debug, Clone, PartialEq)]
pub enum Indices {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl Indices {
    pub fn len(&self) -> usize {
        match self {
            Indices::U16(indices) => indices.len(),
            Indices::U32(indices) => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn index_type(&self) -> vk::IndexType {
        match self {
            Indices::U16(_) => vk::IndexType::UINT16,
            Indices::U32(_) => vk::IndexType::UINT32,
        }
    }

    fn as_bytes(&self) -> &[u8] {
        unsafe {
            match self {
                Indices::U16(indices) => bytes_of_slice(indices),
                Indices::U32(indices) => bytes_of_slice(indices),
            }
        }
    }
}

/// Indices into the asset's image list, `-1` for a missing slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialTextures {
    pub base_colour: i32,
    pub normal: i32,
    pub metallic_roughness: i32,
    pub emissive: i32,
}

impl Default for MaterialTextures {
    fn default() -> Self {
        Self {
            base_colour: -1,
            normal: -1,
            metallic_roughness: -1,
            emissive: -1,
        }
    }
}

impl MaterialTextures {
    pub fn as_array(&self) -> [i32; 4] {
        [
            self.base_colour,
            self.normal,
            self.metallic_roughness,
            self.emissive,
        ]
    }
}

/// The single byte buffer uploaded for drawing: vertices followed by indices.
#[derive(Debug, Clone)]
pub struct MeshGeometry {
    pub bytes: Vec<u8>,
    pub index_offset: vk::DeviceSize,
    pub index_count: u32,
    pub index_type: vk::IndexType,
}

pub struct MeshAsset {
    pub vertices: Vec<Vertex>,
    pub indices: Indices,
    pub textures: Vec<TextureDescription>,
    pub material: MaterialTextures,
}

impl MeshAsset {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let (document, buffers, images) = gltf::import(path).context(LoadGltf { path })?;
        info!("Loaded glTF asset: {}", path.display());
        Self::from_gltf(&document, &buffers, &images)
    }

    pub fn from_gltf(
        document: &gltf::Document,
        buffers: &[gltf::buffer::Data],
        images: &[gltf::image::Data],
    ) -> Result<Self> {
        Self::log_document(document);

        let mesh = document.meshes().next().context(NoMeshes)?;
        if document.meshes().len() > 1 {
            warn!(
                "Asset has {} meshes, only the first is drawn",
                document.meshes().len()
            );
        }

        let primitive = mesh.primitives().next().context(NoPrimitives)?;
        let reader = primitive.reader(|buffer| Some(buffers[buffer.index()].0.as_slice()));

        let positions = reader.read_positions().context(MissingPositions)?;
        let mut vertices = positions
            .map(|position| Vertex {
                position,
                ..Vertex::default()
            })
            .collect::<Vec<_>>();

        if let Some(normals) = reader.read_normals() {
            vertices
                .iter_mut()
                .zip(normals)
                .for_each(|(vertex, normal)| vertex.normal = normal);
        }

        if let Some(tex_coords) = reader.read_tex_coords(0) {
            vertices
                .iter_mut()
                .zip(tex_coords.into_f32())
                .for_each(|(vertex, tex_coord)| vertex.tex_coord = tex_coord);
        }

        if let Some(tangents) = reader.read_tangents() {
            vertices
                .iter_mut()
                .zip(tangents)
                .for_each(|(vertex, tangent)| vertex.tangent = tangent);
        }

        let indices = match reader.read_indices().context(MissingIndices)? {
            gltf::mesh::util::ReadIndices::U8(indices) => {
                Indices::U16(indices.map(u16::from).collect())
            }
            gltf::mesh::util::ReadIndices::U16(indices) => Indices::U16(indices.collect()),
            gltf::mesh::util::ReadIndices::U32(indices) => Indices::U32(indices.collect()),
        };

        ensure_drawable(vertices.len(), indices.len())?;

        let material = Self::material_textures(&primitive.material());

        let textures = images
            .iter()
            .enumerate()
            .map(|(index, image)| Self::texture_description(index, image))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Mesh has {} vertices, {} indices ({:?}) and {} textures",
            vertices.len(),
            indices.len(),
            indices.index_type(),
            textures.len()
        );

        Ok(Self {
            vertices,
            indices,
            textures,
            material,
        })
    }

    pub fn geometry(&self) -> MeshGeometry {
        let vertex_bytes = unsafe { bytes_of_slice(&self.vertices) };
        let index_bytes = self.indices.as_bytes();

        let mut bytes = Vec::with_capacity(vertex_bytes.len() + index_bytes.len() + 3);
        bytes.extend_from_slice(vertex_bytes);
        bytes.extend_from_slice(index_bytes);
        while bytes.len() % 4 != 0 {
            bytes.push(0);
        }

        MeshGeometry {
            bytes,
            index_offset: vertex_bytes.len() as vk::DeviceSize,
            index_count: self.indices.len() as u32,
            index_type: self.indices.index_type(),
        }
    }

    fn material_textures(material: &gltf::Material) -> MaterialTextures {
        let image_index = |texture: gltf::Texture| texture.source().index() as i32;
        let pbr = material.pbr_metallic_roughness();
        MaterialTextures {
            base_colour: pbr
                .base_color_texture()
                .map(|info| image_index(info.texture()))
                .unwrap_or(-1),
            normal: material
                .normal_texture()
                .map(|info| image_index(info.texture()))
                .unwrap_or(-1),
            metallic_roughness: pbr
                .metallic_roughness_texture()
                .map(|info| image_index(info.texture()))
                .unwrap_or(-1),
            emissive: material
                .emissive_texture()
                .map(|info| image_index(info.texture()))
                .unwrap_or(-1),
        }
    }

    fn texture_description(index: usize, image: &gltf::image::Data) -> Result<TextureDescription> {
        use gltf::image::Format;

        let (width, height) = (image.width, image.height);
        let pixels = image.pixels.clone();

        let description = match image.format {
            Format::R8 => {
                let buffer = ImageBuffer::<Luma<u8>, _>::from_raw(width, height, pixels)
                    .context(InvalidImageData { index })?;
                let rgba: ImageBuffer<Rgba<u8>, Vec<u8>> = buffer.convert();
                TextureDescription::new(vk::Format::R8G8B8A8_UNORM, width, height, rgba.into_raw())
            }
            Format::R8G8 => {
                let buffer = ImageBuffer::<LumaA<u8>, _>::from_raw(width, height, pixels)
                    .context(InvalidImageData { index })?;
                let rgba: ImageBuffer<Rgba<u8>, Vec<u8>> = buffer.convert();
                TextureDescription::new(vk::Format::R8G8B8A8_UNORM, width, height, rgba.into_raw())
            }
            Format::R8G8B8 => {
                let buffer = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, pixels)
                    .context(InvalidImageData { index })?;
                let rgba: ImageBuffer<Rgba<u8>, Vec<u8>> = buffer.convert();
                TextureDescription::new(vk::Format::R8G8B8A8_UNORM, width, height, rgba.into_raw())
            }
            Format::R8G8B8A8 => {
                TextureDescription::new(vk::Format::R8G8B8A8_UNORM, width, height, pixels)
            }
            Format::R16G16B16 => {
                let pixels = expand_rgb16_to_rgba16(&pixels, width, height)
                    .context(InvalidImageData { index })?;
                TextureDescription::new(vk::Format::R16G16B16A16_UNORM, width, height, pixels)
            }
            Format::R16G16B16A16 => {
                TextureDescription::new(vk::Format::R16G16B16A16_UNORM, width, height, pixels)
            }
            format => return UnsupportedImageFormat { index, format }.fail(),
        };

        debug!(
            "Image {}: {}x{} {:?} -> {:?}",
            index, width, height, image.format, description.format
        );

        Ok(description)
    }

    fn log_document(document: &gltf::Document) {
        info!("Number of meshes: {}", document.meshes().len());
        for mesh in document.meshes() {
            info!("Mesh name: {}", mesh.name().unwrap_or("<unnamed>"));
            info!("Number of primitives: {}", mesh.primitives().len());
            for primitive in mesh.primitives() {
                for (semantic, accessor) in primitive.attributes() {
                    debug!("Attribute: {:?} ({} elements)", semantic, accessor.count());
                }
            }
        }

        info!("Number of buffers: {}", document.buffers().len());
        for buffer in document.buffers() {
            let uri = match buffer.source() {
                gltf::buffer::Source::Uri(uri) if uri.starts_with("data:") => "<embedded>",
                gltf::buffer::Source::Uri(uri) => uri,
                gltf::buffer::Source::Bin => "<binary chunk>",
            };
            debug!("Buffer URI: {}, byte length: {}", uri, buffer.length());
        }

        info!("Number of buffer views: {}", document.views().len());
        for view in document.views() {
            debug!(
                "Buffer view: buffer {}, offset {}, length {}, target {:?}",
                view.buffer().index(),
                view.offset(),
                view.length(),
                view.target()
            );
        }
    }
}

fn ensure_drawable(vertex_count: usize, index_count: usize) -> Result<()> {
    if vertex_count == 0 || index_count == 0 {
        return EmptyPrimitive {
            vertices: vertex_count,
            indices: index_count,
        }
        .fail();
    }
    Ok(())
}

fn expand_rgb16_to_rgba16(pixels: &[u8], width: u32, height: u32) -> Option<Vec<u8>> {
    let pixel_count = width as usize * height as usize;
    if pixels.len() != pixel_count * 6 {
        return None;
    }
    let mut expanded = Vec::with_capacity(pixel_count * 8);
    for pixel in pixels.chunks_exact(6) {
        expanded.extend_from_slice(pixel);
        expanded.extend_from_slice(&[0xFF, 0xFF]);
    }
    Some(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "tests/fixtures/triangle.gltf";

    #[test]
    fn loads_fixture_mesh() {
        let asset = MeshAsset::load(FIXTURE).unwrap();
        assert_eq!(asset.vertices.len(), 3);
        assert_eq!(asset.indices, Indices::U16(vec![0, 1, 2]));
        assert_eq!(asset.vertices[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(asset.vertices[2].tex_coord, [0.0, 1.0]);
        assert_eq!(asset.vertices[0].normal, [0.0, 0.0, 1.0]);
        assert_eq!(asset.vertices[0].tangent, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn fixture_image_is_expanded_to_rgba() {
        let asset = MeshAsset::load(FIXTURE).unwrap();
        assert_eq!(asset.textures.len(), 1);
        let texture = &asset.textures[0];
        assert_eq!(texture.format, vk::Format::R8G8B8A8_UNORM);
        assert_eq!((texture.width, texture.height), (2, 2));
        assert_eq!(texture.mip_levels, 2);
        assert_eq!(texture.pixels.len(), 2 * 2 * 4);
        assert!(texture.pixels.chunks(4).all(|pixel| pixel[3] == 255));
        assert_eq!(&texture.pixels[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn fixture_material_references_the_image() {
        let asset = MeshAsset::load(FIXTURE).unwrap();
        assert_eq!(asset.material.base_colour, 0);
        assert_eq!(asset.material.normal, -1);
        assert_eq!(asset.material.as_array(), [0, -1, -1, -1]);
    }

    #[test]
    fn geometry_places_indices_after_vertices() {
        let asset = MeshAsset::load(FIXTURE).unwrap();
        let geometry = asset.geometry();
        assert_eq!(geometry.index_offset, 3 * 48);
        assert_eq!(geometry.index_count, 3);
        assert_eq!(geometry.index_type, vk::IndexType::UINT16);
        // three u16 indices padded up to a multiple of four
        assert_eq!(geometry.bytes.len(), 3 * 48 + 8);
        assert_eq!(&geometry.bytes[144..150], &[0, 0, 1, 0, 2, 0]);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(matches!(
            MeshAsset::load("tests/fixtures/missing.gltf"),
            Err(Error::LoadGltf { .. })
        ));
    }

    #[test]
    fn u32_indices_keep_their_width() {
        let asset = MeshAsset {
            vertices: vec![Vertex::default(); 3],
            indices: Indices::U32(vec![0, 1, 2]),
            textures: Vec::new(),
            material: MaterialTextures::default(),
        };
        let geometry = asset.geometry();
        assert_eq!(geometry.index_type, vk::IndexType::UINT32);
        assert_eq!(geometry.bytes.len(), 3 * 48 + 12);
    }

    #[test]
    fn rgb16_gains_an_opaque_alpha_channel() {
        let pixels = vec![1, 2, 3, 4, 5, 6];
        let expanded = expand_rgb16_to_rgba16(&pixels, 1, 1).unwrap();
        assert_eq!(expanded, vec![1, 2, 3, 4, 5, 6, 0xFF, 0xFF]);
        assert!(expand_rgb16_to_rgba16(&pixels, 2, 1).is_none());
    }

    #[test]
    fn asset_without_meshes_is_rejected() {
        assert!(matches!(
            MeshAsset::load("tests/fixtures/no_meshes.gltf"),
            Err(Error::NoMeshes)
        ));
    }

    #[test]
    fn primitive_without_indices_is_rejected() {
        assert!(matches!(
            MeshAsset::load("tests/fixtures/no_indices.gltf"),
            Err(Error::MissingIndices)
        ));
    }

    #[test]
    fn primitive_without_positions_is_rejected() {
        assert!(MeshAsset::load("tests/fixtures/no_positions.gltf").is_err());
    }

    #[test]
    fn empty_primitives_are_rejected() {
        assert!(ensure_drawable(3, 3).is_ok());
        assert!(matches!(
            ensure_drawable(0, 3),
            Err(Error::EmptyPrimitive {
                vertices: 0,
                indices: 3
            })
        ));
        assert!(matches!(
            ensure_drawable(3, 0),
            Err(Error::EmptyPrimitive { .. })
        ));
    }

    #[test]
    fn u8_indices_widen_to_u16() {
        let asset = MeshAsset::load("tests/fixtures/positions_only_u8.gltf").unwrap();
        assert_eq!(asset.indices, Indices::U16(vec![0, 1, 2]));
        assert_eq!(asset.geometry().index_type, vk::IndexType::UINT16);
    }

    #[test]
    fn missing_attributes_fall_back_to_defaults() {
        let asset = MeshAsset::load("tests/fixtures/positions_only_u8.gltf").unwrap();
        assert_eq!(asset.vertices.len(), 3);
        for vertex in asset.vertices.iter() {
            assert_eq!(vertex.normal, [0.0, 0.0, 0.0]);
            assert_eq!(vertex.tex_coord, [0.0, 0.0]);
            assert_eq!(vertex.tangent, [1.0, 0.0, 0.0, 1.0]);
        }
        assert!(asset.textures.is_empty());
        assert_eq!(asset.material, MaterialTextures::default());
    }

    fn image_data(format: gltf::image::Format, pixels: Vec<u8>) -> gltf::image::Data {
        gltf::image::Data {
            pixels,
            format,
            width: 2,
            height: 1,
        }
    }

    #[test]
    fn single_channel_images_expand_to_rgba8() {
        let image = image_data(gltf::image::Format::R8, vec![10, 200]);
        let texture = MeshAsset::texture_description(0, &image).unwrap();
        assert_eq!(texture.format, vk::Format::R8G8B8A8_UNORM);
        assert_eq!(texture.pixels, vec![10, 10, 10, 255, 200, 200, 200, 255]);
    }

    #[test]
    fn two_channel_images_expand_to_rgba8() {
        let image = image_data(gltf::image::Format::R8G8, vec![10, 20, 200, 100]);
        let texture = MeshAsset::texture_description(0, &image).unwrap();
        assert_eq!(texture.format, vk::Format::R8G8B8A8_UNORM);
        assert_eq!(texture.pixels, vec![10, 10, 10, 20, 200, 200, 200, 100]);
    }

    #[test]
    fn truncated_pixel_data_is_rejected() {
        let image = image_data(gltf::image::Format::R8G8B8, vec![1, 2, 3]);
        assert!(matches!(
            MeshAsset::texture_description(4, &image),
            Err(Error::InvalidImageData { index: 4 })
        ));
    }

    #[test]
    fn unsupported_formats_are_rejected() {
        let image = image_data(gltf::image::Format::R16, vec![0; 4]);
        assert!(matches!(
            MeshAsset::texture_description(1, &image),
            Err(Error::UnsupportedImageFormat { index: 1, .. })
        ));
    }
}
