pub use self::{
    gltf_mesh::{Indices, MaterialTextures, MeshAsset, MeshGeometry},
    vertex::Vertex,
};

pub mod gltf_mesh;
pub mod vertex;
