pub use self::{
    buffer::{Buffer, GeometryBuffer},
    command_pool::CommandPool,
    dummy::DummyImage,
    shader::{Shader, ShaderSet, ShaderSetBuilder},
    texture::{ImageLayoutTransition, Texture, TextureBundle, TextureDescription},
};

pub mod buffer;
pub mod command_pool;
pub mod dummy;
pub mod shader;
pub mod texture;
