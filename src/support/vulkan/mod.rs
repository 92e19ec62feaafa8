pub use self::{
    asset::*, core::*, mesh::*, pipeline::*, renderer::*, resource::*, shader_compilation::*,
};

pub mod asset;
pub mod core;
pub mod mesh;
pub mod pipeline;
pub mod renderer;
pub mod resource;
pub mod shader_compilation;

/// # Safety
///
/// Reinterprets a slice as bytes. Use with slices of plain `#[repr(C)]` data.
pub unsafe fn bytes_of_slice<T: Sized>(data: &[T]) -> &[u8] {
    std::slice::from_raw_parts(
        data.as_ptr() as *const u8,
        data.len() * std::mem::size_of::<T>(),
    )
}
