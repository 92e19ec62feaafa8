use ash::vk;
use std::mem;

/// Interleaved layout shared by the vertex buffer and the vertex shader inputs.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coord: [f32; 2],
    pub tangent: [f32; 4],
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            normal: [0.0; 3],
            tex_coord: [0.0; 2],
            tangent: [1.0, 0.0, 0.0, 1.0],
        }
    }
}

impl Vertex {
    pub fn vertex_input_descriptions() -> [vk::VertexInputBindingDescription; 1] {
        let vertex_input_binding_description = vk::VertexInputBindingDescription::builder()
            .binding(0)
            .stride(mem::size_of::<Self>() as _)
            .input_rate(vk::VertexInputRate::VERTEX)
            .build();
        [vertex_input_binding_description]
    }

    pub fn vertex_attributes() -> [vk::VertexInputAttributeDescription; 4] {
        let float_size = mem::size_of::<f32>() as u32;

        let position_description = vk::VertexInputAttributeDescription::builder()
            .binding(0)
            .location(0)
            .format(vk::Format::R32G32B32_SFLOAT)
            .offset(0)
            .build();

        let normal_description = vk::VertexInputAttributeDescription::builder()
            .binding(0)
            .location(1)
            .format(vk::Format::R32G32B32_SFLOAT)
            .offset(3 * float_size)
            .build();

        let tex_coord_description = vk::VertexInputAttributeDescription::builder()
            .binding(0)
            .location(2)
            .format(vk::Format::R32G32_SFLOAT)
            .offset(6 * float_size)
            .build();

        let tangent_description = vk::VertexInputAttributeDescription::builder()
            .binding(0)
            .location(3)
            .format(vk::Format::R32G32B32A32_SFLOAT)
            .offset(8 * float_size)
            .build();

        [
            position_description,
            normal_description,
            tex_coord_description,
            tangent_description,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(mem::size_of::<Vertex>(), 48);
        let descriptions = Vertex::vertex_input_descriptions();
        assert_eq!(descriptions[0].stride, 48);
    }

    #[test]
    fn attribute_offsets_match_field_layout() {
        let vertex = Vertex::default();
        let base = &vertex as *const Vertex as usize;
        let offsets = [
            &vertex.position as *const _ as usize - base,
            &vertex.normal as *const _ as usize - base,
            &vertex.tex_coord as *const _ as usize - base,
            &vertex.tangent as *const _ as usize - base,
        ];
        let attributes = Vertex::vertex_attributes();
        for (attribute, offset) in attributes.iter().zip(offsets.iter()) {
            assert_eq!(attribute.offset as usize, *offset);
        }
        let locations = attributes.iter().map(|a| a.location).collect::<Vec<_>>();
        assert_eq!(locations, vec![0, 1, 2, 3]);
    }

    #[test]
    fn default_tangent_points_along_x() {
        assert_eq!(Vertex::default().tangent, [1.0, 0.0, 0.0, 1.0]);
    }
}
