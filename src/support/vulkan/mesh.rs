use crate::vulkan::{
    core::{descriptor_pool, descriptor_set_layout, sampler},
    pipeline,
    resource::{buffer, shader, texture},
    shader_compilation, Buffer, CommandPool, DescriptorPool, DescriptorSetLayout, DummyImage,
    GeometryBuffer, MaterialTextures, MeshAsset, RenderPass, RenderPipeline,
    RenderPipelineSettingsBuilder, Sampler, Shader, ShaderCompiler, ShaderSet, ShaderSetBuilder,
    SynchronizationSet, SynchronizationSetConstants, TextureBundle, Vertex, VulkanContext,
};
use ash::{version::DeviceV1_0, vk};
use log::{debug, info, warn};
use nalgebra_glm as glm;
use snafu::{ResultExt, Snafu};
use std::{mem, path::Path, sync::Arc};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub enum Error {
    #[snafu(display("Failed to create mesh buffer: {}", source))]
    CreateBuffer { source: buffer::Error },

    #[snafu(display("Failed to upload frame data: {}", source))]
    UploadFrameData { source: buffer::Error },

    #[snafu(display("Failed to create mesh texture: {}", source))]
    CreateTexture { source: texture::Error },

    #[snafu(display("Failed to create texture sampler: {}", source))]
    CreateSampler { source: sampler::Error },

    #[snafu(display("Failed to create descriptor set layout: {}", source))]
    CreateDescriptorSetLayout {
        source: descriptor_set_layout::Error,
    },

    #[snafu(display("Failed to create descriptor pool: {}", source))]
    CreateDescriptorPool { source: descriptor_pool::Error },

    #[snafu(display("Failed to allocate descriptor sets: {}", source))]
    AllocateDescriptorSets { source: descriptor_pool::Error },

    #[snafu(display("Failed to compile shader: {}", source))]
    CompileShader { source: shader_compilation::Error },

    #[snafu(display("Failed to create shader module: {}", source))]
    CreateShader { source: shader::Error },

    #[snafu(display("Failed to build shader set: {}", message))]
    BuildShaderSet { message: String },

    #[snafu(display("Failed to build pipeline settings: {}", message))]
    BuildPipelineSettings { message: String },

    #[snafu(display("Failed to create mesh pipeline: {}", source))]
    CreatePipeline { source: pipeline::Error },

    #[snafu(display("No frame data exists for frame {}", index))]
    MissingFrame { index: usize },
}

/// Size of the texture array declared by the fragment shader.
pub const MAX_TEXTURES: u32 = 16;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SceneUniforms {
    pub view: glm::Mat4,
    pub projection: glm::Mat4,
    pub light_colour: glm::Vec4,
    pub light_direction: glm::Vec4,
    pub camera_position: glm::Vec4,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ObjectData {
    pub world: glm::Mat4,
    pub texture_indices: [i32; 4],
}

impl ObjectData {
    /// Mirrors Z so right-handed asset data lands in the left-handed world.
    pub fn world_matrix() -> glm::Mat4 {
        glm::scaling(&glm::vec3(1.0, 1.0, -1.0))
    }

    pub fn new(material: &MaterialTextures, texture_count: usize) -> Self {
        let mut texture_indices = material.as_array();
        for index in texture_indices.iter_mut() {
            if *index >= texture_count as i32 {
                warn!("Material references missing texture {}, ignoring it", index);
                *index = -1;
            }
        }
        Self {
            world: Self::world_matrix(),
            texture_indices,
        }
    }
}

pub fn descriptor_pool_sizes(frames: u32, texture_count: u32) -> [vk::DescriptorPoolSize; 4] {
    [
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: frames,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::STORAGE_BUFFER,
            descriptor_count: frames,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::SAMPLER,
            descriptor_count: 1,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::SAMPLED_IMAGE,
            descriptor_count: texture_count,
        },
    ]
}

/// One frame-set per frame in flight plus the shared texture set.
pub fn descriptor_pool_max_sets(frames: u32) -> u32 {
    frames + 1
}

/// Set 0: scene uniforms at binding 0, object data at binding 1.
pub fn frame_layout_bindings() -> [vk::DescriptorSetLayoutBinding; 2] {
    let stages = vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT;
    [
        vk::DescriptorSetLayoutBinding::builder()
            .binding(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1)
            .stage_flags(stages)
            .build(),
        vk::DescriptorSetLayoutBinding::builder()
            .binding(1)
            .descriptor_type(vk::DescriptorType::STORAGE_BUFFER)
            .descriptor_count(1)
            .stage_flags(stages)
            .build(),
    ]
}

/// Set 1: one sampler at binding 0, the texture array at binding 1.
pub fn texture_layout_bindings() -> [vk::DescriptorSetLayoutBinding; 2] {
    [
        vk::DescriptorSetLayoutBinding::builder()
            .binding(0)
            .descriptor_type(vk::DescriptorType::SAMPLER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::FRAGMENT)
            .build(),
        vk::DescriptorSetLayoutBinding::builder()
            .binding(1)
            .descriptor_type(vk::DescriptorType::SAMPLED_IMAGE)
            .descriptor_count(MAX_TEXTURES)
            .stage_flags(vk::ShaderStageFlags::FRAGMENT)
            .build(),
    ]
}

// Only the last binding of a set may have a variable count
pub fn texture_binding_flags() -> [vk::DescriptorBindingFlags; 2] {
    [
        vk::DescriptorBindingFlags::empty(),
        vk::DescriptorBindingFlags::PARTIALLY_BOUND
            | vk::DescriptorBindingFlags::VARIABLE_DESCRIPTOR_COUNT,
    ]
}

pub fn compile_mesh_shaders(
    context: Arc<VulkanContext>,
    compiler: &mut ShaderCompiler,
    vertex_path: impl AsRef<Path>,
    fragment_path: impl AsRef<Path>,
) -> Result<ShaderSet> {
    let vertex_words = compiler
        .compile_file(vertex_path, vk::ShaderStageFlags::VERTEX)
        .context(CompileShader)?;
    let fragment_words = compiler
        .compile_file(fragment_path, vk::ShaderStageFlags::FRAGMENT)
        .context(CompileShader)?;

    let vertex_shader =
        Shader::from_spirv(context.clone(), &vertex_words, vk::ShaderStageFlags::VERTEX)
            .context(CreateShader)?;
    let fragment_shader =
        Shader::from_spirv(context, &fragment_words, vk::ShaderStageFlags::FRAGMENT)
            .context(CreateShader)?;

    ShaderSetBuilder::default()
        .vertex_shader(Arc::new(vertex_shader))
        .fragment_shader(Arc::new(fragment_shader))
        .build()
        .map_err(|message| Error::BuildShaderSet { message })
}

pub fn create_mesh_pipeline(
    context: Arc<VulkanContext>,
    render_pass: Arc<RenderPass>,
    pipeline_data: &MeshPipelineData,
) -> Result<RenderPipeline> {
    let settings = RenderPipelineSettingsBuilder::default()
        .render_pass(render_pass)
        .vertex_inputs(Vertex::vertex_input_descriptions().to_vec())
        .vertex_attributes(Vertex::vertex_attributes().to_vec())
        .descriptor_set_layouts(vec![
            pipeline_data.frame_layout.clone(),
            pipeline_data.texture_layout.clone(),
        ])
        .shader_set(pipeline_data.shader_set.clone())
        .cull_mode(vk::CullModeFlags::BACK)
        .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
        .build()
        .map_err(|message| Error::BuildPipelineSettings { message })?;

    RenderPipeline::new(context, settings).context(CreatePipeline)
}

pub struct FrameData {
    pub uniform_buffer: Buffer,
    pub object_buffer: Buffer,
    pub descriptor_set: vk::DescriptorSet,
}

// Field order is the teardown order
pub struct MeshPipelineData {
    pub descriptor_pool: DescriptorPool,
    pub shader_set: ShaderSet,
    pub frame_layout: Arc<DescriptorSetLayout>,
    pub texture_layout: Arc<DescriptorSetLayout>,
    pub sampler: Sampler,
    pub textures: Vec<TextureBundle>,
    pub frames: Vec<FrameData>,
    pub geometry: GeometryBuffer,
    pub texture_descriptor_set: vk::DescriptorSet,
}

impl MeshPipelineData {
    pub fn new(
        context: Arc<VulkanContext>,
        command_pool: &CommandPool,
        asset: &MeshAsset,
        shader_set: ShaderSet,
    ) -> Result<Self> {
        let mesh_geometry = asset.geometry();
        let geometry = GeometryBuffer::new(
            context.clone(),
            command_pool,
            &mesh_geometry.bytes,
            mesh_geometry.index_offset,
            mesh_geometry.index_count,
            mesh_geometry.index_type,
        )
        .context(CreateBuffer)?;

        let textures = Self::create_textures(context.clone(), command_pool, asset)?;
        let sampler = Self::create_sampler(context.clone())?;

        let frame_count = SynchronizationSet::MAX_FRAMES_IN_FLIGHT;
        let object_data = ObjectData::new(&asset.material, asset.textures.len().min(textures.len()));
        let frame_buffers = (0..frame_count)
            .map(|_| Self::create_frame_buffers(context.clone(), &object_data))
            .collect::<Result<Vec<_>>>()?;

        let frame_layout = Arc::new(Self::frame_descriptor_set_layout(context.clone())?);
        let texture_layout = Arc::new(Self::texture_descriptor_set_layout(context.clone())?);

        let texture_count = textures.len() as u32;
        let pool_sizes = descriptor_pool_sizes(frame_count, texture_count);
        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .pool_sizes(&pool_sizes)
            .max_sets(descriptor_pool_max_sets(frame_count))
            .build();
        let descriptor_pool =
            DescriptorPool::new(context.clone(), pool_info).context(CreateDescriptorPool)?;

        let frame_sets = descriptor_pool
            .allocate_descriptor_sets(frame_layout.layout(), frame_count)
            .context(AllocateDescriptorSets)?;
        let texture_descriptor_set = descriptor_pool
            .allocate_variable_descriptor_set(texture_layout.layout(), texture_count)
            .context(AllocateDescriptorSets)?;

        let frames = frame_buffers
            .into_iter()
            .zip(frame_sets)
            .map(|((uniform_buffer, object_buffer), descriptor_set)| FrameData {
                uniform_buffer,
                object_buffer,
                descriptor_set,
            })
            .collect::<Vec<_>>();

        let data = Self {
            descriptor_pool,
            shader_set,
            frame_layout,
            texture_layout,
            sampler,
            textures,
            frames,
            geometry,
            texture_descriptor_set,
        };

        data.update_descriptor_sets(&context);

        info!(
            "Mesh resources ready: {} indices, {} textures, {} frames in flight",
            data.geometry.index_count(),
            texture_count,
            frame_count
        );

        Ok(data)
    }

    fn create_textures(
        context: Arc<VulkanContext>,
        command_pool: &CommandPool,
        asset: &MeshAsset,
    ) -> Result<Vec<TextureBundle>> {
        if asset.textures.is_empty() {
            debug!("Asset has no images, binding a white placeholder texture");
            let dummy = DummyImage::create(context, command_pool).context(CreateTexture)?;
            return Ok(vec![dummy]);
        }

        if asset.textures.len() > MAX_TEXTURES as usize {
            warn!(
                "Asset has {} images, only the first {} are uploaded",
                asset.textures.len(),
                MAX_TEXTURES
            );
        }

        asset
            .textures
            .iter()
            .take(MAX_TEXTURES as usize)
            .map(|description| {
                TextureBundle::new(context.clone(), command_pool, description)
                    .context(CreateTexture)
            })
            .collect()
    }

    fn create_sampler(context: Arc<VulkanContext>) -> Result<Sampler> {
        let physical_device = context.physical_device();
        let anisotropy_enabled = physical_device.sampler_anisotropy_supported();
        let max_anisotropy = physical_device
            .properties()
            .limits
            .max_sampler_anisotropy
            .min(4.0);
        let sampler_info = vk::SamplerCreateInfo::builder()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .anisotropy_enable(anisotropy_enabled)
            .max_anisotropy(if anisotropy_enabled { max_anisotropy } else { 1.0 })
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(vk::LOD_CLAMP_NONE)
            .build();
        Sampler::new(context, sampler_info).context(CreateSampler)
    }

    fn create_frame_buffers(
        context: Arc<VulkanContext>,
        object_data: &ObjectData,
    ) -> Result<(Buffer, Buffer)> {
        let uniform_buffer = Buffer::new_mapped_basic(
            context.clone(),
            mem::size_of::<SceneUniforms>() as _,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            vk_mem::MemoryUsage::CpuToGpu,
        )
        .context(CreateBuffer)?;

        let object_buffer = Buffer::new_mapped_basic(
            context,
            mem::size_of::<ObjectData>() as _,
            vk::BufferUsageFlags::STORAGE_BUFFER,
            vk_mem::MemoryUsage::CpuToGpu,
        )
        .context(CreateBuffer)?;
        object_buffer
            .upload_to_buffer(&[*object_data], 0)
            .context(UploadFrameData)?;

        Ok((uniform_buffer, object_buffer))
    }

    pub fn frame_descriptor_set_layout(context: Arc<VulkanContext>) -> Result<DescriptorSetLayout> {
        let bindings = frame_layout_bindings();
        let layout_create_info = vk::DescriptorSetLayoutCreateInfo::builder()
            .bindings(&bindings)
            .build();

        DescriptorSetLayout::new(context, layout_create_info).context(CreateDescriptorSetLayout)
    }

    pub fn texture_descriptor_set_layout(
        context: Arc<VulkanContext>,
    ) -> Result<DescriptorSetLayout> {
        let bindings = texture_layout_bindings();
        let binding_flags = texture_binding_flags();
        let mut binding_flags_info = vk::DescriptorSetLayoutBindingFlagsCreateInfo::builder()
            .binding_flags(&binding_flags)
            .build();

        let layout_create_info = vk::DescriptorSetLayoutCreateInfo::builder()
            .bindings(&bindings)
            .push_next(&mut binding_flags_info)
            .build();

        DescriptorSetLayout::new(context, layout_create_info).context(CreateDescriptorSetLayout)
    }

    fn update_descriptor_sets(&self, context: &VulkanContext) {
        for frame in self.frames.iter() {
            let uniform_buffer_infos = [vk::DescriptorBufferInfo::builder()
                .buffer(frame.uniform_buffer.buffer())
                .offset(0)
                .range(mem::size_of::<SceneUniforms>() as vk::DeviceSize)
                .build()];

            let object_buffer_infos = [vk::DescriptorBufferInfo::builder()
                .buffer(frame.object_buffer.buffer())
                .offset(0)
                .range(mem::size_of::<ObjectData>() as vk::DeviceSize)
                .build()];

            let descriptor_writes = [
                vk::WriteDescriptorSet::builder()
                    .dst_set(frame.descriptor_set)
                    .dst_binding(0)
                    .dst_array_element(0)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .buffer_info(&uniform_buffer_infos)
                    .build(),
                vk::WriteDescriptorSet::builder()
                    .dst_set(frame.descriptor_set)
                    .dst_binding(1)
                    .dst_array_element(0)
                    .descriptor_type(vk::DescriptorType::STORAGE_BUFFER)
                    .buffer_info(&object_buffer_infos)
                    .build(),
            ];

            unsafe { context.device().update_descriptor_sets(&descriptor_writes, &[]) }
        }

        let sampler_infos = [vk::DescriptorImageInfo::builder()
            .sampler(self.sampler.sampler())
            .build()];

        let image_infos = self
            .textures
            .iter()
            .map(|texture| {
                vk::DescriptorImageInfo::builder()
                    .image_view(texture.view.view())
                    .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                    .build()
            })
            .collect::<Vec<_>>();

        let descriptor_writes = [
            vk::WriteDescriptorSet::builder()
                .dst_set(self.texture_descriptor_set)
                .dst_binding(0)
                .dst_array_element(0)
                .descriptor_type(vk::DescriptorType::SAMPLER)
                .image_info(&sampler_infos)
                .build(),
            vk::WriteDescriptorSet::builder()
                .dst_set(self.texture_descriptor_set)
                .dst_binding(1)
                .dst_array_element(0)
                .descriptor_type(vk::DescriptorType::SAMPLED_IMAGE)
                .image_info(&image_infos)
                .build(),
        ];

        unsafe { context.device().update_descriptor_sets(&descriptor_writes, &[]) }
    }

    pub fn update_frame(&self, frame_index: usize, uniforms: &SceneUniforms) -> Result<()> {
        let frame = self
            .frames
            .get(frame_index)
            .ok_or(Error::MissingFrame { index: frame_index })?;
        frame
            .uniform_buffer
            .upload_to_buffer(&[*uniforms], 0)
            .context(UploadFrameData)
    }
}

pub struct MeshRenderer {
    command_buffer: vk::CommandBuffer,
    pipeline_layout: vk::PipelineLayout,
    frame_descriptor_set: vk::DescriptorSet,
    texture_descriptor_set: vk::DescriptorSet,
}

impl MeshRenderer {
    pub fn new(
        command_buffer: vk::CommandBuffer,
        pipeline: &RenderPipeline,
        pipeline_data: &MeshPipelineData,
        frame_index: usize,
    ) -> Result<Self> {
        let frame = pipeline_data
            .frames
            .get(frame_index)
            .ok_or(Error::MissingFrame { index: frame_index })?;
        Ok(Self {
            command_buffer,
            pipeline_layout: pipeline.pipeline.layout(),
            frame_descriptor_set: frame.descriptor_set,
            texture_descriptor_set: pipeline_data.texture_descriptor_set,
        })
    }

    pub fn draw(&self, device: &ash::Device, pipeline: &RenderPipeline, geometry: &GeometryBuffer) {
        pipeline.bind(device, self.command_buffer);
        geometry.bind(device, self.command_buffer);

        let descriptor_sets = [self.frame_descriptor_set, self.texture_descriptor_set];
        unsafe {
            device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline_layout,
                0,
                &descriptor_sets,
                &[],
            );

            device.cmd_draw_indexed(self.command_buffer, geometry.index_count(), 1, 0, 0, 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn gpu_structs_match_shader_layouts() {
        assert_eq!(mem::size_of::<SceneUniforms>(), 208);
        assert_eq!(mem::size_of::<ObjectData>(), 80);
    }

    #[test]
    fn world_matrix_mirrors_z() {
        let world = ObjectData::world_matrix();
        let point = world * glm::vec4(1.0, 2.0, 3.0, 1.0);
        assert_relative_eq!(point, glm::vec4(1.0, 2.0, -3.0, 1.0));
    }

    #[test]
    fn object_data_drops_out_of_range_texture_indices() {
        let material = MaterialTextures {
            base_colour: 0,
            normal: 3,
            metallic_roughness: 1,
            emissive: -1,
        };
        let object_data = ObjectData::new(&material, 2);
        assert_eq!(object_data.texture_indices, [0, -1, 1, -1]);
    }

    #[test]
    fn pool_holds_one_frame_set_per_frame_and_every_texture() {
        let sizes = descriptor_pool_sizes(2, 5);
        assert_eq!(sizes[0].ty, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(sizes[0].descriptor_count, 2);
        assert_eq!(sizes[1].ty, vk::DescriptorType::STORAGE_BUFFER);
        assert_eq!(sizes[1].descriptor_count, 2);
        assert_eq!(sizes[2].ty, vk::DescriptorType::SAMPLER);
        assert_eq!(sizes[2].descriptor_count, 1);
        assert_eq!(sizes[3].ty, vk::DescriptorType::SAMPLED_IMAGE);
        assert_eq!(sizes[3].descriptor_count, 5);
    }

    #[test]
    fn frame_set_holds_uniforms_then_object_data() {
        let bindings = frame_layout_bindings();
        let stages = vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT;
        assert_eq!(bindings[0].binding, 0);
        assert_eq!(bindings[0].descriptor_type, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(bindings[1].binding, 1);
        assert_eq!(bindings[1].descriptor_type, vk::DescriptorType::STORAGE_BUFFER);
        for binding in bindings.iter() {
            assert_eq!(binding.descriptor_count, 1);
            assert_eq!(binding.stage_flags, stages);
        }
    }

    #[test]
    fn texture_set_holds_a_sampler_and_the_texture_array() {
        let bindings = texture_layout_bindings();
        assert_eq!(bindings[0].binding, 0);
        assert_eq!(bindings[0].descriptor_type, vk::DescriptorType::SAMPLER);
        assert_eq!(bindings[0].descriptor_count, 1);
        assert_eq!(bindings[1].binding, 1);
        assert_eq!(bindings[1].descriptor_type, vk::DescriptorType::SAMPLED_IMAGE);
        assert_eq!(bindings[1].descriptor_count, 16);
        for binding in bindings.iter() {
            assert_eq!(binding.stage_flags, vk::ShaderStageFlags::FRAGMENT);
        }
    }

    #[test]
    fn only_the_texture_array_is_variable_and_partially_bound() {
        let flags = texture_binding_flags();
        assert_eq!(flags.len(), texture_layout_bindings().len());
        assert!(flags[0].is_empty());
        assert_eq!(
            flags[1],
            vk::DescriptorBindingFlags::PARTIALLY_BOUND
                | vk::DescriptorBindingFlags::VARIABLE_DESCRIPTOR_COUNT
        );
    }

    #[test]
    fn pool_has_room_for_every_frame_and_the_texture_set() {
        assert_eq!(descriptor_pool_max_sets(2), 3);
    }
}
