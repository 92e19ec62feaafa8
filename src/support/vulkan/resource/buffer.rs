use crate::vulkan::{CommandPool, VulkanContext};
use ash::vk;
use snafu::{ResultExt, Snafu};
use std::{mem, ptr, sync::Arc};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub enum Error {
    #[snafu(display("Failed to create buffer: {}", source))]
    CreateBuffer { source: vk_mem::Error },

    #[snafu(display("Failed to map buffer memory: {}", source))]
    MapMemory { source: vk_mem::Error },

    #[snafu(display("Failed to copy between buffers: {}", source))]
    CopyBuffer {
        source: crate::vulkan::resource::command_pool::Error,
    },

    #[snafu(display(
        "Upload of {} bytes at offset {} overflows a buffer of {} bytes",
        length,
        offset,
        size
    ))]
    UploadOutOfBounds {
        length: usize,
        offset: usize,
        size: usize,
    },
}

pub struct Buffer {
    buffer: vk::Buffer,
    allocation: vk_mem::Allocation,
    allocation_info: vk_mem::AllocationInfo,
    size: vk::DeviceSize,
    context: Arc<VulkanContext>,
}

impl Buffer {
    pub fn new(
        context: Arc<VulkanContext>,
        allocation_create_info: &vk_mem::AllocationCreateInfo,
        buffer_create_info: &vk::BufferCreateInfo,
    ) -> Result<Self> {
        let (buffer, allocation, allocation_info) = context
            .allocator()
            .create_buffer(buffer_create_info, allocation_create_info)
            .context(CreateBuffer)?;

        Ok(Self {
            buffer,
            allocation,
            allocation_info,
            size: buffer_create_info.size,
            context,
        })
    }

    /// A persistently mapped, host coherent buffer for data the host rewrites every frame.
    pub fn new_mapped_basic(
        context: Arc<VulkanContext>,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        memory_usage: vk_mem::MemoryUsage,
    ) -> Result<Self> {
        let allocation_create_info = vk_mem::AllocationCreateInfo {
            usage: memory_usage,
            flags: vk_mem::AllocationCreateFlags::MAPPED,
            required_flags: vk::MemoryPropertyFlags::HOST_VISIBLE
                | vk::MemoryPropertyFlags::HOST_COHERENT,
            ..Default::default()
        };

        let buffer_create_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .build();

        Self::new(context, &allocation_create_info, &buffer_create_info)
    }

    /// Uploads `data` through a staging buffer into device local memory.
    pub fn device_local(
        context: Arc<VulkanContext>,
        command_pool: &CommandPool,
        usage: vk::BufferUsageFlags,
        data: &[u8],
    ) -> Result<Self> {
        let size = data.len() as vk::DeviceSize;

        let staging_buffer = Self::new_mapped_basic(
            context.clone(),
            size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk_mem::MemoryUsage::CpuOnly,
        )?;
        staging_buffer.upload_to_buffer(data, 0)?;

        let allocation_create_info = vk_mem::AllocationCreateInfo {
            usage: vk_mem::MemoryUsage::GpuOnly,
            ..Default::default()
        };
        let buffer_create_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage | vk::BufferUsageFlags::TRANSFER_DST)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .build();
        let buffer = Self::new(context, &allocation_create_info, &buffer_create_info)?;

        command_pool
            .copy_buffer_to_buffer(staging_buffer.buffer(), buffer.buffer(), size)
            .context(CopyBuffer)?;

        Ok(buffer)
    }

    pub fn upload_to_buffer<T: Copy>(&self, data: &[T], offset: usize) -> Result<()> {
        let length = data.len() * mem::size_of::<T>();
        if offset + length > self.size as usize {
            return UploadOutOfBounds {
                length,
                offset,
                size: self.size as usize,
            }
            .fail();
        }

        let allocator = self.context.allocator();
        let mapped = self.allocation_info.get_mapped_data();
        let persistently_mapped = !mapped.is_null();
        let destination = if persistently_mapped {
            mapped
        } else {
            allocator.map_memory(&self.allocation).context(MapMemory)?
        };

        unsafe {
            ptr::copy_nonoverlapping(
                data.as_ptr() as *const u8,
                destination.add(offset),
                length,
            );
        }

        if !persistently_mapped {
            let _ = allocator.unmap_memory(&self.allocation);
        }

        Ok(())
    }

    pub fn buffer(&self) -> vk::Buffer {
        self.buffer
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        let _ = self
            .context
            .allocator()
            .destroy_buffer(self.buffer, &self.allocation);
    }
}

/// Vertices and indices of one mesh sharing a single device local buffer.
pub struct GeometryBuffer {
    buffer: Buffer,
    vertex_offset: vk::DeviceSize,
    index_offset: vk::DeviceSize,
    index_count: u32,
    index_type: vk::IndexType,
}

impl GeometryBuffer {
    pub fn new(
        context: Arc<VulkanContext>,
        command_pool: &CommandPool,
        bytes: &[u8],
        index_offset: vk::DeviceSize,
        index_count: u32,
        index_type: vk::IndexType,
    ) -> Result<Self> {
        let buffer = Buffer::device_local(
            context,
            command_pool,
            vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::INDEX_BUFFER,
            bytes,
        )?;

        Ok(Self {
            buffer,
            vertex_offset: 0,
            index_offset,
            index_count,
            index_type,
        })
    }

    pub fn bind(&self, device: &ash::Device, command_buffer: vk::CommandBuffer) {
        use ash::version::DeviceV1_0;

        let vertex_buffers = [self.buffer.buffer()];
        let offsets = [self.vertex_offset];
        unsafe {
            device.cmd_bind_vertex_buffers(command_buffer, 0, &vertex_buffers, &offsets);
            device.cmd_bind_index_buffer(
                command_buffer,
                self.buffer.buffer(),
                self.index_offset,
                self.index_type,
            );
        }
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}
