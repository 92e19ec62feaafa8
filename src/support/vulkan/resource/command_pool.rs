use crate::vulkan::{CurrentFrameSynchronization, VulkanContext};
use ash::{version::DeviceV1_0, vk};
use snafu::{ResultExt, Snafu};
use std::sync::Arc;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub enum Error {
    #[snafu(display("Failed to create command pool: {}", source))]
    CreateCommandPool { source: ash::vk::Result },

    #[snafu(display("Failed to allocate command buffers: {}", source))]
    AllocateCommandBuffers { source: ash::vk::Result },

    #[snafu(display("Failed to begin command buffer: {}", source))]
    BeginCommandBuffer { source: ash::vk::Result },

    #[snafu(display("Failed to end command buffer: {}", source))]
    EndCommandBuffer { source: ash::vk::Result },

    #[snafu(display("Failed to reset command buffer: {}", source))]
    ResetCommandBuffer { source: ash::vk::Result },

    #[snafu(display("Failed to submit command buffer: {}", source))]
    SubmitCommandBuffer { source: ash::vk::Result },

    #[snafu(display("Failed to wait for the graphics queue: {}", source))]
    WaitForQueue { source: ash::vk::Result },

    #[snafu(display("No command buffer has been allocated for index {}", index))]
    MissingCommandBuffer { index: usize },
}

pub struct CommandPool {
    pool: vk::CommandPool,
    command_buffers: Vec<vk::CommandBuffer>,
    context: Arc<VulkanContext>,
}

impl CommandPool {
    pub fn new(context: Arc<VulkanContext>, flags: vk::CommandPoolCreateFlags) -> Result<Self> {
        let graphics_queue_family_index = context
            .physical_device()
            .queue_family_index_set()
            .graphics_queue_family_index();

        let command_pool_info = vk::CommandPoolCreateInfo::builder()
            .queue_family_index(graphics_queue_family_index)
            .flags(flags)
            .build();

        let pool = unsafe {
            context
                .device()
                .create_command_pool(&command_pool_info, None)
                .context(CreateCommandPool)?
        };

        Ok(Self {
            pool,
            command_buffers: Vec::new(),
            context,
        })
    }

    pub fn command_buffer(&self, index: usize) -> Result<vk::CommandBuffer> {
        self.command_buffers
            .get(index)
            .copied()
            .ok_or(Error::MissingCommandBuffer { index })
    }

    pub fn allocate_command_buffers(&mut self, count: u32) -> Result<()> {
        self.clear_command_buffers();

        let allocate_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count)
            .build();

        self.command_buffers = unsafe {
            self.context
                .device()
                .allocate_command_buffers(&allocate_info)
                .context(AllocateCommandBuffers)?
        };

        Ok(())
    }

    pub fn clear_command_buffers(&mut self) {
        if self.command_buffers.is_empty() {
            return;
        }
        unsafe {
            self.context
                .device()
                .free_command_buffers(self.pool, &self.command_buffers);
        }
        self.command_buffers.clear();
    }

    pub fn reset_command_buffer(&self, command_buffer: vk::CommandBuffer) -> Result<()> {
        unsafe {
            self.context
                .device()
                .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())
                .context(ResetCommandBuffer)
        }
    }

    /// Records `executor` into a temporary command buffer, submits it to the
    /// graphics queue and blocks until the queue is idle.
    pub fn execute_command_once<F>(&self, executor: F) -> Result<()>
    where
        F: FnOnce(vk::CommandBuffer),
    {
        let device = self.context.device();
        let queue = self.context.graphics_queue();

        let allocate_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1)
            .build();

        let command_buffers = unsafe {
            device
                .allocate_command_buffers(&allocate_info)
                .context(AllocateCommandBuffers)?
        };
        let command_buffer = command_buffers[0];

        let result = (|| {
            let begin_info = vk::CommandBufferBeginInfo::builder()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)
                .build();
            unsafe {
                device
                    .begin_command_buffer(command_buffer, &begin_info)
                    .context(BeginCommandBuffer)?;
            }

            executor(command_buffer);

            unsafe {
                device
                    .end_command_buffer(command_buffer)
                    .context(EndCommandBuffer)?;
            }

            let submit_info = vk::SubmitInfo::builder()
                .command_buffers(&command_buffers)
                .build();
            unsafe {
                device
                    .queue_submit(queue, &[submit_info], vk::Fence::null())
                    .context(SubmitCommandBuffer)?;
                device.queue_wait_idle(queue).context(WaitForQueue)
            }
        })();

        unsafe {
            device.free_command_buffers(self.pool, &command_buffers);
        }

        result
    }

    pub fn copy_buffer_to_buffer(
        &self,
        source: vk::Buffer,
        destination: vk::Buffer,
        size: vk::DeviceSize,
    ) -> Result<()> {
        let region = vk::BufferCopy::builder()
            .src_offset(0)
            .dst_offset(0)
            .size(size)
            .build();
        let regions = [region];

        self.execute_command_once(|command_buffer| unsafe {
            self.context
                .device()
                .cmd_copy_buffer(command_buffer, source, destination, &regions)
        })
    }

    pub fn copy_buffer_to_image(
        &self,
        buffer: vk::Buffer,
        image: vk::Image,
        regions: &[vk::BufferImageCopy],
    ) -> Result<()> {
        self.execute_command_once(|command_buffer| unsafe {
            self.context.device().cmd_copy_buffer_to_image(
                command_buffer,
                buffer,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                regions,
            )
        })
    }

    pub fn submit_command_buffer(
        &self,
        index: usize,
        queue: vk::Queue,
        wait_stages: &[vk::PipelineStageFlags],
        synchronization: &CurrentFrameSynchronization,
    ) -> Result<()> {
        let image_available_semaphores = [synchronization.image_available()];
        let render_finished_semaphores = [synchronization.render_finished()];
        let command_buffers = [self.command_buffer(index)?];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&image_available_semaphores)
            .wait_dst_stage_mask(wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&render_finished_semaphores)
            .build();

        unsafe {
            self.context
                .device()
                .queue_submit(queue, &[submit_info], synchronization.in_flight())
                .context(SubmitCommandBuffer)
        }
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            self.context.device().destroy_command_pool(self.pool, None);
        }
    }
}
