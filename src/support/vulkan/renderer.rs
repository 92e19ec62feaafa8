use crate::vulkan::{
    core::{sync::synchronization_set, vulkan_swapchain},
    resource::command_pool,
    CommandPool, LogicalDeviceError, SynchronizationSet, SynchronizationSetConstants,
    VulkanContext, VulkanSwapchain,
};
use ash::{version::DeviceV1_0, vk};
use log::{debug, info};
use nalgebra_glm as glm;
use snafu::{ResultExt, Snafu};
use std::{error::Error as StdError, sync::Arc};

type Result<T, E = Error> = std::result::Result<T, E>;

pub type CommandResult = std::result::Result<(), Box<dyn StdError>>;

#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub enum Error {
    #[snafu(display("Failed to create synchronization objects: {}", source))]
    CreateSynchronizationSet {
        source: synchronization_set::Error,
    },

    #[snafu(display("Failed to create command pool: {}", source))]
    CreateCommandPool { source: command_pool::Error },

    #[snafu(display("Failed to create swapchain: {}", source))]
    CreateSwapchain { source: vulkan_swapchain::Error },

    #[snafu(display("Failed to wait for frame: {}", source))]
    FrameFence { source: LogicalDeviceError },

    #[snafu(display("Failed to acquire the next swapchain image: {}", source))]
    AcquireImage { source: ash::vk::Result },

    #[snafu(display("Failed to present the swapchain image: {}", source))]
    PresentImage { source: ash::vk::Result },

    #[snafu(display("Failed to record or submit frame commands: {}", source))]
    FrameCommands { source: command_pool::Error },

    #[snafu(display("Failed to begin command buffer: {}", source))]
    BeginCommandBuffer { source: ash::vk::Result },

    #[snafu(display("Failed to end command buffer: {}", source))]
    EndCommandBuffer { source: ash::vk::Result },

    #[snafu(display("The swapchain has already been released"))]
    SwapchainReleased,
}

/// Hooks the renderer calls while producing a frame.
pub trait Command {
    /// Called once the frame's fence has signaled, before any recording.
    fn prepare_frame(&mut self, _frame_index: usize) -> CommandResult {
        Ok(())
    }

    fn issue_commands(
        &mut self,
        _device: &ash::Device,
        _command_buffer: vk::CommandBuffer,
        _frame_index: usize,
    ) -> CommandResult {
        Ok(())
    }

    fn recreate_pipelines(
        &mut self,
        _context: Arc<VulkanContext>,
        _swapchain: &VulkanSwapchain,
    ) -> CommandResult {
        Ok(())
    }

    /// Destroys everything the command created on the device.
    /// The device is idle when this runs.
    fn release_resources(&mut self) {}
}

#[derive(Debug, Clone, Copy)]
pub struct RendererSettings {
    pub clear_colour: [f32; 4],
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            clear_colour: [0.1, 0.1, 0.1, 1.0],
        }
    }
}

// Swapchain and pools drop before the context they borrow from
pub struct Renderer {
    pub vulkan_swapchain: Option<VulkanSwapchain>,
    pub synchronization_set: SynchronizationSet,
    pub command_pool: CommandPool,
    pub transient_command_pool: CommandPool,
    pub current_frame: usize,
    pub settings: RendererSettings,
    pub context: Arc<VulkanContext>,
}

impl Renderer {
    pub fn new(
        context: Arc<VulkanContext>,
        dimensions: [u32; 2],
        settings: RendererSettings,
    ) -> Result<Self> {
        let synchronization_set =
            SynchronizationSet::new(context.clone()).context(CreateSynchronizationSet)?;

        let mut command_pool = CommandPool::new(
            context.clone(),
            vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
        )
        .context(CreateCommandPool)?;
        command_pool
            .allocate_command_buffers(SynchronizationSet::MAX_FRAMES_IN_FLIGHT)
            .context(CreateCommandPool)?;

        let transient_command_pool =
            CommandPool::new(context.clone(), vk::CommandPoolCreateFlags::TRANSIENT)
                .context(CreateCommandPool)?;

        let vulkan_swapchain =
            Some(VulkanSwapchain::new(context.clone(), dimensions).context(CreateSwapchain)?);

        Ok(Self {
            vulkan_swapchain,
            synchronization_set,
            command_pool,
            transient_command_pool,
            current_frame: 0,
            settings,
            context,
        })
    }

    pub fn vulkan_swapchain(&self) -> Result<&VulkanSwapchain> {
        self.vulkan_swapchain
            .as_ref()
            .ok_or(Error::SwapchainReleased)
    }

    pub fn render(&mut self, window_dimensions: glm::Vec2, command: &mut dyn Command) -> CommandResult {
        if self.vulkan_swapchain.is_none() {
            return Ok(());
        }

        let context = self.context.clone();
        let current_frame_synchronization = self
            .synchronization_set
            .current_frame_synchronization(self.current_frame);

        context
            .logical_device()
            .wait_for_fence(&current_frame_synchronization)
            .context(FrameFence)?;

        command.prepare_frame(self.current_frame)?;

        let image_index_result = self.vulkan_swapchain()?.swapchain.acquire_next_image(
            current_frame_synchronization.image_available(),
            vk::Fence::null(),
        );

        let image_index = match image_index_result {
            Ok((image_index, _)) => image_index,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                self.recreate_swapchain(window_dimensions, command)?;
                return Ok(());
            }
            Err(error) => return Err(Box::new(Error::AcquireImage { source: error })),
        };
        let image_indices = [image_index];

        context
            .logical_device()
            .reset_fence(&current_frame_synchronization)
            .context(FrameFence)?;

        let command_buffer = self
            .command_pool
            .command_buffer(self.current_frame)
            .context(FrameCommands)?;
        self.command_pool
            .reset_command_buffer(command_buffer)
            .context(FrameCommands)?;
        self.record_command_buffer(command_buffer, image_index as usize, command)?;

        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        self.command_pool
            .submit_command_buffer(
                self.current_frame,
                context.graphics_queue(),
                &wait_stages,
                &current_frame_synchronization,
            )
            .context(FrameCommands)?;

        let presentation_result = self.vulkan_swapchain()?.swapchain.present_rendered_image(
            &current_frame_synchronization,
            &image_indices,
            context.present_queue(),
        );

        self.current_frame = (1 + self.current_frame) % SynchronizationSet::MAX_FRAMES_IN_FLIGHT as usize;

        match presentation_result {
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                self.recreate_swapchain(window_dimensions, command)
            }
            Ok(false) => Ok(()),
            Err(error) => Err(Box::new(Error::PresentImage { source: error })),
        }
    }

    pub fn recreate_swapchain(
        &mut self,
        window_dimensions: glm::Vec2,
        command: &mut dyn Command,
    ) -> CommandResult {
        if window_dimensions.x < 1.0 || window_dimensions.y < 1.0 {
            debug!("Window is minimized, deferring swapchain recreation");
            return Ok(());
        }

        self.context.logical_device().wait_idle();

        self.vulkan_swapchain = None;
        let new_swapchain = VulkanSwapchain::new(
            self.context.clone(),
            [window_dimensions.x as _, window_dimensions.y as _],
        )
        .context(CreateSwapchain)?;
        self.vulkan_swapchain = Some(new_swapchain);

        command.recreate_pipelines(self.context.clone(), self.vulkan_swapchain()?)?;
        Ok(())
    }

    /// Waits for the device, lets the command destroy its resources, then
    /// drops the swapchain. Rendering stops after this.
    pub fn release(&mut self, command: &mut dyn Command) {
        info!("Releasing renderer resources");
        self.context.logical_device().wait_idle();
        command.release_resources();
        self.vulkan_swapchain = None;
        self.command_pool.clear_command_buffers();
    }

    pub fn update_viewport(&self, command_buffer: vk::CommandBuffer) -> Result<()> {
        let device = self.context.device();
        let extent = self.vulkan_swapchain()?.swapchain.properties().extent;

        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as _,
            height: extent.height as _,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        let viewports = [viewport];

        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        let scissors = [scissor];

        unsafe {
            device.cmd_set_viewport(command_buffer, 0, &viewports);
            device.cmd_set_scissor(command_buffer, 0, &scissors);
        }

        Ok(())
    }

    fn record_command_buffer(
        &self,
        command_buffer: vk::CommandBuffer,
        image_index: usize,
        command: &mut dyn Command,
    ) -> CommandResult {
        let device = self.context.device();
        let vulkan_swapchain = self.vulkan_swapchain()?;
        let extent = vulkan_swapchain.swapchain.properties().extent;

        let command_buffer_begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)
            .build();
        unsafe {
            device
                .begin_command_buffer(command_buffer, &command_buffer_begin_info)
                .context(BeginCommandBuffer)?;
        }

        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.settings.clear_colour,
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            },
        ];

        let render_pass_begin_info = vk::RenderPassBeginInfo::builder()
            .render_pass(vulkan_swapchain.render_pass.render_pass())
            .framebuffer(vulkan_swapchain.framebuffers[image_index].framebuffer())
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .clear_values(&clear_values)
            .build();

        unsafe {
            device.cmd_begin_render_pass(
                command_buffer,
                &render_pass_begin_info,
                vk::SubpassContents::INLINE,
            );
        }

        self.update_viewport(command_buffer)?;

        let issued = command.issue_commands(device, command_buffer, self.current_frame);

        unsafe {
            device.cmd_end_render_pass(command_buffer);
            device
                .end_command_buffer(command_buffer)
                .context(EndCommandBuffer)?;
        }

        issued
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.context.logical_device().wait_idle();
    }
}
