use super::{fence, semaphore};
use crate::vulkan::{Fence, Semaphore, VulkanContext};
use ash::vk;
use snafu::{ResultExt, Snafu};
use std::sync::Arc;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub enum Error {
    #[snafu(display("Failed to create semaphore: {}", source))]
    SemaphoreCreation { source: semaphore::Error },

    #[snafu(display("Failed to create fence: {}", source))]
    FenceCreation { source: fence::Error },
}

pub trait SynchronizationSetConstants {
    const MAX_FRAMES_IN_FLIGHT: u32;
}

impl SynchronizationSetConstants for SynchronizationSet {
    const MAX_FRAMES_IN_FLIGHT: u32 = 2;
}

pub struct SynchronizationSet {
    image_available_semaphores: Vec<Semaphore>,
    render_finished_semaphores: Vec<Semaphore>,
    in_flight_fences: Vec<Fence>,
}

impl SynchronizationSet {
    pub fn new(context: Arc<VulkanContext>) -> Result<Self> {
        let mut image_available_semaphores = Vec::new();
        let mut render_finished_semaphores = Vec::new();
        let mut in_flight_fences = Vec::new();
        for _ in 0..Self::MAX_FRAMES_IN_FLIGHT {
            image_available_semaphores
                .push(Semaphore::new(context.clone()).context(SemaphoreCreation)?);
            render_finished_semaphores
                .push(Semaphore::new(context.clone()).context(SemaphoreCreation)?);
            // Signaled so the first wait on each frame returns immediately
            in_flight_fences.push(
                Fence::new(context.clone(), vk::FenceCreateFlags::SIGNALED)
                    .context(FenceCreation)?,
            );
        }

        Ok(Self {
            image_available_semaphores,
            render_finished_semaphores,
            in_flight_fences,
        })
    }

    pub fn current_frame_synchronization(&self, current_frame: usize) -> CurrentFrameSynchronization {
        CurrentFrameSynchronization::new(self, current_frame)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CurrentFrameSynchronization {
    image_available: vk::Semaphore,
    render_finished: vk::Semaphore,
    in_flight: vk::Fence,
}

impl CurrentFrameSynchronization {
    pub fn new(synchronization_set: &SynchronizationSet, frame_index: usize) -> Self {
        Self {
            image_available: synchronization_set.image_available_semaphores[frame_index]
                .semaphore(),
            render_finished: synchronization_set.render_finished_semaphores[frame_index]
                .semaphore(),
            in_flight: synchronization_set.in_flight_fences[frame_index].fence(),
        }
    }

    pub fn image_available(&self) -> vk::Semaphore {
        self.image_available
    }

    pub fn render_finished(&self) -> vk::Semaphore {
        self.render_finished
    }

    pub fn in_flight(&self) -> vk::Fence {
        self.in_flight
    }
}
