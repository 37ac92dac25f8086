//! `Submit` (spec §4.3): accumulates wait/signal semaphores, a wait-stage
//! mask, and command buffers before a single `vkQueueSubmit`, generalizing
//! the inline `SubmitInfo::builder()` calls scattered through the teacher's
//! `app.rs::render` and `buffer.rs::copy_buffer`.

use anyhow::Result;
use vulkanalia::prelude::v1_0::*;

#[derive(Default)]
pub struct Submit {
    wait_semaphores: Vec<vk::Semaphore>,
    wait_stages: Vec<vk::PipelineStageFlags>,
    signal_semaphores: Vec<vk::Semaphore>,
    command_buffers: Vec<vk::CommandBuffer>,
}

impl Submit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wait(mut self, semaphore: vk::Semaphore, stage: vk::PipelineStageFlags) -> Self {
        self.wait_semaphores.push(semaphore);
        self.wait_stages.push(stage);
        self
    }

    pub fn signal(mut self, semaphore: vk::Semaphore) -> Self {
        self.signal_semaphores.push(semaphore);
        self
    }

    pub fn commands(mut self, buffer: vk::CommandBuffer) -> Self {
        self.command_buffers.push(buffer);
        self
    }

    pub unsafe fn submit(&self, device: &Device, queue: vk::Queue, fence: vk::Fence) -> Result<()> {
        let info = vk::SubmitInfo::builder()
            .wait_semaphores(&self.wait_semaphores)
            .wait_dst_stage_mask(&self.wait_stages)
            .command_buffers(&self.command_buffers)
            .signal_semaphores(&self.signal_semaphores);

        device.queue_submit(queue, &[info], fence)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_in_call_order() {
        let submit = Submit::new()
            .wait(vk::Semaphore::null(), vk::PipelineStageFlags::TOP_OF_PIPE)
            .signal(vk::Semaphore::null());
        assert_eq!(submit.wait_semaphores.len(), 1);
        assert_eq!(submit.signal_semaphores.len(), 1);
        assert_eq!(submit.command_buffers.len(), 0);
    }
}
