//! Command buffer sets (spec §4.3 "Commands"). Generalizes the teacher's
//! `commands.rs::create_command_pool` plus the ad-hoc
//! `begin_single_time_commands`/`end_single_time_commands`/`copy_buffer`
//! trio scattered across `buffer.rs`/`image.rs` into one reusable type:
//! a homogeneous set of `count` command buffers allocated from a single
//! queue family's pool.

use anyhow::Result;
use vulkanalia::prelude::v1_0::*;

use crate::object::{Object, ObjectType};

pub struct Commands {
    obj: Object,
    pool: vk::CommandPool,
    pub buffers: Vec<vk::CommandBuffer>,
}

impl Commands {
    pub unsafe fn create(device: &Device, pool: vk::CommandPool, count: u32) -> Result<Self> {
        let info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        let buffers = device.allocate_command_buffers(&info)?;

        let mut obj = Object::new(ObjectType::Commands);
        obj.mark_created();

        Ok(Self { obj, pool, buffers })
    }

    pub fn status(&self) -> crate::object::ObjectStatus {
        self.obj.status()
    }

    pub unsafe fn begin(&self, device: &Device, index: usize) -> Result<()> {
        let info = vk::CommandBufferBeginInfo::builder();
        device.begin_command_buffer(self.buffers[index], &info)?;
        Ok(())
    }

    pub unsafe fn end(&self, device: &Device, index: usize) -> Result<()> {
        device.end_command_buffer(self.buffers[index])?;
        Ok(())
    }

    pub unsafe fn reset(&self, device: &Device, index: usize) -> Result<()> {
        device.reset_command_buffer(self.buffers[index], vk::CommandBufferResetFlags::empty())?;
        Ok(())
    }

    pub unsafe fn free(&mut self, device: &Device) {
        device.free_command_buffers(self.pool, &self.buffers);
        self.buffers.clear();
    }

    /// Allocates, records, submits, and frees a single one-time-submit
    /// command buffer, waiting idle on `queue` both before and after
    /// submission. Used for transfers only, per spec §4.3.
    pub unsafe fn submit_sync(
        device: &Device,
        pool: vk::CommandPool,
        queue: vk::Queue,
        record: impl FnOnce(vk::CommandBuffer),
    ) -> Result<()> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_pool(pool)
            .command_buffer_count(1);
        let command_buffer = device.allocate_command_buffers(&alloc_info)?[0];

        let begin_info =
            vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        device.begin_command_buffer(command_buffer, &begin_info)?;
        record(command_buffer);
        device.end_command_buffer(command_buffer)?;

        let command_buffers = &[command_buffer];
        let submit_info = vk::SubmitInfo::builder().command_buffers(command_buffers);

        device.queue_submit(queue, &[submit_info], vk::Fence::null())?;
        device.queue_wait_idle(queue)?;

        device.free_command_buffers(pool, command_buffers);

        Ok(())
    }
}
