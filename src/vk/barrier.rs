//! `Barrier` (spec §4.3): accumulate-then-record pipeline barrier,
//! generalizing the inline barrier construction in
//! [`crate::vk::image::Images::transition_layout`] so buffer barriers
//! (context sub-allocation) share the same shape.

use vulkanalia::prelude::v1_0::*;

#[derive(Default)]
pub struct Barrier {
    src_stage: vk::PipelineStageFlags,
    dst_stage: vk::PipelineStageFlags,
    memory: Vec<vk::MemoryBarrier>,
    buffer: Vec<vk::BufferMemoryBarrier>,
    image: Vec<vk::ImageMemoryBarrier>,
}

impl Barrier {
    pub fn new(src_stage: vk::PipelineStageFlags, dst_stage: vk::PipelineStageFlags) -> Self {
        Self {
            src_stage,
            dst_stage,
            ..Default::default()
        }
    }

    pub fn buffer(mut self, barrier: vk::BufferMemoryBarrier) -> Self {
        self.buffer.push(barrier);
        self
    }

    pub fn image(mut self, barrier: vk::ImageMemoryBarrier) -> Self {
        self.image.push(barrier);
        self
    }

    pub unsafe fn record(&self, device: &Device, cmd: vk::CommandBuffer) {
        device.cmd_pipeline_barrier(
            cmd,
            self.src_stage,
            self.dst_stage,
            vk::DependencyFlags::empty(),
            &self.memory,
            &self.buffer,
            &self.image,
        );
    }
}
