//! Per-frame synchronization primitives (spec §5 frame loop), grounded in
//! the teacher's `synchronization.rs::create_sync_objects`. Generalized off
//! the fixed `MAX_FRAMES_IN_FLIGHT` constant into a parameter so a canvas
//! can size it from `EngineConfig`.

use anyhow::Result;
use vulkanalia::prelude::v1_0::*;

use crate::object::{Object, ObjectType};

pub struct Semaphores {
    obj: Object,
    pub image_available: Vec<vk::Semaphore>,
    pub render_finished: Vec<vk::Semaphore>,
}

impl Semaphores {
    pub unsafe fn create(device: &Device, frames_in_flight: usize) -> Result<Self> {
        let info = vk::SemaphoreCreateInfo::builder();
        let mut image_available = Vec::with_capacity(frames_in_flight);
        let mut render_finished = Vec::with_capacity(frames_in_flight);
        for _ in 0..frames_in_flight {
            image_available.push(device.create_semaphore(&info, None)?);
            render_finished.push(device.create_semaphore(&info, None)?);
        }

        let mut obj = Object::new(ObjectType::Semaphores);
        obj.mark_created();

        Ok(Self {
            obj,
            image_available,
            render_finished,
        })
    }

    pub fn status(&self) -> crate::object::ObjectStatus {
        self.obj.status()
    }

    pub unsafe fn destroy(&mut self, device: &Device) {
        if !self.obj.begin_destroy() {
            return;
        }
        for s in self.image_available.drain(..) {
            device.destroy_semaphore(s, None);
        }
        for s in self.render_finished.drain(..) {
            device.destroy_semaphore(s, None);
        }
    }
}

pub struct Fences {
    obj: Object,
    /// One signaled fence per frame in flight, waited on before reusing
    /// that frame's command buffer.
    pub in_flight: Vec<vk::Fence>,
    /// Tracks which `in_flight` fence currently owns each swapchain image,
    /// `null` until the image has been used once. Mirrors the teacher's
    /// `image_usage_fences` / `images_in_flight`.
    pub images_in_flight: Vec<vk::Fence>,
}

impl Fences {
    pub unsafe fn create(device: &Device, frames_in_flight: usize, image_count: usize) -> Result<Self> {
        let info = vk::FenceCreateInfo::builder().flags(vk::FenceCreateFlags::SIGNALED);
        let mut in_flight = Vec::with_capacity(frames_in_flight);
        for _ in 0..frames_in_flight {
            in_flight.push(device.create_fence(&info, None)?);
        }

        let mut obj = Object::new(ObjectType::Fences);
        obj.mark_created();

        Ok(Self {
            obj,
            in_flight,
            images_in_flight: vec![vk::Fence::null(); image_count],
        })
    }

    pub fn status(&self) -> crate::object::ObjectStatus {
        self.obj.status()
    }

    pub unsafe fn reset_images_in_flight(&mut self, image_count: usize) {
        self.images_in_flight = vec![vk::Fence::null(); image_count];
    }

    pub unsafe fn destroy(&mut self, device: &Device) {
        if !self.obj.begin_destroy() {
            return;
        }
        for f in self.in_flight.drain(..) {
            device.destroy_fence(f, None);
        }
    }
}
