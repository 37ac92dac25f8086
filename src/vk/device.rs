//! Logical device + queues + per-family command pools + descriptor pool
//! (spec §3 "App -> GPU -> Device"). Generalizes the teacher's
//! `device.rs::create_logical_device` (single graphics queue, no pools
//! owned past device creation) into the GPU object spec describes.

use std::collections::HashMap;

use anyhow::Result;
use vulkanalia::prelude::v1_0::*;

use crate::object::{Object, ObjectType};
use crate::vk::queue::{QueueFamilyIndices, QueueKind};

use super::instance::VALIDATION_LAYER;
use super::physical_device::DEVICE_EXTENSIONS;

/// Default descriptor pool sizing: generous enough for the builtin visual
/// set (uniform MVP/viewport blocks, combined image samplers for textures,
/// storage buffers) without per-binding tuning.
const DESCRIPTOR_POOL_UNIFORM_BUFFERS: u32 = 256;
const DESCRIPTOR_POOL_STORAGE_BUFFERS: u32 = 64;
const DESCRIPTOR_POOL_SAMPLERS: u32 = 128;
const DESCRIPTOR_POOL_MAX_SETS: u32 = 256;

pub struct Gpu {
    obj: Object,
    pub physical_device: vk::PhysicalDevice,
    pub device: Device,
    pub queue_indices: QueueFamilyIndices,
    queues: HashMap<QueueKind, vk::Queue>,
    /// One command pool per distinct queue family, keyed by family index.
    command_pools: HashMap<u32, vk::CommandPool>,
    pub descriptor_pool: vk::DescriptorPool,
}

impl Gpu {
    pub unsafe fn create(
        entry: &Entry,
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        validation_enabled: bool,
    ) -> Result<Self> {
        let queue_indices = QueueFamilyIndices::get(instance, physical_device, surface)?;
        let requests = queue_indices.requests();

        let queue_priorities = &[1.0];
        let queue_infos = requests
            .iter()
            .map(|r| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(r.family_index)
                    .queue_priorities(queue_priorities)
            })
            .collect::<Vec<_>>();

        let layers = if validation_enabled {
            vec![VALIDATION_LAYER.as_ptr()]
        } else {
            vec![]
        };

        let mut extensions = DEVICE_EXTENSIONS.iter().map(|e| e.as_ptr()).collect::<Vec<_>>();

        const PORTABILITY_MACOS_VERSION: vulkanalia::Version = vulkanalia::Version::new(1, 3, 216);
        if cfg!(target_os = "macos") && entry.version()? >= PORTABILITY_MACOS_VERSION {
            extensions.push(vk::KHR_PORTABILITY_SUBSET_EXTENSION.name.as_ptr());
        }

        let features = vk::PhysicalDeviceFeatures::builder();

        let info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_layer_names(&layers)
            .enabled_extension_names(&extensions)
            .enabled_features(&features);

        let device = instance.create_device(physical_device, &info, None)?;

        let mut queues = HashMap::new();
        for r in &requests {
            queues.insert(r.kind, device.get_device_queue(r.family_index, 0));
        }

        let mut command_pools = HashMap::new();
        for family in queue_indices.unique_families() {
            let pool_info = vk::CommandPoolCreateInfo::builder()
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
                .queue_family_index(family);
            command_pools.insert(family, device.create_command_pool(&pool_info, None)?);
        }

        let descriptor_pool = create_descriptor_pool(&device)?;

        let mut obj = Object::new(ObjectType::Gpu);
        obj.mark_created();

        Ok(Self {
            obj,
            physical_device,
            device,
            queue_indices,
            queues,
            command_pools,
            descriptor_pool,
        })
    }

    pub fn status(&self) -> crate::object::ObjectStatus {
        self.obj.status()
    }

    pub fn queue(&self, kind: QueueKind) -> Option<vk::Queue> {
        self.queues.get(&kind).copied()
    }

    pub fn command_pool(&self, family_index: u32) -> Option<vk::CommandPool> {
        self.command_pools.get(&family_index).copied()
    }

    pub fn graphics_command_pool(&self) -> vk::CommandPool {
        let family = self
            .queue_indices
            .graphics
            .expect("gpu was created without a graphics queue");
        self.command_pool(family)
            .expect("graphics queue family has no command pool")
    }

    pub unsafe fn destroy(&mut self) {
        if !self.obj.begin_destroy() {
            return;
        }
        self.device.destroy_descriptor_pool(self.descriptor_pool, None);
        for (_, pool) in self.command_pools.drain() {
            self.device.destroy_command_pool(pool, None);
        }
        self.device.destroy_device(None);
    }
}

unsafe fn create_descriptor_pool(device: &Device) -> Result<vk::DescriptorPool> {
    let pool_sizes = [
        vk::DescriptorPoolSize::builder()
            .type_(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(DESCRIPTOR_POOL_UNIFORM_BUFFERS)
            .build(),
        vk::DescriptorPoolSize::builder()
            .type_(vk::DescriptorType::STORAGE_BUFFER)
            .descriptor_count(DESCRIPTOR_POOL_STORAGE_BUFFERS)
            .build(),
        vk::DescriptorPoolSize::builder()
            .type_(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(DESCRIPTOR_POOL_SAMPLERS)
            .build(),
    ];

    let info = vk::DescriptorPoolCreateInfo::builder()
        .pool_sizes(&pool_sizes)
        .max_sets(DESCRIPTOR_POOL_MAX_SETS)
        .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET);

    Ok(device.create_descriptor_pool(&info, None)?)
}
