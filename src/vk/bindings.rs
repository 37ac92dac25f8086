//! `Bindings` (spec §4.3 / §7): a descriptor set layout plus a pool of
//! descriptor sets bound to actual resources. Generalizes the teacher's
//! `uniform_buffer.rs::create_descriptor_set_layout`/`create_descriptor_pool`/
//! `create_descriptor_sets` (hardcoded to a single UBO binding, one
//! descriptor set per swapchain image) into a list of typed binding
//! declarations and a reusable resource update.

use anyhow::{anyhow, Result};
use vulkanalia::prelude::v1_0::*;

use crate::error::VklError;
use crate::object::{Object, ObjectType};

#[derive(Copy, Clone, Debug)]
pub enum BindingKind {
    UniformBuffer,
    StorageBuffer,
    CombinedImageSampler,
}

impl From<BindingKind> for vk::DescriptorType {
    fn from(k: BindingKind) -> Self {
        match k {
            BindingKind::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
            BindingKind::StorageBuffer => vk::DescriptorType::STORAGE_BUFFER,
            BindingKind::CombinedImageSampler => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        }
    }
}

/// A single binding slot a visual's pipeline declares, per spec §7
/// ("Bindings describe what a pipeline expects, independent of what is
/// currently bound").
#[derive(Copy, Clone, Debug)]
pub struct BindingSlot {
    pub binding: u32,
    pub kind: BindingKind,
    pub stage: vk::ShaderStageFlags,
}

/// What a `BindingSlot` is currently bound to; exactly one variant must
/// match the slot's `BindingKind`.
pub enum BoundResource {
    Buffer {
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        range: vk::DeviceSize,
    },
    Image {
        view: vk::ImageView,
        sampler: vk::Sampler,
        layout: vk::ImageLayout,
    },
}

pub struct Bindings {
    obj: Object,
    pub layout: vk::DescriptorSetLayout,
    pool: vk::DescriptorPool,
    pub sets: Vec<vk::DescriptorSet>,
    slots: Vec<BindingSlot>,
}

impl Bindings {
    /// `set_count` is 1 (a binding shared across frames) or the swapchain
    /// image count (a per-frame binding, e.g. the MVP UBO), per spec §7.
    pub unsafe fn create(
        device: &Device,
        pool: vk::DescriptorPool,
        slots: &[BindingSlot],
        set_count: u32,
    ) -> Result<Self> {
        let layout_bindings = slots
            .iter()
            .map(|s| {
                vk::DescriptorSetLayoutBinding::builder()
                    .binding(s.binding)
                    .descriptor_type(s.kind.into())
                    .descriptor_count(1)
                    .stage_flags(s.stage)
                    .build()
            })
            .collect::<Vec<_>>();

        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&layout_bindings);
        let layout = device.create_descriptor_set_layout(&layout_info, None)?;

        let layouts = vec![layout; set_count as usize];
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(pool)
            .set_layouts(&layouts);
        let sets = device.allocate_descriptor_sets(&alloc_info)?;

        let mut obj = Object::new(ObjectType::Bindings);
        obj.mark_created();

        Ok(Self {
            obj,
            layout,
            pool,
            sets,
            slots: slots.to_vec(),
        })
    }

    pub fn status(&self) -> crate::object::ObjectStatus {
        self.obj.status()
    }

    /// Rewrites one binding across every descriptor set this `Bindings`
    /// owns with the latest resource reference (spec §4.3: "writes all
    /// descriptor sets with the latest references"). Every set ends up
    /// pointing at the same resource, so whichever set a given frame-in-
    /// flight happens to use always sees current data — callers with a
    /// `set_count > 1` binding (e.g. a per-frame MVP UBO) don't need to
    /// loop over sets themselves. The owner is responsible for calling
    /// `Object::mark_needs_update` afterwards, per spec C1.
    pub unsafe fn update(&self, device: &Device, binding: u32, resource: &BoundResource) -> Result<()> {
        let slot = self
            .slots
            .iter()
            .find(|s| s.binding == binding)
            .ok_or_else(|| anyhow!("no binding slot {} declared", binding))?;

        if self.sets.is_empty() {
            return Err(anyhow!(VklError::InvalidDescriptorSetCount(0)));
        }

        match resource {
            BoundResource::Buffer { buffer, offset, range } => {
                let info = vk::DescriptorBufferInfo::builder()
                    .buffer(*buffer)
                    .offset(*offset)
                    .range(*range);
                let buffer_info = &[info];
                let writes: Vec<_> = self
                    .sets
                    .iter()
                    .map(|&set| {
                        vk::WriteDescriptorSet::builder()
                            .dst_set(set)
                            .dst_binding(binding)
                            .dst_array_element(0)
                            .descriptor_type(slot.kind.into())
                            .buffer_info(buffer_info)
                            .build()
                    })
                    .collect();
                device.update_descriptor_sets(&writes, &[] as &[vk::CopyDescriptorSet]);
            }
            BoundResource::Image { view, sampler, layout } => {
                let info = vk::DescriptorImageInfo::builder()
                    .image_layout(*layout)
                    .image_view(*view)
                    .sampler(*sampler);
                let image_info = &[info];
                let writes: Vec<_> = self
                    .sets
                    .iter()
                    .map(|&set| {
                        vk::WriteDescriptorSet::builder()
                            .dst_set(set)
                            .dst_binding(binding)
                            .dst_array_element(0)
                            .descriptor_type(slot.kind.into())
                            .image_info(image_info)
                            .build()
                    })
                    .collect();
                device.update_descriptor_sets(&writes, &[] as &[vk::CopyDescriptorSet]);
            }
        }

        Ok(())
    }

    pub unsafe fn destroy(&mut self, device: &Device) {
        if !self.obj.begin_destroy() {
            return;
        }
        if !self.sets.is_empty() {
            let _ = device.free_descriptor_sets(self.pool, &self.sets);
        }
        device.destroy_descriptor_set_layout(self.layout, None);
    }
}
