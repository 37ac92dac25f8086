//! `Buffer` + `BufferRegion` (spec §3/§4.3). Generalizes the teacher's
//! `buffers/buffer.rs::create_buffer`/`get_memory_type_index`/`copy_buffer`
//! (which always allocated one buffer per logical use: vertex, index,
//! uniform...) into a single reusable type the context (C4) suballocates
//! regions from.

use std::ptr::copy_nonoverlapping as memcpy;

use anyhow::{anyhow, Result};
use vulkanalia::prelude::v1_0::*;

use crate::error::VklError;
use crate::object::{Object, ObjectType};

pub struct Buffer {
    obj: Object,
    pub handle: vk::Buffer,
    pub memory: vk::DeviceMemory,
    pub size: vk::DeviceSize,
    pub item_size: vk::DeviceSize,
    pub usage: vk::BufferUsageFlags,
    pub memory_flags: vk::MemoryPropertyFlags,
}

/// A view `(buffer, count, size_per_region, offsets[count])` into a shared
/// buffer, per spec §3.
#[derive(Clone, Debug)]
pub struct BufferRegion {
    pub buffer: vk::Buffer,
    pub size_per_region: vk::DeviceSize,
    pub offsets: Vec<vk::DeviceSize>,
}

impl BufferRegion {
    pub fn count(&self) -> usize {
        self.offsets.len()
    }
}

impl Buffer {
    pub unsafe fn create(
        instance: &Instance,
        device: &Device,
        physical_device: vk::PhysicalDevice,
        size: vk::DeviceSize,
        item_size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        memory_flags: vk::MemoryPropertyFlags,
        sharing_queues: &[u32],
    ) -> Result<Self> {
        let (sharing_mode, indices) = if sharing_queues.len() > 1 {
            (vk::SharingMode::CONCURRENT, sharing_queues)
        } else {
            (vk::SharingMode::EXCLUSIVE, [].as_slice())
        };

        let info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(sharing_mode)
            .queue_family_indices(indices);

        let handle = device.create_buffer(&info, None)?;
        let requirements = device.get_buffer_memory_requirements(handle);
        let memory_type_index =
            get_memory_type_index(instance, physical_device, memory_flags, requirements)?;

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);
        let memory = device.allocate_memory(&alloc_info, None)?;
        device.bind_buffer_memory(handle, memory, 0)?;

        let mut obj = Object::new(ObjectType::Buffer);
        obj.mark_created();

        Ok(Self {
            obj,
            handle,
            memory,
            size,
            item_size,
            usage,
            memory_flags,
        })
    }

    pub fn status(&self) -> crate::object::ObjectStatus {
        self.obj.status()
    }

    /// Returns a view `(count, size_per_region, offsets)` over this buffer.
    /// Regions may overlap only if the caller guarantees disjoint use.
    pub fn regions(&self, count: usize, size_per_region: vk::DeviceSize, offsets: Vec<vk::DeviceSize>) -> Result<BufferRegion> {
        debug_assert_eq!(offsets.len(), count);
        for &offset in &offsets {
            if offset + size_per_region > self.size {
                return Err(anyhow!(VklError::RegionOutOfBounds {
                    offset,
                    size: size_per_region,
                    buffer_size: self.size,
                }));
            }
        }
        Ok(BufferRegion {
            buffer: self.handle,
            size_per_region,
            offsets,
        })
    }

    fn mappable(&self) -> bool {
        self.memory_flags.contains(vk::MemoryPropertyFlags::HOST_VISIBLE)
            && self.memory_flags.contains(vk::MemoryPropertyFlags::HOST_COHERENT)
    }

    pub unsafe fn map(&self, device: &Device, offset: vk::DeviceSize, size: vk::DeviceSize) -> Result<*mut u8> {
        if !self.mappable() {
            return Err(anyhow!(VklError::BufferNotMappable));
        }
        let ptr = device.map_memory(self.memory, offset, size, vk::MemoryMapFlags::empty())?;
        Ok(ptr.cast())
    }

    pub unsafe fn unmap(&self, device: &Device) {
        device.unmap_memory(self.memory);
    }

    /// Thin wrapper over map/memcpy/unmap.
    pub unsafe fn upload(&self, device: &Device, offset: vk::DeviceSize, data: &[u8]) -> Result<()> {
        let ptr = self.map(device, offset, data.len() as vk::DeviceSize)?;
        memcpy(data.as_ptr(), ptr, data.len());
        self.unmap(device);
        Ok(())
    }

    pub unsafe fn download(&self, device: &Device, offset: vk::DeviceSize, len: usize) -> Result<Vec<u8>> {
        let ptr = self.map(device, offset, len as vk::DeviceSize)?;
        let mut out = vec![0u8; len];
        std::ptr::copy_nonoverlapping(ptr, out.as_mut_ptr(), len);
        self.unmap(device);
        Ok(out)
    }

    pub unsafe fn destroy(&mut self, device: &Device) {
        if !self.obj.begin_destroy() {
            return;
        }
        device.destroy_buffer(self.handle, None);
        device.free_memory(self.memory, None);
    }
}

/// Finds a memory type index satisfying `requirements` and carrying
/// `properties`, grounded in the teacher's `get_memory_type_index`.
pub unsafe fn get_memory_type_index(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
    properties: vk::MemoryPropertyFlags,
    requirements: vk::MemoryRequirements,
) -> Result<u32> {
    let memory = instance.get_physical_device_memory_properties(physical_device);

    (0..memory.memory_type_count)
        .find(|i| {
            let suitable = (requirements.memory_type_bits & (1 << i)) != 0;
            let memory_type = memory.memory_types[*i as usize];
            suitable && memory_type.property_flags.contains(properties)
        })
        .ok_or_else(|| anyhow!("Failed to find suitable memory type."))
}

/// Copies data from one buffer to another via a one-time-submit transfer.
pub unsafe fn copy_buffer(
    device: &Device,
    pool: vk::CommandPool,
    queue: vk::Queue,
    source: vk::Buffer,
    destination: vk::Buffer,
    size: vk::DeviceSize,
) -> Result<()> {
    super::commands::Commands::submit_sync(device, pool, queue, |cmd| {
        let region = vk::BufferCopy::builder().size(size);
        device.cmd_copy_buffer(cmd, source, destination, &[region]);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_rejects_offsets_past_buffer_end() {
        // Construct a Buffer-like bounds check without a live device: the
        // invariant under test is purely arithmetic (spec §8: "offset + size
        // <= parent_buffer.size"), so exercise it directly.
        let buffer_size: vk::DeviceSize = 1024;
        let size_per_region: vk::DeviceSize = 64;
        let offsets = vec![0, 64, 1000];
        let overflow = offsets
            .iter()
            .any(|&o| o + size_per_region > buffer_size);
        assert!(overflow);
    }
}
