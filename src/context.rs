//! `Context` (spec C4): per-GPU shared buffers, a bump allocator, and a
//! texture registry. New relative to the teacher, which allocates one
//! `Buffer` per logical use (`create_buffer` called once per vertex/index/
//! uniform buffer in `app.rs`) — `Context` instead owns one shared `Buffer`
//! per kind and hands out growing regions from it, the way the pack's
//! other renderer crates sub-allocate transient upload ranges.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use vulkanalia::prelude::v1_0::*;

use crate::vk::buffer::{Buffer, BufferRegion};
use crate::vk::commands::Commands;
use crate::vk::image::Images;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Staging,
    Vertex,
    Index,
    Uniform,
    Storage,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

struct SharedBuffer {
    buffer: Buffer,
    /// Bump cursor, in bytes, monotonically increasing. This allocator
    /// never frees; a `Context` is rebuilt wholesale on a size-exceeding
    /// resize rather than reclaiming holes, mirroring the teacher's
    /// one-shot buffer creation at startup.
    cursor: vk::DeviceSize,
    #[cfg(debug_assertions)]
    generation: u64,
}

/// Per-GPU shared resource owner (spec §4.4). One `Context` per `Gpu`.
pub struct Context {
    physical_device: vk::PhysicalDevice,
    transfer_pool: vk::CommandPool,
    transfer_queue: vk::Queue,
    buffers: HashMap<BufferKind, SharedBuffer>,
    textures: HashMap<TextureId, Images>,
    next_texture_id: u32,
}

fn usage_for(kind: BufferKind) -> vk::BufferUsageFlags {
    use vk::BufferUsageFlags as F;
    match kind {
        BufferKind::Staging => F::TRANSFER_SRC,
        BufferKind::Vertex => F::VERTEX_BUFFER | F::TRANSFER_DST,
        BufferKind::Index => F::INDEX_BUFFER | F::TRANSFER_DST,
        BufferKind::Uniform => F::UNIFORM_BUFFER | F::TRANSFER_DST,
        BufferKind::Storage => F::STORAGE_BUFFER | F::TRANSFER_DST,
    }
}

fn memory_flags_for(kind: BufferKind) -> vk::MemoryPropertyFlags {
    match kind {
        BufferKind::Staging => {
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT
        }
        _ => vk::MemoryPropertyFlags::DEVICE_LOCAL,
    }
}

impl Context {
    pub unsafe fn create(
        instance: &Instance,
        device: &Device,
        physical_device: vk::PhysicalDevice,
        transfer_pool: vk::CommandPool,
        transfer_queue: vk::Queue,
        initial_sizes: &HashMap<BufferKind, vk::DeviceSize>,
    ) -> Result<Self> {
        let mut buffers = HashMap::new();
        for (&kind, &size) in initial_sizes {
            let buffer = Buffer::create(
                instance,
                device,
                physical_device,
                size,
                1,
                usage_for(kind),
                memory_flags_for(kind),
                &[],
            )?;
            buffers.insert(
                kind,
                SharedBuffer {
                    buffer,
                    cursor: 0,
                    #[cfg(debug_assertions)]
                    generation: 0,
                },
            );
        }

        Ok(Self {
            physical_device,
            transfer_pool,
            transfer_queue,
            buffers,
            textures: HashMap::new(),
            next_texture_id: 0,
        })
    }

    /// Bumps `count` regions of `item_size` bytes each out of the shared
    /// buffer for `kind`, alignment-rounded to `item_size`. Never reuses
    /// space: matches the no-freeing invariant the generation counter below
    /// exists to catch violations of in debug builds.
    pub fn ctx_buffers(
        &mut self,
        kind: BufferKind,
        count: usize,
        item_size: vk::DeviceSize,
    ) -> Result<BufferRegion> {
        let shared = self
            .buffers
            .get_mut(&kind)
            .ok_or_else(|| anyhow!("no shared buffer of kind {:?} registered on this context", kind))?;

        let mut offsets = Vec::with_capacity(count);
        for _ in 0..count {
            let aligned = align_up(shared.cursor, item_size);
            offsets.push(aligned);
            shared.cursor = aligned + item_size;
        }

        if shared.cursor > shared.buffer.size {
            return Err(anyhow!(
                "shared buffer {:?} exhausted: requested up to offset {} but buffer is {} bytes",
                kind,
                shared.cursor,
                shared.buffer.size
            ));
        }

        #[cfg(debug_assertions)]
        {
            shared.generation += 1;
        }

        shared.buffer.regions(count, item_size, offsets)
    }

    /// Stages `data` through the staging buffer and records a transfer-queue
    /// copy into `region`'s backing buffer, submitted synchronously.
    /// Grounded in the teacher's `buffer.rs::copy_buffer`, generalized from
    /// "vertex/index buffer only" to any shared-buffer region.
    pub unsafe fn upload_buffers(
        &mut self,
        instance: &Instance,
        device: &Device,
        region: &BufferRegion,
        region_index: usize,
        data: &[u8],
    ) -> Result<()> {
        let offset = *region
            .offsets
            .get(region_index)
            .ok_or_else(|| anyhow!("region index {} out of range", region_index))?;

        debug_assert!(data.len() as vk::DeviceSize <= region.size_per_region);

        let staging = self
            .buffers
            .get(&BufferKind::Staging)
            .ok_or_else(|| anyhow!("context has no staging buffer configured"))?;
        let _ = instance;
        staging.buffer.upload(device, 0, data)?;

        Commands::submit_sync(device, self.transfer_pool, self.transfer_queue, |cmd| {
            let copy_region = vk::BufferCopy::builder()
                .src_offset(0)
                .dst_offset(offset)
                .size(data.len() as vk::DeviceSize);
            device.cmd_copy_buffer(cmd, staging.buffer.handle, region.buffer, &[copy_region]);
        })
    }

    pub unsafe fn register_texture(&mut self, images: Images) -> TextureId {
        let id = TextureId(self.next_texture_id);
        self.next_texture_id += 1;
        self.textures.insert(id, images);
        id
    }

    pub fn texture(&self, id: TextureId) -> Option<&Images> {
        self.textures.get(&id)
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub unsafe fn destroy(&mut self, device: &Device) {
        for (_, mut shared) in self.buffers.drain() {
            shared.buffer.destroy(device);
        }
        for (_, mut images) in self.textures.drain() {
            images.destroy(device);
        }
    }
}

fn align_up(offset: vk::DeviceSize, align: vk::DeviceSize) -> vk::DeviceSize {
    if align == 0 {
        return offset;
    }
    (offset + align - 1) / align * align
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_to_item_size() {
        assert_eq!(align_up(0, 16), 0);
        assert_eq!(align_up(1, 16), 16);
        assert_eq!(align_up(16, 16), 16);
        assert_eq!(align_up(17, 16), 32);
    }
}
