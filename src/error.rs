//! Crate-level error leaves. Fallible constructors still return
//! `anyhow::Result<T>` exactly as the teacher's `create_*` functions do;
//! these are the typed leaves `anyhow` wraps at the boundary where the
//! caller might reasonably want to match on the failure kind.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VklError {
    #[error("suitability check failed: {0}")]
    Suitability(&'static str),

    #[error("no compatible GPU found")]
    NoSuitableGpu,

    #[error("queue family {0:?} not available on this physical device")]
    MissingQueueFamily(crate::vk::queue::QueueKind),

    #[error("FIFO queue would exceed its hard maximum capacity")]
    FifoOverflow,

    #[error("unknown prop kind {0:?} for this visual")]
    UnknownProp(crate::visual::PropKind),

    #[error("prop {0:?} is not bound to any source")]
    UnboundProp(crate::visual::PropKind),

    #[error("buffer region out of bounds: offset {offset} + size {size} > buffer size {buffer_size}")]
    RegionOutOfBounds {
        offset: u64,
        size: u64,
        buffer_size: u64,
    },

    #[error("attempted to map a buffer that is not host-visible and coherent")]
    BufferNotMappable,

    #[error("descriptor set count must be 1 or equal to the swapchain image count, got {0}")]
    InvalidDescriptorSetCount(u32),

    #[error("panel grid coordinates ({row}, {col}) out of range for a {rows}x{cols} grid")]
    PanelOutOfRange {
        row: u32,
        col: u32,
        rows: u32,
        cols: u32,
    },
}
