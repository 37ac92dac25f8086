//! Thin Vulkan object wrappers (spec C3). Each type owns its raw handles
//! and exposes a manual `create`/`destroy` pair mirroring the teacher's
//! `App::destroy` idiom rather than `Drop`, since destruction order is
//! dictated by the dependency graph (spec §3), not scope exit.

pub mod barrier;
pub mod bindings;
pub mod buffer;
pub mod commands;
pub mod device;
pub mod image;
pub mod instance;
pub mod physical_device;
pub mod pipeline;
pub mod queue;
pub mod render_pass;
pub mod sampler;
pub mod submit;
pub mod swapchain;
pub mod sync;
