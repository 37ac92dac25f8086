//! Vulkan-backed scientific visualization engine core.
//!
//! Module layout mirrors the object graph in spec §3: an [`app::App`] owns
//! the Vulkan instance and a set of [`vk::device::Gpu`]s; each `Gpu` backs
//! zero or more [`canvas::Canvas`]es and one [`context::Context`]; visuals
//! ([`visual::Visual`]) are placed into a [`panel::Grid`] of [`panel::Panel`]s
//! and drawn through builders resolved from [`builtin::BuiltinRegistry`].

pub mod app;
pub mod builtin;
pub mod canvas;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod fifo;
pub mod mvp;
pub mod object;
pub mod panel;
pub mod transforms;
pub mod visual;
pub mod vk;

pub use app::App;
pub use canvas::Canvas;
pub use config::EngineConfig;
pub use context::Context;
pub use error::VklError;
