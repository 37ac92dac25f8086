//! Top-level `App` (spec §3 "App -> GPU -> Device" / §9). Generalizes the
//! teacher's `App::create`/`App::destroy` lifecycle (one hardcoded device,
//! one window) into App owning the Vulkan instance and an array of
//! discovered GPUs, with Canvases as separate containers a caller attaches
//! per window.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use vulkanalia::loader::{LibloadingLoader, LIBRARY};
use vulkanalia::prelude::v1_0::*;
use vulkanalia::vk::ExtDebugUtilsExtension;
use winit::window::Window;

use crate::canvas::{Canvas, CanvasStatus};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::context::{BufferKind, Context};
use crate::object::{Object, ObjectType};
use crate::vk::device::Gpu;
use crate::vk::instance::create_instance;
use crate::vk::physical_device::pick_physical_device;
use crate::vk::queue::QueueKind;

/// Called when the engine hits an unrecoverable condition (spec §9's
/// "central abort hook" redesign note). Defaults to logging and aborting
/// the process; embedders may substitute their own (e.g. to unwind into a
/// host application instead).
pub type AbortHook = Box<dyn Fn(&str) + Send + Sync>;

fn default_abort_hook(message: &str) {
    log::error!("fatal engine error, aborting: {message}");
    std::process::abort();
}

pub struct App {
    obj: Object,
    entry: Entry,
    instance: Instance,
    messenger: vk::DebugUtilsMessengerEXT,
    validation_enabled: bool,
    pub gpus: Vec<Gpu>,
    pub contexts: Vec<Context>,
    canvases: HashMap<usize, (Canvas, usize)>,
    next_canvas_id: usize,
    pub clock: Box<dyn Clock>,
    pub config: EngineConfig,
    abort_hook: AbortHook,
}

impl App {
    pub unsafe fn create(window: &Window, config: EngineConfig) -> Result<Self> {
        let loader = LibloadingLoader::new(LIBRARY)?;
        let entry = Entry::new(loader).map_err(|b| anyhow!("{}", b))?;

        let (instance, messenger) = create_instance(window, &entry, &config)?;

        let mut obj = Object::new(ObjectType::App);
        obj.mark_created();

        Ok(Self {
            obj,
            entry,
            instance,
            messenger,
            validation_enabled: config.validation_enabled,
            gpus: Vec::new(),
            contexts: Vec::new(),
            canvases: HashMap::new(),
            next_canvas_id: 0,
            clock: Box::new(SystemClock::new()),
            config,
            abort_hook: Box::new(default_abort_hook),
        })
    }

    pub fn status(&self) -> crate::object::ObjectStatus {
        self.obj.status()
    }

    pub fn set_abort_hook(&mut self, hook: AbortHook) {
        self.abort_hook = hook;
    }

    pub fn set_clock(&mut self, clock: Box<dyn Clock>) {
        self.clock = clock;
    }

    pub fn abort(&self, message: &str) -> ! {
        (self.abort_hook)(message);
        unreachable!("abort hook must not return");
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Picks a physical device compatible with `surface`, lazily allocates
    /// its logical device and a `Context`, and returns the new GPU's index.
    pub unsafe fn create_gpu(&mut self, surface: vk::SurfaceKHR) -> Result<usize> {
        let physical_device = pick_physical_device(&self.instance, surface)?;
        let gpu = Gpu::create(
            &self.entry,
            &self.instance,
            physical_device,
            surface,
            self.validation_enabled,
        )?;

        let transfer_family = gpu
            .queue_indices
            .graphics
            .ok_or_else(|| anyhow!("gpu has no graphics/transfer-capable queue family"))?;
        let transfer_pool = gpu
            .command_pool(transfer_family)
            .ok_or_else(|| anyhow!("gpu has no command pool for its transfer queue family"))?;
        let transfer_queue = gpu
            .queue(QueueKind::Graphics)
            .ok_or_else(|| anyhow!("gpu has no graphics queue"))?;

        let mut sizes = HashMap::new();
        sizes.insert(BufferKind::Staging, 16 * 1024 * 1024);
        sizes.insert(BufferKind::Vertex, 16 * 1024 * 1024);
        sizes.insert(BufferKind::Index, 4 * 1024 * 1024);
        sizes.insert(BufferKind::Uniform, 1024 * 1024);

        let context = Context::create(
            &self.instance,
            &gpu.device,
            physical_device,
            transfer_pool,
            transfer_queue,
            &sizes,
        )?;

        self.gpus.push(gpu);
        self.contexts.push(context);
        Ok(self.gpus.len() - 1)
    }

    pub unsafe fn create_canvas(&mut self, window: &Window, gpu_index: usize) -> Result<usize> {
        let gpu = self
            .gpus
            .get(gpu_index)
            .ok_or_else(|| anyhow!("no gpu at index {gpu_index}"))?;
        let transfer_pool = gpu
            .command_pool(gpu.queue_indices.graphics.unwrap())
            .ok_or_else(|| anyhow!("gpu has no transfer command pool"))?;

        let canvas = Canvas::create(
            window,
            &self.instance,
            &gpu.device,
            gpu.physical_device,
            &gpu.queue_indices,
            transfer_pool,
            &self.config,
        )?;

        let id = self.next_canvas_id;
        self.next_canvas_id += 1;
        self.canvases.insert(id, (canvas, gpu_index));
        Ok(id)
    }

    pub fn canvas(&self, canvas_id: usize) -> Option<&Canvas> {
        self.canvases.get(&canvas_id).map(|(canvas, _)| canvas)
    }

    pub fn canvas_mut(&mut self, canvas_id: usize) -> Option<&mut Canvas> {
        self.canvases.get_mut(&canvas_id).map(|(canvas, _)| canvas)
    }

    /// Runs one frame for `canvas_id`, recreating the canvas's
    /// swapchain-sized state first if it is `NeedRecreate`. `record` draws
    /// into the given command buffer for swapchain image `image_index`,
    /// given the render pass / framebuffer / extent current *after* any
    /// recreation for this frame — the canvas itself is borrowed for the
    /// duration of `render_frame`, so this indirection is how the caller's
    /// draw logic sees fresh swapchain-sized state without aliasing it.
    pub unsafe fn tick(
        &mut self,
        canvas_id: usize,
        window: &Window,
        mut record: impl FnMut(vk::CommandBuffer, usize, vk::RenderPass, vk::Framebuffer, vk::Extent2D) -> Result<()>,
    ) -> Result<()> {
        let (canvas, gpu_index) = self
            .canvases
            .get_mut(&canvas_id)
            .ok_or_else(|| anyhow!("no canvas {canvas_id}"))?;
        let gpu_index = *gpu_index;
        let gpu = self
            .gpus
            .get(gpu_index)
            .ok_or_else(|| anyhow!("no gpu at index {gpu_index}"))?;

        if canvas.status() == CanvasStatus::NeedRecreate {
            canvas.recreate(window, &self.instance, &gpu.device, gpu.physical_device, &gpu.queue_indices)?;
        }

        let graphics_queue = gpu
            .queue(QueueKind::Graphics)
            .ok_or_else(|| anyhow!("gpu has no graphics queue"))?;
        let present_queue = gpu
            .queue(QueueKind::Present)
            .ok_or_else(|| anyhow!("gpu has no present queue"))?;

        let render_pass = canvas.render_pass.handle;
        let extent = canvas.swapchain.extent;
        let framebuffers = canvas.framebuffers.clone();

        canvas.render_frame(&gpu.device, graphics_queue, present_queue, self.clock.as_ref(), |cmd, idx| {
            record(cmd, idx, render_pass, framebuffers[idx], extent)
        })
    }

    /// Destroys every canvas, context, and GPU in LIFO order, then the
    /// instance itself, matching spec §3's "destruction is LIFO" invariant.
    pub unsafe fn destroy(&mut self) {
        if !self.obj.begin_destroy() {
            return;
        }

        for (_, (mut canvas, gpu_index)) in self.canvases.drain() {
            canvas.destroy(&self.instance, &self.gpus[gpu_index].device);
        }

        for (context, gpu) in self.contexts.iter_mut().zip(self.gpus.iter()) {
            context.destroy(&gpu.device);
        }

        for gpu in self.gpus.iter_mut() {
            gpu.destroy();
        }

        if self.validation_enabled {
            self.instance.destroy_debug_utils_messenger_ext(self.messenger, None);
        }
        self.instance.destroy_instance(None);
    }
}
