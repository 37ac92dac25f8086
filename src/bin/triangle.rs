//! Demonstration binary reproducing `original_source/examples/triangle.c`:
//! one window, one panel, one `MeshRaw` visual with three position/color
//! vertices. Grounded in the teacher's `main.rs` `winit` event loop
//! (`AboutToWait` -> redraw request, `RedrawRequested` -> render,
//! `CloseRequested` -> wait idle then destroy).

use anyhow::Result;
use vulkanalia::prelude::v1_0::*;
use vulkanalia::vk::KhrSurfaceExtension;
use vulkanalia::window as vk_window;
use winit::dpi::LogicalSize;
use winit::event::{Event as WinitEvent, WindowEvent};
use winit::event_loop::EventLoop;
use winit::window::WindowBuilder;

use vkl::app::App;
use vkl::builtin::{BuiltinRegistry, VisualFlags, VisualKind};
use vkl::config::EngineConfig;
use vkl::mvp::Mvp;
use vkl::panel::Grid;
use vkl::transforms::{Box3, DataCoords};
use vkl::visual::{PropKind, SourceKind, Visual};
use vkl::vk::bindings::{BindingKind, BindingSlot, Bindings, BoundResource};
use vkl::vk::buffer::BufferRegion;
use vkl::vk::pipeline::{GraphicsPipeline, PipelineSpec};

/// Stride of the `MeshRaw` vertex format: `vec3 pos` + `vec4 color`.
const VERTEX_STRIDE: u32 = 28;

/// Everything the render loop needs each frame, built once at startup.
struct Scene {
    pipeline: GraphicsPipeline,
    bindings: Bindings,
    visual: Visual,
    vertex_region: BufferRegion,
}

fn floats_to_bytes(floats: &[f32]) -> Vec<u8> {
    floats.iter().flat_map(|f| f.to_le_bytes()).collect()
}

unsafe fn build_scene(app: &mut App, gpu_index: usize, canvas_id: usize) -> Result<Scene> {
    let registry = BuiltinRegistry::new();
    let builder = registry.get(VisualKind::MeshRaw, VisualFlags(0))?;

    let instance = app.instance().clone();
    let (render_pass, extent) = {
        let canvas = app.canvas(canvas_id).expect("just created");
        (canvas.render_pass.handle, canvas.swapchain.extent)
    };

    let gpu = &app.gpus[gpu_index];
    let device = gpu.device.clone();
    let descriptor_pool = gpu.descriptor_pool;
    let context = &mut app.contexts[gpu_index];

    let bindings = Bindings::create(
        &device,
        descriptor_pool,
        &[BindingSlot {
            binding: 0,
            kind: BindingKind::UniformBuffer,
            stage: vk::ShaderStageFlags::VERTEX,
        }],
        1,
    )?;

    let mut grid = Grid::new(1, 1)?;
    let panel_index = grid.add_panel(0, 0)?;
    grid.panel_mut(panel_index).attach_visual(0)?;

    let mvp = Mvp::identity(0.0);
    let mvp_region = grid
        .panel_mut(panel_index)
        .update_mvp(&instance, &device, context, &mvp)?
        .clone();
    bindings.update(
        &device,
        0,
        &BoundResource::Buffer {
            buffer: mvp_region.buffer,
            offset: mvp_region.offsets[0],
            range: vkl::mvp::BYTE_SIZE,
        },
    )?;

    let vertex_bindings = [vk::VertexInputBindingDescription::builder()
        .binding(0)
        .stride(VERTEX_STRIDE)
        .input_rate(vk::VertexInputRate::VERTEX)
        .build()];
    let attributes = [
        vk::VertexInputAttributeDescription::builder()
            .binding(0)
            .location(0)
            .format(vk::Format::R32G32B32_SFLOAT)
            .offset(0)
            .build(),
        vk::VertexInputAttributeDescription::builder()
            .binding(0)
            .location(1)
            .format(vk::Format::R32G32B32A32_SFLOAT)
            .offset(12)
            .build(),
    ];
    let spec = PipelineSpec {
        vert_spv: builder.vert_spv,
        frag_spv: builder.frag_spv,
        bindings: &vertex_bindings,
        attributes: &attributes,
        topology: builder.topology,
        polygon_mode: vk::PolygonMode::FILL,
        cull_mode: vk::CullModeFlags::NONE,
        depth_test: true,
        depth_write: true,
        blend_enable: false,
        set_layouts: &[bindings.layout],
    };
    let pipeline = GraphicsPipeline::create(&device, render_pass, extent, &spec)?;

    let mut visual = builder.instantiate();
    let positions: [f32; 9] = [0.0, -0.5, 0.0, 0.5, 0.5, 0.0, -0.5, 0.5, 0.0];
    let colors: [f32; 12] = [
        1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0,
    ];
    visual.visual_data(PropKind::Pos, &floats_to_bytes(&positions))?;
    visual.visual_data(PropKind::Color, &floats_to_bytes(&colors))?;

    let coords = DataCoords::cartesian(Box3::new([-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]));
    let dirty = visual.visual_update(&instance, &device, context, &coords)?;
    if dirty {
        if let Some(canvas) = app.canvas_mut(canvas_id) {
            canvas.request_refill();
        }
    }

    let vertex_region = visual
        .state
        .source_mut(SourceKind::Vertex)?
        .region
        .clone()
        .expect("baked above");

    Ok(Scene {
        pipeline,
        bindings,
        visual,
        vertex_region,
    })
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let config = EngineConfig::default();
    let event_loop = EventLoop::new()?;
    let window = WindowBuilder::new()
        .with_title(config.window_title.clone())
        .with_inner_size(LogicalSize::new(config.window_width, config.window_height))
        .build(&event_loop)?;

    let (mut app, gpu_index, canvas_id, mut scene) = unsafe {
        let mut app = App::create(&window, config)?;

        // Throwaway surface used only to pick a compatible physical device;
        // the canvas below creates its own presentation surface from the
        // same window.
        let probe_surface = vk_window::create_surface(app.instance(), &window, &window)?;
        let gpu_index = app.create_gpu(probe_surface)?;
        app.instance().destroy_surface_khr(probe_surface, None);

        let canvas_id = app.create_canvas(&window, gpu_index)?;
        let scene = build_scene(&mut app, gpu_index, canvas_id)?;

        (app, gpu_index, canvas_id, scene)
    };

    event_loop.run(move |event, elwt| match event {
        WinitEvent::AboutToWait => window.request_redraw(),
        WinitEvent::WindowEvent { event, .. } => match event {
            WindowEvent::RedrawRequested if !elwt.exiting() => {
                let device = app.gpus[gpu_index].device.clone();
                let pipeline_handle = scene.pipeline.handle;
                let pipeline_layout = scene.pipeline.layout;
                let descriptor_sets = scene.bindings.sets.clone();
                let vertex_buffer = scene.vertex_region.buffer;
                let vertex_offset = scene.vertex_region.offsets[0];

                let result = unsafe {
                    app.tick(canvas_id, &window, |cmd, _idx, render_pass, framebuffer, extent| {
                        let clear_values = &[
                            vk::ClearValue {
                                color: vk::ClearColorValue { float32: [0.0, 0.0, 0.0, 1.0] },
                            },
                            vk::ClearValue {
                                depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
                            },
                        ];
                        let render_area = vk::Rect2D::builder()
                            .offset(vk::Offset2D { x: 0, y: 0 })
                            .extent(extent);
                        let info = vk::RenderPassBeginInfo::builder()
                            .render_pass(render_pass)
                            .framebuffer(framebuffer)
                            .render_area(render_area)
                            .clear_values(clear_values);

                        device.cmd_begin_render_pass(cmd, &info, vk::SubpassContents::INLINE);
                        device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline_handle);
                        device.cmd_bind_vertex_buffers(cmd, 0, &[vertex_buffer], &[vertex_offset]);
                        device.cmd_bind_descriptor_sets(
                            cmd,
                            vk::PipelineBindPoint::GRAPHICS,
                            pipeline_layout,
                            0,
                            &descriptor_sets,
                            &[],
                        );
                        device.cmd_draw(cmd, 3, 1, 0, 0);
                        device.cmd_end_render_pass(cmd);
                        Ok(())
                    })
                };
                if let Err(e) = result {
                    app.abort(&format!("frame failed: {e}"));
                }
            }
            WindowEvent::CloseRequested => {
                elwt.exit();
                unsafe {
                    let device = &app.gpus[gpu_index].device;
                    device.device_wait_idle().unwrap();
                    scene.pipeline.destroy(device);
                    scene.bindings.destroy(device);
                    app.destroy();
                }
            }
            _ => {}
        },
        _ => {}
    })?;

    Ok(())
}
