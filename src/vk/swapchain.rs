//! Swapchain creation. Not present in the retrieved teacher excerpt (only
//! its call sites in `app.rs` survived: `create_swapchain`,
//! `create_swapchain_image_views`); rebuilt in the teacher's idiom —
//! `vulkanalia`'s `KhrSwapchainExtension`, querying `SwapchainSupport` off
//! the physical device, preferring `MAILBOX` present mode with a `FIFO`
//! fallback (the one present mode every Vulkan implementation guarantees).

use anyhow::Result;
use vk::{KhrSurfaceExtension, KhrSwapchainExtension};
use vulkanalia::prelude::v1_0::*;
use winit::window::Window;

use crate::object::{Object, ObjectType};
use crate::vk::queue::QueueFamilyIndices;

#[derive(Clone, Debug)]
pub struct SwapchainSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    pub unsafe fn get(
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Self> {
        Ok(Self {
            capabilities: instance
                .get_physical_device_surface_capabilities_khr(physical_device, surface)?,
            formats: instance
                .get_physical_device_surface_formats_khr(physical_device, surface)?,
            present_modes: instance
                .get_physical_device_surface_present_modes_khr(physical_device, surface)?,
        })
    }
}

fn pick_surface_format(support: &SwapchainSupport) -> vk::SurfaceFormatKHR {
    support
        .formats
        .iter()
        .find(|f| {
            f.format == vk::Format::B8G8R8A8_SRGB
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .copied()
        .unwrap_or(support.formats[0])
}

fn pick_present_mode(support: &SwapchainSupport) -> vk::PresentModeKHR {
    support
        .present_modes
        .iter()
        .copied()
        .find(|m| *m == vk::PresentModeKHR::MAILBOX)
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

fn pick_extent(window: &Window, capabilities: &vk::SurfaceCapabilitiesKHR) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        let size = window.inner_size();
        vk::Extent2D::builder()
            .width(size.width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ))
            .height(size.height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ))
            .build()
    }
}

pub struct Swapchain {
    obj: Object,
    pub handle: vk::SwapchainKHR,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
}

impl Swapchain {
    pub unsafe fn create(
        window: &Window,
        instance: &Instance,
        device: &Device,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        queue_indices: &QueueFamilyIndices,
    ) -> Result<Self> {
        let support = SwapchainSupport::get(instance, physical_device, surface)?;

        let surface_format = pick_surface_format(&support);
        let present_mode = pick_present_mode(&support);
        let extent = pick_extent(window, &support.capabilities);

        let mut image_count = support.capabilities.min_image_count + 1;
        if support.capabilities.max_image_count != 0 {
            image_count = image_count.min(support.capabilities.max_image_count);
        }

        let families = [
            queue_indices.graphics.unwrap(),
            queue_indices.present.unwrap(),
        ];
        let (sharing_mode, queue_family_indices) = if families[0] != families[1] {
            (vk::SharingMode::CONCURRENT, families.as_slice())
        } else {
            (vk::SharingMode::EXCLUSIVE, [].as_slice())
        };

        let info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(queue_family_indices)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        let handle = device.create_swapchain_khr(&info, None)?;
        let images = device.get_swapchain_images_khr(handle)?;
        let image_views = images
            .iter()
            .map(|i| create_view(device, *i, surface_format.format))
            .collect::<Result<Vec<_>>>()?;

        let mut obj = Object::new(ObjectType::Swapchain);
        obj.mark_created();

        Ok(Self {
            obj,
            handle,
            format: surface_format.format,
            extent,
            images,
            image_views,
        })
    }

    pub fn status(&self) -> crate::object::ObjectStatus {
        self.obj.status()
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub unsafe fn destroy(&mut self, device: &Device) {
        if !self.obj.begin_destroy() {
            return;
        }
        for view in self.image_views.drain(..) {
            device.destroy_image_view(view, None);
        }
        device.destroy_swapchain_khr(self.handle, None);
    }
}

unsafe fn create_view(device: &Device, image: vk::Image, format: vk::Format) -> Result<vk::ImageView> {
    let subresource_range = vk::ImageSubresourceRange::builder()
        .aspect_mask(vk::ImageAspectFlags::COLOR)
        .base_mip_level(0)
        .level_count(1)
        .base_array_layer(0)
        .layer_count(1);

    let info = vk::ImageViewCreateInfo::builder()
        .image(image)
        .view_type(vk::ImageViewType::_2D)
        .format(format)
        .subresource_range(subresource_range);

    Ok(device.create_image_view(&info, None)?)
}
