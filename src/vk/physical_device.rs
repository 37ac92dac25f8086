//! Physical device selection. Generalizes the teacher's
//! `physical_device.rs` (which checked against a single hardcoded
//! `AppData`) into a free function parameterized on the surface, so it can
//! be reused by any `Gpu`.

use std::collections::HashSet;

use anyhow::{anyhow, Result};
use vk::KhrSurfaceExtension;
use vulkanalia::prelude::v1_0::*;

use crate::error::VklError;
use crate::vk::queue::QueueFamilyIndices;
use crate::vk::swapchain::SwapchainSupport;

pub const DEVICE_EXTENSIONS: &[vk::ExtensionName] = &[vk::KHR_SWAPCHAIN_EXTENSION.name];

/// Picks the first physical device that passes `check_physical_device`,
/// logging why each rejected candidate was skipped.
pub unsafe fn pick_physical_device(
    instance: &Instance,
    surface: vk::SurfaceKHR,
) -> Result<vk::PhysicalDevice> {
    for physical_device in instance.enumerate_physical_devices()? {
        let properties = instance.get_physical_device_properties(physical_device);

        if let Err(error) = check_physical_device(instance, physical_device, surface) {
            log::warn!(
                "Skipping physical device ('{}'): {}",
                properties.device_name,
                error
            );
        } else {
            log::info!("Selected physical device ('{}').", properties.device_name);
            return Ok(physical_device);
        }
    }
    Err(anyhow!(VklError::NoSuitableGpu))
}

pub unsafe fn check_physical_device(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> Result<()> {
    QueueFamilyIndices::get(instance, physical_device, surface)?;

    let support = SwapchainSupport::get(instance, physical_device, surface)?;
    if support.formats.is_empty() || support.present_modes.is_empty() {
        return Err(anyhow!(VklError::Suitability("insufficient swapchain support")));
    }

    check_physical_device_extensions(instance, physical_device)?;

    Ok(())
}

pub unsafe fn check_physical_device_extensions(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
) -> Result<()> {
    let extensions = instance
        .enumerate_device_extension_properties(physical_device, None)?
        .iter()
        .map(|e| e.extension_name)
        .collect::<HashSet<_>>();

    if DEVICE_EXTENSIONS.iter().all(|e| extensions.contains(e)) {
        Ok(())
    } else {
        Err(anyhow!(VklError::Suitability(
            "missing required device extensions"
        )))
    }
}
