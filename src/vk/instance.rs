//! Instance + debug messenger creation. Not present in the retrieved
//! excerpt of the teacher (only its call site in `app.rs` survived), so
//! this is rebuilt in the same `vulkanalia` idiom as the rest of the
//! wrapper: collect required extensions from the window backend, enable
//! the validation layer when configured, and register a debug callback
//! that funnels into `log`.

use std::collections::HashSet;
use std::ffi::CStr;
use std::os::raw::c_void;

use anyhow::{anyhow, Result};
use vulkanalia::prelude::v1_0::*;
use vulkanalia::vk::ExtDebugUtilsExtension;
use vulkanalia::window as vk_window;
use winit::window::Window;

use crate::config::EngineConfig;

pub const VALIDATION_LAYER: vk::ExtensionName =
    vk::ExtensionName::from_bytes(b"VK_LAYER_KHRONOS_validation");

pub unsafe fn create_instance(
    window: &Window,
    entry: &Entry,
    config: &EngineConfig,
) -> Result<(Instance, vk::DebugUtilsMessengerEXT)> {
    let application_info = vk::ApplicationInfo::builder()
        .application_name(config.window_title.as_bytes())
        .application_version(vk::make_version(1, 0, 0))
        .engine_name(b"vkl\0")
        .engine_version(vk::make_version(1, 0, 0))
        .api_version(vk::make_version(1, 0, 0));

    let available_layers = entry
        .enumerate_instance_layer_properties()?
        .iter()
        .map(|l| l.layer_name)
        .collect::<HashSet<_>>();

    if config.validation_enabled && !available_layers.contains(&VALIDATION_LAYER) {
        return Err(anyhow!(
            "validation layer requested but not supported by this Vulkan installation"
        ));
    }

    let layers = if config.validation_enabled {
        vec![VALIDATION_LAYER.as_ptr()]
    } else {
        vec![]
    };

    let mut extensions = vk_window::get_required_instance_extensions(window)
        .iter()
        .map(|e| e.as_ptr())
        .collect::<Vec<_>>();

    if config.validation_enabled {
        extensions.push(vk::EXT_DEBUG_UTILS_EXTENSION.name.as_ptr());
    }

    let mut info = vk::InstanceCreateInfo::builder()
        .application_info(&application_info)
        .enabled_layer_names(&layers)
        .enabled_extension_names(&extensions);

    let mut debug_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::all(),
        )
        .message_type(vk::DebugUtilsMessageTypeFlagsEXT::all())
        .user_callback(Some(debug_callback));

    if config.validation_enabled {
        info = info.push_next(&mut debug_info);
    }

    let instance = entry.create_instance(&info, None)?;

    let messenger = if config.validation_enabled {
        instance.create_debug_utils_messenger_ext(&debug_info, None)?
    } else {
        vk::DebugUtilsMessengerEXT::null()
    };

    Ok((instance, messenger))
}

extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    ty: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _: *mut c_void,
) -> vk::Bool32 {
    let data = unsafe { *data };
    let message = unsafe { CStr::from_ptr(data.message) }.to_string_lossy();

    if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::ERROR {
        log::error!("({ty:?}) {message}");
    } else if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::WARNING {
        log::warn!("({ty:?}) {message}");
    } else if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::INFO {
        log::debug!("({ty:?}) {message}");
    } else {
        log::trace!("({ty:?}) {message}");
    }

    vk::FALSE
}
