//! Texture sampler (spec §4.3), grounded in the teacher's `create_texture_sampler`.

use anyhow::Result;
use vulkanalia::prelude::v1_0::*;

use crate::object::{Object, ObjectType};

#[derive(Copy, Clone, Debug)]
pub enum Filter {
    Nearest,
    Linear,
}

impl From<Filter> for vk::Filter {
    fn from(f: Filter) -> Self {
        match f {
            Filter::Nearest => vk::Filter::NEAREST,
            Filter::Linear => vk::Filter::LINEAR,
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub enum AddressMode {
    Repeat,
    ClampToEdge,
    ClampToBorder,
}

impl From<AddressMode> for vk::SamplerAddressMode {
    fn from(m: AddressMode) -> Self {
        match m {
            AddressMode::Repeat => vk::SamplerAddressMode::REPEAT,
            AddressMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
            AddressMode::ClampToBorder => vk::SamplerAddressMode::CLAMP_TO_BORDER,
        }
    }
}

pub struct Sampler {
    obj: Object,
    pub handle: vk::Sampler,
}

impl Sampler {
    pub unsafe fn create(device: &Device, filter: Filter, address_mode: AddressMode) -> Result<Self> {
        let filter: vk::Filter = filter.into();
        let address_mode: vk::SamplerAddressMode = address_mode.into();

        let info = vk::SamplerCreateInfo::builder()
            .mag_filter(filter)
            .min_filter(filter)
            .address_mode_u(address_mode)
            .address_mode_v(address_mode)
            .address_mode_w(address_mode)
            .anisotropy_enable(false)
            .max_anisotropy(1.0)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .min_lod(0.0)
            .max_lod(0.0)
            .mip_lod_bias(0.0);

        let handle = device.create_sampler(&info, None)?;

        let mut obj = Object::new(ObjectType::Sampler);
        obj.mark_created();

        Ok(Self { obj, handle })
    }

    pub fn status(&self) -> crate::object::ObjectStatus {
        self.obj.status()
    }

    pub unsafe fn destroy(&mut self, device: &Device) {
        if !self.obj.begin_destroy() {
            return;
        }
        device.destroy_sampler(self.handle, None);
    }
}
