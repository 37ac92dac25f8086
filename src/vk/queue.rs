//! Queue family resolution. Generalizes the teacher's `QueueFamilyIndices`
//! (hardcoded graphics+present) into spec §3's "ordered sequence of
//! `(queue_type, family_index)` resolved against physical-device families
//! at create time".

use anyhow::{anyhow, Result};
use vk::KhrSurfaceExtension;
use vulkanalia::prelude::v1_0::*;

use crate::error::VklError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum QueueKind {
    Graphics,
    Present,
    Compute,
    Transfer,
}

/// A single `(queue_type, family_index)` resolution, in request order.
#[derive(Copy, Clone, Debug)]
pub struct QueueRequest {
    pub kind: QueueKind,
    pub family_index: u32,
}

/// Resolved queue family indices for the queue kinds a `Gpu` was asked for.
#[derive(Clone, Debug, Default)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
    pub compute: Option<u32>,
}

impl QueueFamilyIndices {
    /// Resolves graphics + present (and, opportunistically, compute) queue
    /// families against `physical_device`'s properties. Present support is
    /// queried against `surface`.
    pub unsafe fn get(
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Self> {
        let properties = instance.get_physical_device_queue_family_properties(physical_device);

        let graphics = properties
            .iter()
            .position(|p| p.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            .map(|i| i as u32);

        let compute = properties
            .iter()
            .position(|p| p.queue_flags.contains(vk::QueueFlags::COMPUTE))
            .map(|i| i as u32);

        let mut present = None;
        for (index, _) in properties.iter().enumerate() {
            if instance.get_physical_device_surface_support_khr(physical_device, index as u32, surface)? {
                present = Some(index as u32);
                break;
            }
        }

        if graphics.is_none() || present.is_none() {
            return Err(anyhow!(VklError::Suitability(
                "missing required graphics/present queue families"
            )));
        }

        Ok(Self {
            graphics,
            present,
            compute,
        })
    }

    /// Ordered request list actually used to create the logical device:
    /// unique family indices only, in first-seen order.
    pub fn requests(&self) -> Vec<QueueRequest> {
        let mut seen = Vec::new();
        let mut out = Vec::new();
        for (kind, idx) in [
            (QueueKind::Graphics, self.graphics),
            (QueueKind::Present, self.present),
            (QueueKind::Compute, self.compute),
        ] {
            if let Some(idx) = idx {
                if !seen.contains(&idx) {
                    seen.push(idx);
                    out.push(QueueRequest {
                        kind,
                        family_index: idx,
                    });
                }
            }
        }
        out
    }

    pub fn unique_families(&self) -> Vec<u32> {
        self.requests().into_iter().map(|r| r.family_index).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_deduplicates_shared_family_indices() {
        let indices = QueueFamilyIndices {
            graphics: Some(0),
            present: Some(0),
            compute: Some(1),
        };
        let requests = indices.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(indices.unique_families(), vec![0, 1]);
    }
}
