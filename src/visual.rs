//! Visuals, sources, and props (spec C7). New relative to the teacher,
//! which bakes a single hardcoded vertex format straight into `Vertex`
//! (`vulkan/vertex.rs`) — here the vertex format is data-driven per
//! builtin visual kind ([`crate::builtin`]), grounded in
//! `original_source/examples/triangle.c`'s `vky_visual_data` call shape.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use vulkanalia::prelude::v1_0::*;

use crate::context::{BufferKind, Context};
use crate::error::VklError;
use crate::object::{Object, ObjectStatus, ObjectType};
use crate::transforms::DataCoords;
use crate::vk::buffer::BufferRegion;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Vertex,
    Index,
    Param,
    Storage,
    Transfer,
    Image,
    FontAtlas,
    Viewport,
    Mvp,
}

/// `(kind, slot_idx, binding_idx, location, shape)` per spec §4.7.
#[derive(Clone, Debug)]
pub struct Source {
    pub kind: SourceKind,
    pub slot_idx: u32,
    pub binding_idx: u32,
    pub location: u32,
    pub item_size: vk::DeviceSize,
    pub region: Option<BufferRegion>,
}

impl Source {
    pub fn new(kind: SourceKind, slot_idx: u32, binding_idx: u32, location: u32, item_size: vk::DeviceSize) -> Self {
        Self {
            kind,
            slot_idx,
            binding_idx,
            location,
            item_size,
            region: None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropKind {
    Pos,
    Color,
    Text,
    MarkerSize,
    LineWidth,
    Cap,
    Model,
    View,
    Proj,
    Time,
    /// Index buffer contents for kinds that draw indexed geometry (`Mesh`),
    /// stored as a dense `u32` array like any other prop.
    Index,
}

#[derive(Copy, Clone, Debug)]
pub enum ItemType {
    F32,
    Vec2F32,
    Vec3F32,
    Vec4F32,
    U32,
}

impl ItemType {
    pub fn size(self) -> usize {
        match self {
            ItemType::F32 => 4,
            ItemType::Vec2F32 => 8,
            ItemType::Vec3F32 => 12,
            ItemType::Vec4F32 => 16,
            ItemType::U32 => 4,
        }
    }
}

/// Latest user values for one prop: a dense typed byte array plus a dirty
/// bit, per spec §4.7. The source it feeds (and the offset/stride within
/// that source) are resolved by the visual's [`Baker`], not stored here.
pub struct Prop {
    pub kind: PropKind,
    pub index: u32,
    pub item_type: ItemType,
    data: Vec<u8>,
    pub dirty: bool,
}

impl Prop {
    pub fn new(kind: PropKind, index: u32, item_type: ItemType) -> Self {
        Self {
            kind,
            index,
            item_type,
            data: Vec::new(),
            dirty: false,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.item_type.size().max(1)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// `visual_data(prop_kind, index, n, ptr)`: copies `n` items into the
    /// prop's array, resizing if needed, and marks it dirty.
    pub fn set_data(&mut self, items: &[u8]) {
        self.data.clear();
        self.data.extend_from_slice(items);
        self.dirty = true;
    }
}

/// Per-visual GPU-facing state a [`Baker`] scatters props into.
pub struct VisualState {
    pub sources: Vec<Source>,
    pub props: Vec<Prop>,
    pub vertex_count: usize,
    pub index_count: usize,
}

impl VisualState {
    pub fn prop_mut(&mut self, kind: PropKind) -> Result<&mut Prop> {
        self.prop_mut_at(kind, 0)
    }

    /// Looks a prop up by `(kind, index)`, per spec §4.7's indexed
    /// `visual_data` calls (e.g. `Segment`'s two `Pos` endpoints, bound as
    /// index 0 and index 1 of the same `PropKind`).
    pub fn prop_mut_at(&mut self, kind: PropKind, index: u32) -> Result<&mut Prop> {
        self.props
            .iter_mut()
            .find(|p| p.kind == kind && p.index == index)
            .ok_or_else(|| anyhow!(VklError::UnknownProp(kind)))
    }

    pub fn source_mut(&mut self, kind: SourceKind) -> Result<&mut Source> {
        self.sources
            .iter_mut()
            .find(|s| s.kind == kind)
            .ok_or_else(|| anyhow!("visual has no source of kind {:?}", kind))
    }
}

/// Maps a [`SourceKind`] to the shared buffer it must land in, per spec
/// §4.4 (each `BufferKind` carries only the usage flags its own kind of
/// binding needs — an index source in the vertex buffer is invalid Vulkan
/// usage).
fn buffer_kind_for(kind: SourceKind) -> Result<BufferKind> {
    match kind {
        SourceKind::Vertex => Ok(BufferKind::Vertex),
        SourceKind::Index => Ok(BufferKind::Index),
        SourceKind::Storage => Ok(BufferKind::Storage),
        SourceKind::Param | SourceKind::Mvp | SourceKind::Viewport => Ok(BufferKind::Uniform),
        SourceKind::Transfer => Ok(BufferKind::Staging),
        SourceKind::Image | SourceKind::FontAtlas => {
            Err(anyhow!("source kind {:?} is backed by the texture registry, not a shared buffer", kind))
        }
    }
}

/// Scatters dirty prop arrays into their target source's staging bytes
/// with the visual-kind-specific stride/format, per spec §4.7 step 1-2.
/// Implementors may call into [`crate::transforms`] for position-kind
/// props before writing.
pub trait Baker: Send + Sync {
    fn bake(&self, state: &mut VisualState, coords: &DataCoords) -> Result<HashMap<SourceKind, Vec<u8>>>;
}

pub struct Visual {
    obj: Object,
    pub kind_name: &'static str,
    pub state: VisualState,
    baker: Box<dyn Baker>,
}

impl Visual {
    pub fn new(kind_name: &'static str, sources: Vec<Source>, props: Vec<Prop>, baker: Box<dyn Baker>) -> Self {
        let mut obj = Object::new(ObjectType::Custom);
        obj.mark_created();
        Self {
            obj,
            kind_name,
            state: VisualState {
                sources,
                props,
                vertex_count: 0,
                index_count: 0,
            },
            baker,
        }
    }

    pub fn status(&self) -> ObjectStatus {
        self.obj.status()
    }

    pub fn visual_data(&mut self, kind: PropKind, items: &[u8]) -> Result<()> {
        self.visual_data_at(kind, 0, items)
    }

    /// `visual_data(prop_kind, index, n, ptr)` (spec §4.7): indexed variant
    /// used by visuals with more than one prop instance of the same kind,
    /// e.g. `Segment`'s start (`index = 0`) and end (`index = 1`) positions.
    pub fn visual_data_at(&mut self, kind: PropKind, index: u32, items: &[u8]) -> Result<()> {
        self.state.prop_mut_at(kind, index)?.set_data(items);
        Ok(())
    }

    /// `visual_update` (spec §4.7): bakes dirty props, uploads through the
    /// shared staging buffer, clears dirty bits, and marks the visual
    /// `NeedUpdate` (this engine's `NEED_REFILL_PROPAGATE`, per the C5
    /// merge of full-update into refill) so the canvas knows to re-record.
    pub unsafe fn visual_update(
        &mut self,
        instance: &Instance,
        device: &Device,
        ctx: &mut Context,
        coords: &DataCoords,
    ) -> Result<bool> {
        if !self.state.props.iter().any(|p| p.dirty) {
            return Ok(false);
        }

        let baked = self.baker.bake(&mut self.state, coords)?;

        for (source_kind, bytes) in &baked {
            let item_size = self
                .state
                .sources
                .iter()
                .find(|s| s.kind == *source_kind)
                .map(|s| s.item_size)
                .ok_or_else(|| anyhow!("baker produced bytes for unregistered source {:?}", source_kind))?;

            let count = bytes.len() / item_size.max(1) as usize;
            let region = ctx.ctx_buffers(buffer_kind_for(*source_kind)?, count.max(1), item_size)?;
            ctx.upload_buffers(instance, device, &region, 0, bytes)?;
            self.state.source_mut(*source_kind)?.region = Some(region);
        }

        for prop in self.state.props.iter_mut() {
            prop.dirty = false;
        }

        self.obj.mark_needs_update();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopBaker;
    impl Baker for NoopBaker {
        fn bake(&self, _state: &mut VisualState, _coords: &DataCoords) -> Result<HashMap<SourceKind, Vec<u8>>> {
            Ok(HashMap::new())
        }
    }

    #[test]
    fn visual_data_marks_prop_dirty_and_resizes() {
        let mut visual = Visual::new(
            "test",
            vec![Source::new(SourceKind::Vertex, 0, 0, 0, 8)],
            vec![Prop::new(PropKind::Pos, 0, ItemType::Vec2F32)],
            Box::new(NoopBaker),
        );

        let floats: [f32; 4] = [0.0, 1.0, 2.0, 3.0];
        let bytes = bytemuck_like_bytes(&floats);
        visual.visual_data(PropKind::Pos, &bytes).unwrap();

        let prop = visual.state.prop_mut(PropKind::Pos).unwrap();
        assert!(prop.dirty);
        assert_eq!(prop.len(), 2);
    }

    #[test]
    fn unknown_prop_kind_is_an_error() {
        let mut visual = Visual::new("test", vec![], vec![], Box::new(NoopBaker));
        assert!(visual.visual_data(PropKind::Color, &[]).is_err());
    }

    #[test]
    fn index_sources_target_the_index_buffer_not_vertex() {
        assert_eq!(buffer_kind_for(SourceKind::Index).unwrap(), BufferKind::Index);
        assert_eq!(buffer_kind_for(SourceKind::Vertex).unwrap(), BufferKind::Vertex);
        assert_eq!(buffer_kind_for(SourceKind::Mvp).unwrap(), BufferKind::Uniform);
        assert_eq!(buffer_kind_for(SourceKind::Storage).unwrap(), BufferKind::Storage);
        assert!(buffer_kind_for(SourceKind::Image).is_err());
    }

    fn bytemuck_like_bytes(floats: &[f32]) -> Vec<u8> {
        floats.iter().flat_map(|f| f.to_le_bytes()).collect()
    }
}
