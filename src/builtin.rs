//! Builtin visual registry (spec C9). Grounded in `original_source`'s
//! `VKY_VISUAL_*` kinds and `examples/triangle.c`'s `vky_visual_data` call
//! shape; `MeshRaw` is kept as its own kind (rather than folded into
//! `Mesh`) because that file uses it verbatim for the flat position+color
//! vertex format the teacher's `vertex.rs` hardcodes.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use vulkanalia::prelude::v1_0::*;

use crate::transforms::{transform, DataCoords};
use crate::visual::{Baker, ItemType, Prop, PropKind, Source, SourceKind, Visual, VisualState};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum VisualKind {
    Point,
    Marker,
    Line,
    LineStrip,
    Segment,
    Path,
    Text,
    Image,
    Mesh,
    Polygon,
    Axes2D,
    /// The teacher's original flat position+color vertex format, kept
    /// verbatim since `original_source/examples/triangle.c` builds its
    /// scene from exactly this kind.
    MeshRaw,
}

#[derive(Copy, Clone, Debug, Default)]
pub struct VisualFlags(pub u32);

/// Vertex shader SPIR-V, fragment shader SPIR-V, input topology, and prop
/// schema a builtin visual kind needs to build its pipeline, per spec
/// §4.9 ("each builder attaches the correct shaders, declares sources,
/// prop schema, and baker").
pub struct VisualBuilder {
    pub vert_spv: &'static [u8],
    pub frag_spv: &'static [u8],
    pub topology: vk::PrimitiveTopology,
    make_sources: fn() -> Vec<Source>,
    make_props: fn() -> Vec<Prop>,
    make_baker: fn() -> Box<dyn Baker>,
}

impl VisualBuilder {
    pub fn instantiate(&self) -> Visual {
        Visual::new("builtin", (self.make_sources)(), (self.make_props)(), (self.make_baker)())
    }
}

/// `(kind, flags) -> builder` registry (spec §4.9). Flags are accepted for
/// forward compatibility with kind variants (e.g. marker shapes) but the
/// builtin set registered here does not yet branch on them.
pub struct BuiltinRegistry {
    builders: HashMap<VisualKind, VisualBuilder>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        let mut builders = HashMap::new();
        builders.insert(VisualKind::MeshRaw, mesh_raw_builder());
        builders.insert(VisualKind::Point, point_builder());
        builders.insert(VisualKind::Line, line_builder());
        builders.insert(VisualKind::LineStrip, line_strip_builder());
        builders.insert(VisualKind::Path, path_builder());
        builders.insert(VisualKind::Polygon, polygon_builder());
        builders.insert(VisualKind::Segment, segment_builder());
        builders.insert(VisualKind::Mesh, mesh_builder());
        builders.insert(VisualKind::Marker, marker_builder());
        builders.insert(VisualKind::Text, text_builder());
        builders.insert(VisualKind::Image, image_builder());
        builders.insert(VisualKind::Axes2D, axes_2d_builder());
        Self { builders }
    }

    pub fn get(&self, kind: VisualKind, _flags: VisualFlags) -> Result<&VisualBuilder> {
        self.builders
            .get(&kind)
            .ok_or_else(|| anyhow!("no builtin registered for visual kind {:?}", kind))
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::new()
    }
}

struct PositionColorBaker;

impl Baker for PositionColorBaker {
    fn bake(&self, state: &mut VisualState, coords: &DataCoords) -> Result<HashMap<SourceKind, Vec<u8>>> {
        let positions = read_positions(state.prop_mut(PropKind::Pos)?);

        let mut normalized = Vec::new();
        transform(coords, &positions, &mut normalized);

        let color_prop = state.prop_mut(PropKind::Color)?;
        let colors = color_prop.bytes().to_vec();

        let mut vertex_bytes = Vec::with_capacity(normalized.len() * 28);
        for (i, p) in normalized.iter().enumerate() {
            vertex_bytes.extend_from_slice(&p[0].to_le_bytes());
            vertex_bytes.extend_from_slice(&p[1].to_le_bytes());
            vertex_bytes.extend_from_slice(&p[2].to_le_bytes());
            let color_offset = i * 16;
            if color_offset + 16 <= colors.len() {
                vertex_bytes.extend_from_slice(&colors[color_offset..color_offset + 16]);
            } else {
                vertex_bytes.extend_from_slice(&[0u8; 16]);
            }
        }

        state.vertex_count = normalized.len();

        let mut out = HashMap::new();
        out.insert(SourceKind::Vertex, vertex_bytes);
        Ok(out)
    }
}

fn position_color_sources() -> Vec<Source> {
    vec![
        Source::new(SourceKind::Vertex, 0, 0, 0, 28),
        Source::new(SourceKind::Mvp, 1, 0, 0, crate::mvp::BYTE_SIZE),
    ]
}

fn position_color_props() -> Vec<Prop> {
    vec![
        Prop::new(PropKind::Pos, 0, ItemType::Vec3F32),
        Prop::new(PropKind::Color, 0, ItemType::Vec4F32),
    ]
}

fn mesh_raw_builder() -> VisualBuilder {
    VisualBuilder {
        vert_spv: include_bytes!("shaders/mesh_raw.vert.spv"),
        frag_spv: include_bytes!("shaders/mesh_raw.frag.spv"),
        topology: vk::PrimitiveTopology::TRIANGLE_LIST,
        make_sources: position_color_sources,
        make_props: position_color_props,
        make_baker: || Box::new(PositionColorBaker),
    }
}

fn point_builder() -> VisualBuilder {
    VisualBuilder {
        vert_spv: include_bytes!("shaders/mesh_raw.vert.spv"),
        frag_spv: include_bytes!("shaders/mesh_raw.frag.spv"),
        topology: vk::PrimitiveTopology::POINT_LIST,
        make_sources: position_color_sources,
        make_props: position_color_props,
        make_baker: || Box::new(PositionColorBaker),
    }
}

fn line_builder() -> VisualBuilder {
    VisualBuilder {
        vert_spv: include_bytes!("shaders/mesh_raw.vert.spv"),
        frag_spv: include_bytes!("shaders/mesh_raw.frag.spv"),
        topology: vk::PrimitiveTopology::LINE_LIST,
        make_sources: position_color_sources,
        make_props: position_color_props,
        make_baker: || Box::new(PositionColorBaker),
    }
}

fn line_strip_builder() -> VisualBuilder {
    VisualBuilder {
        vert_spv: include_bytes!("shaders/mesh_raw.vert.spv"),
        frag_spv: include_bytes!("shaders/mesh_raw.frag.spv"),
        topology: vk::PrimitiveTopology::LINE_STRIP,
        make_sources: position_color_sources,
        make_props: position_color_props,
        make_baker: || Box::new(PositionColorBaker),
    }
}

/// Like `LineStrip`, kept as its own kind since `original_source`'s
/// `VKL_VISUAL_PATH` grows joins/width that this engine does not model
/// (an explicit Non-goal); geometrically it is the same connected polyline.
fn path_builder() -> VisualBuilder {
    VisualBuilder {
        vert_spv: include_bytes!("shaders/mesh_raw.vert.spv"),
        frag_spv: include_bytes!("shaders/mesh_raw.frag.spv"),
        topology: vk::PrimitiveTopology::LINE_STRIP,
        make_sources: position_color_sources,
        make_props: position_color_props,
        make_baker: || Box::new(PositionColorBaker),
    }
}

/// Fan-triangulated filled polygon from the same position+color vertex
/// stream as `MeshRaw`; assumes a convex, winding-ordered point set (the
/// triangulation itself is out of scope, matching the "axis-tick algorithm"
/// style Non-goals for derived geometry).
fn polygon_builder() -> VisualBuilder {
    VisualBuilder {
        vert_spv: include_bytes!("shaders/mesh_raw.vert.spv"),
        frag_spv: include_bytes!("shaders/mesh_raw.frag.spv"),
        topology: vk::PrimitiveTopology::TRIANGLE_FAN,
        make_sources: position_color_sources,
        make_props: position_color_props,
        make_baker: || Box::new(PositionColorBaker),
    }
}

/// Two endpoints (`Pos` index 0/1) plus one color per segment, scattered
/// into a flat `LINE_LIST` vertex stream. Grounded in
/// `original_source/cli/test_builtin_visuals.c`'s `test_visuals_segment_raw`
/// (`vkl_visual_data(visual, VKL_PROP_POS, 0, N, pos0)` /
/// `..., 1, N, pos1)`).
struct SegmentBaker;

impl Baker for SegmentBaker {
    fn bake(&self, state: &mut VisualState, coords: &DataCoords) -> Result<HashMap<SourceKind, Vec<u8>>> {
        let pos0 = read_positions(state.prop_mut_at(PropKind::Pos, 0)?);
        let pos1 = read_positions(state.prop_mut_at(PropKind::Pos, 1)?);
        if pos0.len() != pos1.len() {
            return Err(anyhow!("segment endpoints have mismatched lengths"));
        }

        let mut normalized0 = Vec::new();
        transform(coords, &pos0, &mut normalized0);
        let mut normalized1 = Vec::new();
        transform(coords, &pos1, &mut normalized1);

        let colors = state.prop_mut_at(PropKind::Color, 0)?.bytes().to_vec();

        let mut vertex_bytes = Vec::with_capacity(normalized0.len() * 2 * 28);
        for i in 0..normalized0.len() {
            let color_offset = i * 16;
            let color = colors
                .get(color_offset..color_offset + 16)
                .unwrap_or(&[0u8; 16]);
            for p in [normalized0[i], normalized1[i]] {
                vertex_bytes.extend_from_slice(&p[0].to_le_bytes());
                vertex_bytes.extend_from_slice(&p[1].to_le_bytes());
                vertex_bytes.extend_from_slice(&p[2].to_le_bytes());
                vertex_bytes.extend_from_slice(color);
            }
        }

        state.vertex_count = normalized0.len() * 2;

        let mut out = HashMap::new();
        out.insert(SourceKind::Vertex, vertex_bytes);
        Ok(out)
    }
}

fn segment_builder() -> VisualBuilder {
    VisualBuilder {
        vert_spv: include_bytes!("shaders/mesh_raw.vert.spv"),
        frag_spv: include_bytes!("shaders/mesh_raw.frag.spv"),
        topology: vk::PrimitiveTopology::LINE_LIST,
        make_sources: position_color_sources,
        make_props: || {
            vec![
                Prop::new(PropKind::Pos, 0, ItemType::Vec3F32),
                Prop::new(PropKind::Pos, 1, ItemType::Vec3F32),
                Prop::new(PropKind::Color, 0, ItemType::Vec4F32),
            ]
        },
        make_baker: || Box::new(SegmentBaker),
    }
}

/// Position+color vertices plus a `u32` index buffer, for triangle meshes
/// whose connectivity the caller supplies directly (no derived
/// triangulation, unlike `Polygon`'s fan assumption).
struct MeshBaker;

impl Baker for MeshBaker {
    fn bake(&self, state: &mut VisualState, coords: &DataCoords) -> Result<HashMap<SourceKind, Vec<u8>>> {
        let mut out = PositionColorBaker.bake(state, coords)?;
        let index_prop = state.prop_mut_at(PropKind::Index, 0)?;
        state.index_count = index_prop.len();
        out.insert(SourceKind::Index, index_prop.bytes().to_vec());
        Ok(out)
    }
}

fn mesh_builder() -> VisualBuilder {
    VisualBuilder {
        vert_spv: include_bytes!("shaders/mesh_raw.vert.spv"),
        frag_spv: include_bytes!("shaders/mesh_raw.frag.spv"),
        topology: vk::PrimitiveTopology::TRIANGLE_LIST,
        make_sources: || {
            let mut sources = position_color_sources();
            sources.push(Source::new(SourceKind::Index, 2, 0, 0, 4));
            sources
        },
        make_props: || {
            let mut props = position_color_props();
            props.push(Prop::new(PropKind::Index, 0, ItemType::U32));
            props
        },
        make_baker: || Box::new(MeshBaker),
    }
}

/// Position+color vertices with a per-visual point size (spec §4.9
/// `Marker`), grounded in `test_visuals_marker_raw`'s single
/// `VKL_PROP_MARKER_SIZE` value shared by every point.
struct MarkerBaker;

impl Baker for MarkerBaker {
    fn bake(&self, state: &mut VisualState, coords: &DataCoords) -> Result<HashMap<SourceKind, Vec<u8>>> {
        let positions = read_positions(state.prop_mut(PropKind::Pos)?);
        let mut normalized = Vec::new();
        transform(coords, &positions, &mut normalized);

        let colors = state.prop_mut(PropKind::Color)?.bytes().to_vec();
        let size_prop = state.prop_mut(PropKind::MarkerSize)?;
        let size = size_prop
            .bytes()
            .get(0..4)
            .map(|b| f32::from_le_bytes(b.try_into().unwrap()))
            .unwrap_or(10.0);

        let mut vertex_bytes = Vec::with_capacity(normalized.len() * 32);
        for (i, p) in normalized.iter().enumerate() {
            vertex_bytes.extend_from_slice(&p[0].to_le_bytes());
            vertex_bytes.extend_from_slice(&p[1].to_le_bytes());
            vertex_bytes.extend_from_slice(&p[2].to_le_bytes());
            let color_offset = i * 16;
            let color = colors.get(color_offset..color_offset + 16).unwrap_or(&[0u8; 16]);
            vertex_bytes.extend_from_slice(color);
            vertex_bytes.extend_from_slice(&size.to_le_bytes());
        }

        state.vertex_count = normalized.len();

        let mut out = HashMap::new();
        out.insert(SourceKind::Vertex, vertex_bytes);
        Ok(out)
    }
}

fn marker_builder() -> VisualBuilder {
    VisualBuilder {
        vert_spv: include_bytes!("shaders/marker.vert.spv"),
        frag_spv: include_bytes!("shaders/marker.frag.spv"),
        topology: vk::PrimitiveTopology::POINT_LIST,
        make_sources: || vec![Source::new(SourceKind::Vertex, 0, 0, 0, 32), Source::new(SourceKind::Mvp, 1, 0, 0, crate::mvp::BYTE_SIZE)],
        make_props: || {
            vec![
                Prop::new(PropKind::Pos, 0, ItemType::Vec3F32),
                Prop::new(PropKind::Color, 0, ItemType::Vec4F32),
                Prop::new(PropKind::MarkerSize, 0, ItemType::F32),
            ]
        },
        make_baker: || Box::new(MarkerBaker),
    }
}

/// Stub baker for text anchors: emits one degenerate position+color vertex
/// per anchor so the visual participates in the normal bake/upload cycle,
/// without rasterizing glyphs. Font atlases are an explicit Non-goal; the
/// `Text` prop bytes are kept on `VisualState` but not otherwise consumed.
struct TextBaker;

impl Baker for TextBaker {
    fn bake(&self, state: &mut VisualState, coords: &DataCoords) -> Result<HashMap<SourceKind, Vec<u8>>> {
        let positions = read_positions(state.prop_mut(PropKind::Pos)?);
        let mut normalized = Vec::new();
        transform(coords, &positions, &mut normalized);

        let mut vertex_bytes = Vec::with_capacity(normalized.len() * 28);
        for p in &normalized {
            vertex_bytes.extend_from_slice(&p[0].to_le_bytes());
            vertex_bytes.extend_from_slice(&p[1].to_le_bytes());
            vertex_bytes.extend_from_slice(&p[2].to_le_bytes());
            vertex_bytes.extend_from_slice(&1.0f32.to_le_bytes());
            vertex_bytes.extend_from_slice(&1.0f32.to_le_bytes());
            vertex_bytes.extend_from_slice(&1.0f32.to_le_bytes());
            vertex_bytes.extend_from_slice(&1.0f32.to_le_bytes());
        }

        state.vertex_count = normalized.len();

        let mut out = HashMap::new();
        out.insert(SourceKind::Vertex, vertex_bytes);
        Ok(out)
    }
}

fn text_builder() -> VisualBuilder {
    VisualBuilder {
        vert_spv: include_bytes!("shaders/mesh_raw.vert.spv"),
        frag_spv: include_bytes!("shaders/mesh_raw.frag.spv"),
        topology: vk::PrimitiveTopology::POINT_LIST,
        make_sources: position_color_sources,
        make_props: || {
            vec![
                Prop::new(PropKind::Pos, 0, ItemType::Vec3F32),
                Prop::new(PropKind::Text, 0, ItemType::F32),
            ]
        },
        make_baker: || Box::new(TextBaker),
    }
}

/// Textured quad from four corner positions (spec §4.9 `Image`), grounded
/// in the teacher's `image.rs`/`sampler.rs` texture plumbing; the decoded
/// pixel data itself comes from [`crate::context::Context::register_texture`],
/// which stays the caller's responsibility (image decoding beyond `png` is
/// an explicit Non-goal).
struct ImageBaker;

const QUAD_UVS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

impl Baker for ImageBaker {
    fn bake(&self, state: &mut VisualState, coords: &DataCoords) -> Result<HashMap<SourceKind, Vec<u8>>> {
        let positions = read_positions(state.prop_mut(PropKind::Pos)?);
        if positions.len() != 4 {
            return Err(anyhow!("image visual expects exactly 4 corner positions"));
        }
        let mut normalized = Vec::new();
        transform(coords, &positions, &mut normalized);

        let mut vertex_bytes = Vec::with_capacity(4 * 20);
        for (p, uv) in normalized.iter().zip(QUAD_UVS.iter()) {
            vertex_bytes.extend_from_slice(&p[0].to_le_bytes());
            vertex_bytes.extend_from_slice(&p[1].to_le_bytes());
            vertex_bytes.extend_from_slice(&p[2].to_le_bytes());
            vertex_bytes.extend_from_slice(&uv[0].to_le_bytes());
            vertex_bytes.extend_from_slice(&uv[1].to_le_bytes());
        }

        state.vertex_count = 4;

        let mut out = HashMap::new();
        out.insert(SourceKind::Vertex, vertex_bytes);
        Ok(out)
    }
}

fn image_builder() -> VisualBuilder {
    VisualBuilder {
        vert_spv: include_bytes!("shaders/image.vert.spv"),
        frag_spv: include_bytes!("shaders/image.frag.spv"),
        topology: vk::PrimitiveTopology::TRIANGLE_FAN,
        make_sources: || {
            vec![
                Source::new(SourceKind::Vertex, 0, 0, 0, 20),
                Source::new(SourceKind::Mvp, 1, 0, 0, crate::mvp::BYTE_SIZE),
                Source::new(SourceKind::Image, 1, 1, 0, 0),
            ]
        },
        make_props: || vec![Prop::new(PropKind::Pos, 0, ItemType::Vec3F32)],
        make_baker: || Box::new(ImageBaker),
    }
}

/// Tick marks at two levels (major/grid), grounded in
/// `original_source/cli/test_builtin_visuals.c`'s `test_visuals_axes_2D`
/// (`VKL_PROP_POS` at `VKL_AXES_LEVEL_MAJOR`/`VKL_AXES_LEVEL_GRID`). The
/// tick-placement algorithm itself (where ticks go for a given data range)
/// is an explicit Non-goal; this baker only scatters whatever tick
/// positions the caller already computed into a line-list vertex stream,
/// reusing `Line`'s position+color vertex format. `Text` labels are kept on
/// `VisualState` but not rasterized, for the same reason as `Text`.
struct Axes2DBaker;

impl Baker for Axes2DBaker {
    fn bake(&self, state: &mut VisualState, coords: &DataCoords) -> Result<HashMap<SourceKind, Vec<u8>>> {
        let major = read_positions(state.prop_mut_at(PropKind::Pos, AXES_LEVEL_MAJOR)?);
        let grid = read_positions(state.prop_mut_at(PropKind::Pos, AXES_LEVEL_GRID)?);

        let mut all = major;
        all.extend(grid);
        let mut normalized = Vec::new();
        transform(coords, &all, &mut normalized);

        let mut vertex_bytes = Vec::with_capacity(normalized.len() * 28);
        for p in &normalized {
            vertex_bytes.extend_from_slice(&p[0].to_le_bytes());
            vertex_bytes.extend_from_slice(&p[1].to_le_bytes());
            vertex_bytes.extend_from_slice(&p[2].to_le_bytes());
            vertex_bytes.extend_from_slice(&0.0f32.to_le_bytes());
            vertex_bytes.extend_from_slice(&0.0f32.to_le_bytes());
            vertex_bytes.extend_from_slice(&0.0f32.to_le_bytes());
            vertex_bytes.extend_from_slice(&1.0f32.to_le_bytes());
        }

        state.vertex_count = normalized.len();

        let mut out = HashMap::new();
        out.insert(SourceKind::Vertex, vertex_bytes);
        Ok(out)
    }
}

/// Matches `original_source/include/visky/axes.h`'s `VKL_AXES_LEVEL_MAJOR`/
/// `VKL_AXES_LEVEL_GRID` prop indices.
const AXES_LEVEL_MAJOR: u32 = 0;
const AXES_LEVEL_GRID: u32 = 1;

fn axes_2d_builder() -> VisualBuilder {
    VisualBuilder {
        vert_spv: include_bytes!("shaders/mesh_raw.vert.spv"),
        frag_spv: include_bytes!("shaders/mesh_raw.frag.spv"),
        topology: vk::PrimitiveTopology::LINE_LIST,
        make_sources: position_color_sources,
        make_props: || {
            vec![
                Prop::new(PropKind::Pos, AXES_LEVEL_MAJOR, ItemType::Vec3F32),
                Prop::new(PropKind::Pos, AXES_LEVEL_GRID, ItemType::Vec3F32),
                Prop::new(PropKind::Text, 0, ItemType::F32),
            ]
        },
        make_baker: || Box::new(Axes2DBaker),
    }
}

/// Decodes a dense `vec3` prop array into `[f32; 3]` positions, shared by
/// every baker in this module that reads a `Pos` prop.
fn read_positions(prop: &mut Prop) -> Vec<[f32; 3]> {
    prop.bytes()
        .chunks_exact(12)
        .map(|chunk| {
            [
                f32::from_le_bytes(chunk[0..4].try_into().unwrap()),
                f32::from_le_bytes(chunk[4..8].try_into().unwrap()),
                f32::from_le_bytes(chunk[8..12].try_into().unwrap()),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::{Box3, DataCoords};

    #[test]
    fn registry_resolves_mesh_raw() {
        let registry = BuiltinRegistry::new();
        assert!(registry.get(VisualKind::MeshRaw, VisualFlags(0)).is_ok());
    }

    #[test]
    fn registry_resolves_every_visual_kind() {
        let registry = BuiltinRegistry::new();
        for kind in [
            VisualKind::Point,
            VisualKind::Marker,
            VisualKind::Line,
            VisualKind::LineStrip,
            VisualKind::Segment,
            VisualKind::Path,
            VisualKind::Text,
            VisualKind::Image,
            VisualKind::Mesh,
            VisualKind::Polygon,
            VisualKind::Axes2D,
            VisualKind::MeshRaw,
        ] {
            assert!(registry.get(kind, VisualFlags(0)).is_ok(), "{kind:?} should resolve");
        }
    }

    #[test]
    fn position_color_baker_scatters_interleaved_vertices() {
        let mut visual = mesh_raw_builder().instantiate();
        let positions: [f32; 9] = [-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0, 0.0];
        let colors: [f32; 12] = [
            1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0,
        ];
        visual
            .visual_data(PropKind::Pos, &bytes_of(&positions))
            .unwrap();
        visual
            .visual_data(PropKind::Color, &bytes_of(&colors))
            .unwrap();

        let coords = DataCoords::cartesian(Box3::new([-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]));
        let baked = PositionColorBaker
            .bake(&mut visual.state, &coords)
            .unwrap();
        let vertex_bytes = &baked[&SourceKind::Vertex];
        assert_eq!(vertex_bytes.len(), 3 * 28);
    }

    #[test]
    fn segment_baker_emits_two_vertices_per_endpoint_pair() {
        let mut visual = segment_builder().instantiate();
        let pos0: [f32; 6] = [-0.5, 0.0, 0.0, -0.5, 0.5, 0.0];
        let pos1: [f32; 6] = [0.5, 0.0, 0.0, 0.5, 0.5, 0.0];
        let colors: [f32; 8] = [1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0];

        visual.visual_data_at(PropKind::Pos, 0, &bytes_of(&pos0)).unwrap();
        visual.visual_data_at(PropKind::Pos, 1, &bytes_of(&pos1)).unwrap();
        visual.visual_data(PropKind::Color, &bytes_of(&colors)).unwrap();

        let coords = DataCoords::cartesian(Box3::new([-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]));
        let baked = SegmentBaker.bake(&mut visual.state, &coords).unwrap();
        assert_eq!(baked[&SourceKind::Vertex].len(), 2 * 2 * 28);
        assert_eq!(visual.state.vertex_count, 4);
    }

    #[test]
    fn segment_baker_rejects_mismatched_endpoint_counts() {
        let mut visual = segment_builder().instantiate();
        visual.visual_data_at(PropKind::Pos, 0, &bytes_of(&[0.0, 0.0, 0.0])).unwrap();
        visual
            .visual_data_at(PropKind::Pos, 1, &bytes_of(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]))
            .unwrap();
        visual.visual_data(PropKind::Color, &bytes_of(&[1.0, 1.0, 1.0, 1.0])).unwrap();

        let coords = DataCoords::cartesian(Box3::new([-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]));
        assert!(SegmentBaker.bake(&mut visual.state, &coords).is_err());
    }

    #[test]
    fn mesh_baker_carries_index_buffer_through_unchanged() {
        let mut visual = mesh_builder().instantiate();
        let positions: [f32; 9] = [-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0, 0.0];
        let colors: [f32; 12] = [1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0];
        let indices: [u32; 3] = [0, 1, 2];

        visual.visual_data(PropKind::Pos, &bytes_of(&positions)).unwrap();
        visual.visual_data(PropKind::Color, &bytes_of(&colors)).unwrap();
        visual
            .visual_data(PropKind::Index, &indices.iter().flat_map(|i| i.to_le_bytes()).collect::<Vec<_>>())
            .unwrap();

        let coords = DataCoords::cartesian(Box3::new([-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]));
        let baked = MeshBaker.bake(&mut visual.state, &coords).unwrap();
        assert_eq!(baked[&SourceKind::Vertex].len(), 3 * 28);
        assert_eq!(baked[&SourceKind::Index].len(), 3 * 4);
        assert_eq!(visual.state.index_count, 3);
    }

    #[test]
    fn marker_baker_broadcasts_single_size_to_every_point() {
        let mut visual = marker_builder().instantiate();
        let positions: [f32; 6] = [0.0, 0.0, 0.0, 1.0, 1.0, 0.0];
        let colors: [f32; 8] = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0];

        visual.visual_data(PropKind::Pos, &bytes_of(&positions)).unwrap();
        visual.visual_data(PropKind::Color, &bytes_of(&colors)).unwrap();
        visual.visual_data(PropKind::MarkerSize, &20.0f32.to_le_bytes()).unwrap();

        let coords = DataCoords::cartesian(Box3::new([-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]));
        let baked = MarkerBaker.bake(&mut visual.state, &coords).unwrap();
        let vertex_bytes = &baked[&SourceKind::Vertex];
        assert_eq!(vertex_bytes.len(), 2 * 32);
        let first_size = f32::from_le_bytes(vertex_bytes[28..32].try_into().unwrap());
        let second_size = f32::from_le_bytes(vertex_bytes[60..64].try_into().unwrap());
        assert_eq!(first_size, 20.0);
        assert_eq!(second_size, 20.0);
    }

    fn bytes_of(floats: &[f32]) -> Vec<u8> {
        floats.iter().flat_map(|f| f.to_le_bytes()).collect()
    }
}
