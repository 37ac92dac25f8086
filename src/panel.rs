//! Panel/Grid layout (spec C8), grounded directly in
//! `original_source/include/visky/panel.h`: a 2-level hierarchy (grid of
//! normalized row/column offsets, panels placed within it) with pixel
//! viewport computation done on the CPU, new relative to the teacher
//! (which has no multi-panel concept — `AppData` draws one triangle to
//! the whole swapchain extent).

use anyhow::{anyhow, Result};
use vulkanalia::prelude::v1_0::*;

use crate::context::{BufferKind, Context};
use crate::error::VklError;
use crate::event::Event;
use crate::mvp::Mvp;
use crate::vk::buffer::BufferRegion;

/// Mirrors `VKL_GRID_MAX_ROWS`/`VKL_GRID_MAX_COLS` in
/// `original_source/include/visky/panel.h`.
pub const MAX_GRID_ROWS: u32 = 64;
pub const MAX_GRID_COLS: u32 = 64;
pub const MAX_VISUALS_PER_PANEL: usize = 32;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PanelMode {
    Grid,
    Inset,
    Floating,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SizeUnit {
    Normalized,
    Framebuffer,
    Screen,
}

#[derive(Copy, Clone, Debug, Default)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

/// Pixel rectangle `(x, y, w, h)` computed from a panel's normalized
/// placement against the framebuffer size, minus margins, per spec §4.8.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

/// Receives mouse/key events filtered by panel hit-testing and may write a
/// new MVP on change. Only the interface is specified (spec §4.8 non-goal:
/// controller bodies like pan-zoom/arcball are external collaborators).
pub trait Controller: Send {
    fn on_mouse(&mut self, panel_viewport: Viewport, event: &Event) -> Option<[[f32; 4]; 4]> {
        let _ = (panel_viewport, event);
        None
    }
    fn on_key(&mut self, event: &Event) -> Option<[[f32; 4]; 4]> {
        let _ = event;
        None
    }
}

pub struct Panel {
    pub row: u32,
    pub col: u32,
    pub hspan: u32,
    pub vspan: u32,
    pub mode: PanelMode,
    pub size_unit: SizeUnit,
    pub margins: Margins,
    pub viewport: Viewport,
    pub mvp_region: Option<BufferRegion>,
    pub visual_indices: Vec<usize>,
    pub controller: Option<Box<dyn Controller>>,
}

impl Panel {
    fn new(row: u32, col: u32) -> Self {
        Self {
            row,
            col,
            hspan: 1,
            vspan: 1,
            mode: PanelMode::Grid,
            size_unit: SizeUnit::Normalized,
            margins: Margins::default(),
            viewport: Viewport { x: 0.0, y: 0.0, w: 0.0, h: 0.0 },
            mvp_region: None,
            visual_indices: Vec::new(),
            controller: None,
        }
    }

    pub fn attach_visual(&mut self, visual_index: usize) -> Result<()> {
        if self.visual_indices.len() >= MAX_VISUALS_PER_PANEL {
            return Err(anyhow!("panel already holds the maximum of {} visuals", MAX_VISUALS_PER_PANEL));
        }
        self.visual_indices.push(visual_index);
        Ok(())
    }

    pub fn detach_controller(&mut self) -> Option<Box<dyn Controller>> {
        self.controller.take()
    }

    /// MVP uniform management (spec §4.8): lazily allocates this panel's
    /// uniform region from the shared context on first call, then uploads
    /// `mvp`'s bytes into it every call after. One region per panel, shared
    /// by every visual attached to it.
    pub unsafe fn update_mvp(
        &mut self,
        instance: &Instance,
        device: &Device,
        ctx: &mut Context,
        mvp: &Mvp,
    ) -> Result<&BufferRegion> {
        let bytes = mvp.to_bytes();
        if self.mvp_region.is_none() {
            self.mvp_region = Some(ctx.ctx_buffers(BufferKind::Uniform, 1, bytes.len() as vk::DeviceSize)?);
        }
        let region = self.mvp_region.as_ref().expect("just populated above");
        ctx.upload_buffers(instance, device, region, 0, &bytes)?;
        Ok(self.mvp_region.as_ref().unwrap())
    }
}

/// `Grid(n_rows, n_cols)` (spec §4.8): normalized row/column offsets
/// recomputed from prefix sums of per-row/per-col weights.
pub struct Grid {
    n_rows: u32,
    n_cols: u32,
    row_heights: Vec<f32>,
    col_widths: Vec<f32>,
    xs: Vec<f32>,
    ys: Vec<f32>,
    dirty: bool,
    panels: Vec<Panel>,
}

impl Grid {
    pub fn new(n_rows: u32, n_cols: u32) -> Result<Self> {
        if n_rows == 0 || n_cols == 0 || n_rows > MAX_GRID_ROWS || n_cols > MAX_GRID_COLS {
            return Err(anyhow!(VklError::PanelOutOfRange {
                row: n_rows,
                col: n_cols,
                rows: MAX_GRID_ROWS,
                cols: MAX_GRID_COLS,
            }));
        }

        let row_heights = vec![1.0 / n_rows as f32; n_rows as usize];
        let col_widths = vec![1.0 / n_cols as f32; n_cols as usize];

        let mut grid = Self {
            n_rows,
            n_cols,
            row_heights,
            col_widths,
            xs: Vec::new(),
            ys: Vec::new(),
            dirty: true,
            panels: Vec::new(),
        };
        grid.update();
        Ok(grid)
    }

    pub fn add_panel(&mut self, row: u32, col: u32) -> Result<usize> {
        if row >= self.n_rows || col >= self.n_cols {
            return Err(anyhow!(VklError::PanelOutOfRange {
                row,
                col,
                rows: self.n_rows,
                cols: self.n_cols,
            }));
        }
        self.panels.push(Panel::new(row, col));
        Ok(self.panels.len() - 1)
    }

    pub fn panel(&self, index: usize) -> &Panel {
        &self.panels[index]
    }

    pub fn panel_mut(&mut self, index: usize) -> &mut Panel {
        &mut self.panels[index]
    }

    /// `panel_size(axis, unit, value)`: resizes a row or column and marks
    /// the grid dirty so `update()` recomputes prefix sums before next use.
    pub fn set_row_height(&mut self, row: u32, weight: f32) -> Result<()> {
        let slot = self
            .row_heights
            .get_mut(row as usize)
            .ok_or_else(|| anyhow!(VklError::PanelOutOfRange { row, col: 0, rows: self.n_rows, cols: self.n_cols }))?;
        *slot = weight;
        self.dirty = true;
        Ok(())
    }

    pub fn set_col_width(&mut self, col: u32, weight: f32) -> Result<()> {
        let slot = self
            .col_widths
            .get_mut(col as usize)
            .ok_or_else(|| anyhow!(VklError::PanelOutOfRange { row: 0, col, rows: self.n_rows, cols: self.n_cols }))?;
        *slot = weight;
        self.dirty = true;
        Ok(())
    }

    /// Recomputes normalized `xs`/`ys` prefix sums from the current
    /// row/column weights, normalizing so they sum to 1.
    pub fn update(&mut self) {
        if !self.dirty && self.xs.len() == self.n_cols as usize + 1 {
            return;
        }

        let col_total: f32 = self.col_widths.iter().sum();
        let row_total: f32 = self.row_heights.iter().sum();

        self.xs = std::iter::once(0.0)
            .chain(self.col_widths.iter().scan(0.0, |acc, w| {
                *acc += w / col_total;
                Some(*acc)
            }))
            .collect();

        self.ys = std::iter::once(0.0)
            .chain(self.row_heights.iter().scan(0.0, |acc, h| {
                *acc += h / row_total;
                Some(*acc)
            }))
            .collect();

        self.dirty = false;
    }

    /// Computes each panel's pixel viewport from the grid's normalized
    /// offsets and the framebuffer size, minus margins, per spec §4.8.
    pub fn layout_viewports(&mut self, fb_width: f32, fb_height: f32) {
        self.update();
        let (xs, ys) = (self.xs.clone(), self.ys.clone());
        for panel in self.panels.iter_mut() {
            let col_end = ((panel.col + panel.hspan) as usize).min(xs.len() - 1);
            let row_end = ((panel.row + panel.vspan) as usize).min(ys.len() - 1);

            let nx0 = xs[panel.col as usize];
            let nx1 = xs[col_end];
            let ny0 = ys[panel.row as usize];
            let ny1 = ys[row_end];

            let x = nx0 * fb_width + panel.margins.left;
            let y = ny0 * fb_height + panel.margins.top;
            let w = (nx1 - nx0) * fb_width - panel.margins.left - panel.margins.right;
            let h = (ny1 - ny0) * fb_height - panel.margins.top - panel.margins.bottom;

            panel.viewport = Viewport { x, y, w: w.max(0.0), h: h.max(0.0) };
        }
    }

    /// `vkl_panel_at(grid, pos)`: returns the index of the panel containing
    /// normalized `pos`, ties broken by topmost `Floating` first, then
    /// lowest `(row, col)`, per spec §4.8.
    pub fn panel_at(&self, pos_x: f32, pos_y: f32) -> Option<usize> {
        let mut candidates: Vec<usize> = self
            .panels
            .iter()
            .enumerate()
            .filter(|(_, p)| self.contains(p, pos_x, pos_y))
            .map(|(i, _)| i)
            .collect();

        candidates.sort_by_key(|&i| {
            let p = &self.panels[i];
            let floating_rank = if p.mode == PanelMode::Floating { 0 } else { 1 };
            (floating_rank, p.row, p.col)
        });

        candidates.into_iter().next()
    }

    fn contains(&self, panel: &Panel, pos_x: f32, pos_y: f32) -> bool {
        let col_end = ((panel.col + panel.hspan) as usize).min(self.xs.len() - 1);
        let row_end = ((panel.row + panel.vspan) as usize).min(self.ys.len() - 1);
        let (nx0, nx1) = (self.xs[panel.col as usize], self.xs[col_end]);
        let (ny0, ny1) = (self.ys[panel.row as usize], self.ys[row_end]);
        pos_x >= nx0 && pos_x < nx1 && pos_y >= ny0 && pos_y < ny1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_grid_splits_evenly() {
        let mut grid = Grid::new(2, 2).unwrap();
        grid.layout_viewports(800.0, 600.0);
        let p0 = grid.add_panel(0, 0).unwrap();
        let p1 = grid.add_panel(1, 1).unwrap();
        grid.layout_viewports(800.0, 600.0);
        assert!((grid.panel(p0).viewport.w - 400.0).abs() < 1e-3);
        assert!((grid.panel(p1).viewport.h - 300.0).abs() < 1e-3);
    }

    #[test]
    fn out_of_range_panel_is_rejected() {
        let mut grid = Grid::new(2, 2).unwrap();
        assert!(grid.add_panel(5, 0).is_err());
    }

    #[test]
    fn panel_at_prefers_floating_then_lowest_row_col() {
        let mut grid = Grid::new(2, 2).unwrap();
        let base = grid.add_panel(0, 0).unwrap();
        let floating = grid.add_panel(0, 0).unwrap();
        grid.panel_mut(floating).mode = PanelMode::Floating;
        grid.layout_viewports(800.0, 600.0);

        let hit = grid.panel_at(0.1, 0.1).unwrap();
        assert_eq!(hit, floating);
        assert_ne!(hit, base);
    }

    #[test]
    fn grid_construction_rejects_zero_or_oversized_dimensions() {
        assert!(Grid::new(0, 2).is_err());
        assert!(Grid::new(2, 0).is_err());
        assert!(Grid::new(MAX_GRID_ROWS + 1, 1).is_err());
    }
}
