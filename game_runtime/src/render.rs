// render.rs - Render surface trait and the headless surfaces
//
// Renderers only observe the frame; they never mutate game state.

use image::{Rgba, RgbaImage};
use rust_maze_generator::{exit_cell, Grid, GridPos};
use std::path::{Path, PathBuf};

use crate::controller::GameState;
use crate::error_handling::{GameError, Result};
use crate::types::BallPose;

/// Everything a surface needs to draw one frame
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub frame: u64,
    pub state: GameState,
    pub intensity: f32,
    pub pose: BallPose,
    pub grid: &'a Grid,
    pub path: &'a [GridPos],
}

pub trait RenderSurface {
    fn render(&mut self, view: &FrameView<'_>) -> Result<()>;

    /// Called once after the last frame
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<R: RenderSurface + ?Sized> RenderSurface for Box<R> {
    fn render(&mut self, view: &FrameView<'_>) -> Result<()> {
        (**self).render(view)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Discards frames, keeping only a count
#[derive(Debug, Default)]
pub struct NullRenderer {
    frames: u64,
    last_intensity: f32,
}

impl NullRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn last_intensity(&self) -> f32 {
        self.last_intensity
    }
}

impl RenderSurface for NullRenderer {
    fn render(&mut self, view: &FrameView<'_>) -> Result<()> {
        self.frames += 1;
        self.last_intensity = view.intensity;
        Ok(())
    }
}

// ============================================================================
// Top-down PNG snapshot
// ============================================================================

const WALL: [u8; 3] = [70, 62, 84];
const FLOOR: [u8; 3] = [222, 216, 200];
const TRAIL: [u8; 3] = [120, 170, 230];
const EXIT: [u8; 3] = [90, 200, 120];
const BALL: [u8; 3] = [210, 60, 50];

/// Light never drops the picture fully to black
const AMBIENT: f32 = 0.2;

/// Longest snapshot side in pixels
pub const MAX_SNAPSHOT_SIDE: u32 = 16_384;

/// Pixel size of a snapshot: `(D + 1)` cells wide so the off-grid exit cell is visible
pub fn snapshot_size(dimension: usize, cell_px: u32) -> Result<(u32, u32)> {
    let too_large = || {
        GameError::Render(format!(
            "snapshot of a {dimension}x{dimension} grid at {cell_px} px per cell exceeds {MAX_SNAPSHOT_SIDE} px"
        ))
    };
    let d = u32::try_from(dimension).map_err(|_| too_large())?;
    let width = d.checked_add(1).and_then(|w| w.checked_mul(cell_px)).ok_or_else(too_large)?;
    let height = d.checked_mul(cell_px).ok_or_else(too_large)?;
    if width > MAX_SNAPSHOT_SIDE || height > MAX_SNAPSHOT_SIDE {
        return Err(too_large());
    }
    Ok((width, height))
}

/// What the last `render` call saw
#[derive(Debug, Clone)]
struct LastFrame {
    grid: Grid,
    path: Vec<GridPos>,
    pose: BallPose,
    intensity: f32,
}

/// Keeps the last rendered frame and rasterizes a top-down view of it on `finish`.
///
/// +y points up in the image.
pub struct SnapshotRenderer {
    output: PathBuf,
    cell_px: u32,
    last: Option<LastFrame>,
    frames: u64,
}

impl SnapshotRenderer {
    pub fn new(output: impl Into<PathBuf>, cell_px: u32) -> Self {
        Self {
            output: output.into(),
            cell_px: cell_px.max(1),
            last: None,
            frames: 0,
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Rasterizes the last rendered frame, if any
    pub fn snapshot(&self) -> Option<RgbaImage> {
        self.last.as_ref().map(|last| self.rasterize(last))
    }

    fn shade(color: [u8; 3], intensity: f32) -> Rgba<u8> {
        let k = AMBIENT + (1.0 - AMBIENT) * intensity.clamp(0.0, 1.0);
        let [r, g, b] = color.map(|c| (c as f32 * k).round() as u8);
        Rgba([r, g, b, 255])
    }

    fn fill_cell(&self, img: &mut RgbaImage, cell: GridPos, dimension: usize, color: Rgba<u8>) {
        if cell.x < 0 || cell.y < 0 || cell.x > dimension as i64 || cell.y >= dimension as i64 {
            return;
        }
        let s = self.cell_px;
        let px = cell.x as u32 * s;
        let py = (dimension as u32 - 1 - cell.y as u32) * s;
        for dy in 0..s {
            for dx in 0..s {
                img.put_pixel(px + dx, py + dy, color);
            }
        }
    }

    /// `frame` sizes were checked in `render`
    fn rasterize(&self, frame: &LastFrame) -> RgbaImage {
        let d = frame.grid.dimension();
        let s = self.cell_px;
        let light = frame.intensity;
        let mut img = RgbaImage::from_pixel((d as u32 + 1) * s, d as u32 * s, Self::shade(FLOOR, light));

        let wall = Self::shade(WALL, light);
        for x in 0..d as i64 {
            for y in 0..d as i64 {
                let cell = GridPos::new(x, y);
                if frame.grid.is_wall(cell) {
                    self.fill_cell(&mut img, cell, d, wall);
                }
            }
        }

        let trail = Self::shade(TRAIL, light);
        for &cell in &frame.path {
            self.fill_cell(&mut img, cell, d, trail);
        }
        self.fill_cell(&mut img, exit_cell(d), d, Self::shade(EXIT, light));

        // Ball disc, radius a quarter cell
        let ball = Self::shade(BALL, light);
        let cx = (frame.pose.position.x + 0.5) * s as f32;
        let cy = (d as f32 - 0.5 - frame.pose.position.y) * s as f32;
        let r = (s as f32 * 0.25).max(1.0);
        let (w, h) = img.dimensions();
        let x0 = (cx - r).floor().max(0.0) as u32;
        let y0 = (cy - r).floor().max(0.0) as u32;
        let x1 = ((cx + r).ceil().max(0.0) as u32).min(w);
        let y1 = ((cy + r).ceil().max(0.0) as u32).min(h);
        for py in y0..y1 {
            for px in x0..x1 {
                let (fx, fy) = (px as f32 + 0.5 - cx, py as f32 + 0.5 - cy);
                if fx * fx + fy * fy <= r * r {
                    img.put_pixel(px, py, ball);
                }
            }
        }
        img
    }
}

impl RenderSurface for SnapshotRenderer {
    fn render(&mut self, view: &FrameView<'_>) -> Result<()> {
        if view.grid.dimension() == 0 {
            return Err(GameError::Render("cannot rasterize an empty grid".to_string()));
        }
        snapshot_size(view.grid.dimension(), self.cell_px)?;

        match self.last.as_mut() {
            Some(last) => {
                if last.grid != *view.grid {
                    last.grid = view.grid.clone();
                }
                last.path.clear();
                last.path.extend_from_slice(view.path);
                last.pose = view.pose;
                last.intensity = view.intensity;
            }
            None => {
                self.last = Some(LastFrame {
                    grid: view.grid.clone(),
                    path: view.path.to_vec(),
                    pose: view.pose,
                    intensity: view.intensity,
                })
            }
        }
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let Some(img) = self.snapshot() else {
            log::warn!("No frame rendered; snapshot {} not written", self.output.display());
            return Ok(());
        };
        if let Some(parent) = self.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        img.save(&self.output)?;
        log::info!(
            "Snapshot of frame {} written to {}",
            self.frames,
            self.output.display()
        );
        Ok(())
    }
}
