//! Offscreen figures and the open-figure registry
//!
//! A [`Figure`] is a fixed-size raster surface with the handful of drawing
//! operations a plot needs: background fill, rectangles, lines, markers and
//! text. Saving goes through the PNG encoder; the pixels are what the
//! comparison engine diffs.
//!
//! Figures register themselves in a process-wide registry on creation and
//! leave it only on an explicit [`Figure::close`] or [`close_all_figures`].
//! Dropping a figure without closing it leaves its id behind, which is
//! exactly the leak harness setup reports: a figure the previous test never
//! cleaned up.

use crate::backend;
use crate::error::{RenderError, Result};
use crate::params;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, OnceLock};
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};

static NEXT_FIGURE_ID: AtomicU32 = AtomicU32::new(1);

fn registry() -> &'static Mutex<Vec<u32>> {
  static OPEN: OnceLock<Mutex<Vec<u32>>> = OnceLock::new();
  OPEN.get_or_init(|| Mutex::new(Vec::new()))
}

/// Identifiers of all figures created but not yet closed, oldest first.
pub fn open_figure_ids() -> Vec<u32> {
  registry().lock().unwrap_or_else(|e| e.into_inner()).clone()
}

/// Closes every open figure. Harness teardown calls this.
pub fn close_all_figures() {
  registry().lock().unwrap_or_else(|e| e.into_inner()).clear();
}

fn register(id: u32) {
  registry().lock().unwrap_or_else(|e| e.into_inner()).push(id);
}

fn deregister(id: u32) {
  registry()
    .lock()
    .unwrap_or_else(|e| e.into_inner())
    .retain(|&open| open != id);
}

/// An offscreen raster figure.
#[derive(Debug)]
pub struct Figure {
  id: u32,
  pixmap: Pixmap,
}

impl Figure {
  /// Creates a figure using the default size and background from the
  /// current render parameters.
  pub fn new() -> Result<Self> {
    let params = params::get();
    Self::with_size(params.figure_width, params.figure_height)
  }

  /// Creates a figure of an explicit size, filled with the configured
  /// background color.
  pub fn with_size(width: u32, height: u32) -> Result<Self> {
    let mut pixmap =
      Pixmap::new(width, height).ok_or(RenderError::SurfaceCreation { width, height })?;
    let [r, g, b, a] = params::get().background;
    pixmap.fill(tiny_skia::Color::from_rgba8(r, g, b, a));

    let id = NEXT_FIGURE_ID.fetch_add(1, Ordering::Relaxed);
    register(id);
    Ok(Self { id, pixmap })
  }

  pub fn id(&self) -> u32 {
    self.id
  }

  pub fn width(&self) -> u32 {
    self.pixmap.width()
  }

  pub fn height(&self) -> u32 {
    self.pixmap.height()
  }

  /// Raw access to the underlying surface.
  pub fn pixmap(&self) -> &Pixmap {
    &self.pixmap
  }

  /// Fills the whole surface with a color.
  pub fn fill(&mut self, rgba: [u8; 4]) {
    self
      .pixmap
      .fill(tiny_skia::Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]));
  }

  /// Fills an axis-aligned rectangle. Degenerate rectangles are skipped.
  pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, rgba: [u8; 4]) {
    let Some(rect) = Rect::from_xywh(x, y, w, h) else {
      return;
    };
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]);
    paint.anti_alias = true;
    self
      .pixmap
      .fill_rect(rect, &paint, Transform::identity(), None);
  }

  /// Strokes a line segment.
  pub fn line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, width: f32, rgba: [u8; 4]) {
    let mut builder = PathBuilder::new();
    builder.move_to(x0, y0);
    builder.line_to(x1, y1);
    let Some(path) = builder.finish() else {
      return;
    };
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]);
    paint.anti_alias = true;
    let stroke = Stroke {
      width,
      ..Default::default()
    };
    self
      .pixmap
      .stroke_path(&path, &paint, &stroke, Transform::identity(), None);
  }

  /// Fills a circular point marker.
  pub fn marker(&mut self, x: f32, y: f32, radius: f32, rgba: [u8; 4]) {
    let mut builder = PathBuilder::new();
    builder.push_circle(x, y, radius);
    let Some(path) = builder.finish() else {
      return;
    };
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]);
    paint.anti_alias = true;
    self
      .pixmap
      .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
  }

  /// Draws a text run with its baseline-left corner at `(x, y)`.
  ///
  /// Glyphs come from the backend glyph cache; edge antialiasing follows
  /// the `text_antialiased` render parameter.
  pub fn text(&mut self, x: f32, y: f32, content: &str, size: f32, rgba: [u8; 4]) {
    let metrics = backend::font_metrics(size);
    let antialias = params::get().text_antialiased;

    let mut paint = Paint::default();
    paint.set_color_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]);
    paint.anti_alias = antialias;

    let top = y - metrics.ascent;
    let mut pen_x = x;
    for ch in content.chars() {
      if ch.is_whitespace() {
        pen_x += metrics.advance;
        continue;
      }
      let glyph = backend::raster_glyph(ch, size);
      for &[gx, gy, gw, gh] in &glyph.rects {
        if let Some(rect) = Rect::from_xywh(pen_x + gx, top + gy, gw, gh) {
          self
            .pixmap
            .fill_rect(rect, &paint, Transform::identity(), None);
        }
      }
      pen_x += glyph.advance;
    }
  }

  /// Saves the figure as a PNG file.
  pub fn save_png(&self, path: &Path) -> Result<()> {
    self.pixmap.save_png(path).map_err(|e| {
      RenderError::EncodeFailed {
        format: "PNG".to_string(),
        reason: e.to_string(),
      }
      .into()
    })
  }

  /// Closes the figure, removing it from the open-figure registry.
  pub fn close(self) {
    deregister(self.id);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn figures_register_until_closed() {
    let _guard = crate::test_guard();
    close_all_figures();

    let fig_a = Figure::with_size(8, 8).expect("figure");
    let fig_b = Figure::with_size(8, 8).expect("figure");
    let open = open_figure_ids();
    assert!(open.contains(&fig_a.id()));
    assert!(open.contains(&fig_b.id()));

    let id_a = fig_a.id();
    fig_a.close();
    let open = open_figure_ids();
    assert!(!open.contains(&id_a));
    assert!(open.contains(&fig_b.id()));

    close_all_figures();
    assert!(open_figure_ids().is_empty());
  }

  #[test]
  fn dropping_without_close_leaks_the_id() {
    let _guard = crate::test_guard();
    close_all_figures();

    let id = {
      let fig = Figure::with_size(4, 4).expect("figure");
      fig.id()
      // dropped here without close()
    };
    assert!(open_figure_ids().contains(&id));
    close_all_figures();
  }

  #[test]
  fn zero_sized_surface_is_an_error() {
    let _guard = crate::test_guard();
    let err = Figure::with_size(0, 10).unwrap_err();
    assert!(err.to_string().contains("render surface"));
  }

  #[test]
  fn drawing_changes_pixels() {
    let _guard = crate::test_guard();
    crate::params::rc_defaults();

    let mut fig = Figure::with_size(32, 32).expect("figure");
    let before = fig.pixmap().data().to_vec();
    fig.fill_rect(4.0, 4.0, 10.0, 10.0, [200, 30, 30, 255]);
    fig.line(0.0, 0.0, 31.0, 31.0, 2.0, [30, 30, 200, 255]);
    fig.marker(20.0, 10.0, 3.0, [30, 200, 30, 255]);
    fig.text(2.0, 28.0, "ab", 10.0, [0, 0, 0, 255]);
    assert_ne!(fig.pixmap().data(), before.as_slice());

    fig.close();
    crate::backend::clear_font_caches();
  }

  #[test]
  fn save_png_writes_a_decodable_file() {
    let _guard = crate::test_guard();
    crate::params::rc_defaults();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("figure.png");

    let fig = Figure::with_size(16, 12).expect("figure");
    fig.save_png(&path).expect("save png");
    fig.close();

    let decoded = image::open(&path).expect("decode").to_rgba8();
    assert_eq!(decoded.dimensions(), (16, 12));
    // Default background is opaque white.
    assert_eq!(decoded.get_pixel(0, 0).0, [255, 255, 255, 255]);
  }
}
