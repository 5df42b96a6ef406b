//! Rendering backends and their font caches
//!
//! The harness forces the offscreen raster backend before every comparison
//! test; the PDF and SVG backends exist for interactive use and keep their
//! own font-metric caches. `PLOTCHECK_BACKEND` pins the active backend for
//! the whole process, which is the one way a switch can fail to take
//! effect; setup verifies and fails loudly in that case.
//!
//! The raster glyph cache is keyed by codepoint and size only, not by the
//! hinting flag: a glyph rasterized while hinting was on is served as-is to
//! a later caller that expects hinting off. [`clear_font_caches`] exists
//! precisely so harness setup can stop that state from traveling between
//! tests.

use crate::params;
use lru::LruCache;
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, OnceLock};

/// Environment variable that pins the active backend for the process.
pub const BACKEND_ENV_VAR: &str = "PLOTCHECK_BACKEND";

/// Maximum number of rasterized glyphs kept in memory at once.
const GLYPH_CACHE_SIZE: usize = 512;

/// Available rendering backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
  /// Deterministic offscreen raster backend. The only backend whose output
  /// is stable enough for pixel comparisons.
  Raster,
  /// PDF vector output.
  Pdf,
  /// SVG vector output.
  Svg,
}

impl Backend {
  /// Canonical lowercase name, also accepted by `PLOTCHECK_BACKEND`.
  pub fn name(self) -> &'static str {
    match self {
      Backend::Raster => "raster",
      Backend::Pdf => "pdf",
      Backend::Svg => "svg",
    }
  }

  /// Parses a backend name (case-insensitive).
  pub fn from_name(name: &str) -> Option<Self> {
    match name.trim().to_ascii_lowercase().as_str() {
      "raster" => Some(Backend::Raster),
      "pdf" => Some(Backend::Pdf),
      "svg" => Some(Backend::Svg),
      _ => None,
    }
  }
}

impl fmt::Display for Backend {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

fn requested() -> &'static Mutex<Backend> {
  static REQUESTED: OnceLock<Mutex<Backend>> = OnceLock::new();
  REQUESTED.get_or_init(|| Mutex::new(Backend::Raster))
}

/// Requests a backend switch.
///
/// The switch does not take effect when `PLOTCHECK_BACKEND` pins a different
/// backend; callers that require a specific backend must re-query
/// [`active_backend`] afterwards, as harness setup does.
pub fn switch_backend(backend: Backend) {
  *requested().lock().unwrap_or_else(|e| e.into_inner()) = backend;
}

/// Returns the backend that is actually active: the `PLOTCHECK_BACKEND`
/// override when set to a recognized name, the last requested backend
/// otherwise.
pub fn active_backend() -> Backend {
  if let Ok(value) = std::env::var(BACKEND_ENV_VAR) {
    if let Some(pinned) = Backend::from_name(&value) {
      return pinned;
    }
  }
  *requested().lock().unwrap_or_else(|e| e.into_inner())
}

/// Horizontal and vertical extents for text layout at a given size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
  pub ascent: f32,
  pub descent: f32,
  /// Advance of one glyph cell.
  pub advance: f32,
  pub line_height: f32,
}

impl FontMetrics {
  fn for_size(size: f32) -> Self {
    Self {
      ascent: size * 0.74,
      descent: size * 0.26,
      advance: size * 0.6,
      line_height: size * 1.2,
    }
  }
}

/// A rasterized glyph: axis-aligned boxes relative to the glyph origin
/// (top-left of the glyph cell), plus the pen advance.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
  pub advance: f32,
  pub rects: Vec<[f32; 4]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct GlyphKey {
  ch: char,
  /// Size quantized to 1/64 px so f32 sizes can key a hash map.
  size_q: u32,
}

impl GlyphKey {
  fn new(ch: char, size: f32) -> Self {
    Self {
      ch,
      size_q: (size.max(0.0) * 64.0) as u32,
    }
  }
}

fn glyph_cache() -> &'static Mutex<LruCache<GlyphKey, Arc<Glyph>>> {
  static CACHE: OnceLock<Mutex<LruCache<GlyphKey, Arc<Glyph>>>> = OnceLock::new();
  CACHE.get_or_init(|| {
    let cap = NonZeroUsize::new(GLYPH_CACHE_SIZE).unwrap();
    Mutex::new(LruCache::new(cap))
  })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct MetricsKey {
  size_q: u32,
}

type MetricsCache = Mutex<HashMap<MetricsKey, FontMetrics>>;

fn metrics_cache(backend: Backend) -> &'static MetricsCache {
  static RASTER: OnceLock<MetricsCache> = OnceLock::new();
  static PDF: OnceLock<MetricsCache> = OnceLock::new();
  static SVG: OnceLock<MetricsCache> = OnceLock::new();
  let slot = match backend {
    Backend::Raster => &RASTER,
    Backend::Pdf => &PDF,
    Backend::Svg => &SVG,
  };
  slot.get_or_init(|| Mutex::new(HashMap::new()))
}

fn snap(v: f32, hinting: bool) -> f32 {
  if hinting {
    v.round()
  } else {
    v
  }
}

/// Builds the synthetic box-glyph for a codepoint. Geometry depends on the
/// hinting flag captured at rasterization time.
fn rasterize_glyph(ch: char, size: f32, hinting: bool) -> Glyph {
  let metrics = FontMetrics::for_size(size);
  let width = size * 0.5;
  let height = metrics.ascent;
  let stroke = (size * 0.1).max(1.0);

  // Vary the interior bars by codepoint so distinct characters produce
  // distinct pixels.
  let bits = ch as u32;
  let bar_y = height * (0.25 + (bits % 5) as f32 * 0.1);
  let bar_x = width * (0.2 + ((bits / 5) % 4) as f32 * 0.15);

  let mut rects = vec![
    // left stem
    [0.0, 0.0, stroke, height],
    // baseline bar
    [0.0, height - stroke, width, stroke],
    // interior horizontal bar
    [0.0, bar_y, width, stroke],
    // interior vertical bar
    [bar_x, 0.0, stroke, height],
  ];
  for rect in &mut rects {
    rect[0] = snap(rect[0], hinting);
    rect[1] = snap(rect[1], hinting);
    rect[2] = snap(rect[2], hinting).max(1.0);
    rect[3] = snap(rect[3], hinting).max(1.0);
  }

  Glyph {
    advance: snap(metrics.advance, hinting),
    rects,
  }
}

/// Returns the cached rasterized glyph for a codepoint at a size, building
/// it with the *current* hinting flag on a miss.
pub fn raster_glyph(ch: char, size: f32) -> Arc<Glyph> {
  let key = GlyphKey::new(ch, size);
  let mut cache = glyph_cache().lock().unwrap_or_else(|e| e.into_inner());
  if let Some(glyph) = cache.get(&key) {
    return glyph.clone();
  }
  let glyph = Arc::new(rasterize_glyph(ch, size, params::get().text_hinting));
  cache.put(key, glyph.clone());
  glyph
}

/// Returns font metrics for the active backend, caching per backend.
pub fn font_metrics(size: f32) -> FontMetrics {
  let key = MetricsKey {
    size_q: (size.max(0.0) * 64.0) as u32,
  };
  let cache = metrics_cache(active_backend());
  let mut cache = cache.lock().unwrap_or_else(|e| e.into_inner());
  *cache
    .entry(key)
    .or_insert_with(|| FontMetrics::for_size(size))
}

/// Clears the font caches of all backends.
///
/// Must run between comparison tests: the glyph cache key excludes the
/// hinting flag, so glyphs built under one hinting mode would otherwise be
/// served to the next test.
pub fn clear_font_caches() {
  glyph_cache()
    .lock()
    .unwrap_or_else(|e| e.into_inner())
    .clear();
  for backend in [Backend::Raster, Backend::Pdf, Backend::Svg] {
    metrics_cache(backend)
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .clear();
  }
}

/// Number of glyphs currently cached. Introspection for tests.
pub fn glyph_cache_len() -> usize {
  glyph_cache().lock().unwrap_or_else(|e| e.into_inner()).len()
}

/// Number of metric entries cached for a backend. Introspection for tests.
pub fn metrics_cache_len(backend: Backend) -> usize {
  metrics_cache(backend)
    .lock()
    .unwrap_or_else(|e| e.into_inner())
    .len()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn backend_names_round_trip() {
    for backend in [Backend::Raster, Backend::Pdf, Backend::Svg] {
      assert_eq!(Backend::from_name(backend.name()), Some(backend));
    }
    assert_eq!(Backend::from_name("AGG"), None);
    assert_eq!(Backend::from_name(" PDF "), Some(Backend::Pdf));
  }

  #[test]
  fn switch_backend_updates_active_backend() {
    let _guard = crate::test_guard();
    std::env::remove_var(BACKEND_ENV_VAR);
    switch_backend(Backend::Svg);
    assert_eq!(active_backend(), Backend::Svg);
    switch_backend(Backend::Raster);
    assert_eq!(active_backend(), Backend::Raster);
  }

  #[test]
  fn env_override_pins_the_active_backend() {
    let _guard = crate::test_guard();
    std::env::set_var(BACKEND_ENV_VAR, "pdf");
    switch_backend(Backend::Raster);
    assert_eq!(active_backend(), Backend::Pdf);
    std::env::remove_var(BACKEND_ENV_VAR);
    assert_eq!(active_backend(), Backend::Raster);
  }

  #[test]
  fn hinting_changes_glyph_geometry() {
    let unhinted = rasterize_glyph('a', 11.3, false);
    let hinted = rasterize_glyph('a', 11.3, true);
    assert_ne!(unhinted, hinted);
    assert_eq!(hinted.advance, hinted.advance.round());
  }

  #[test]
  fn glyph_cache_serves_stale_hinting_until_cleared() {
    let _guard = crate::test_guard();
    clear_font_caches();
    crate::params::rc_defaults();

    crate::params::update(|p| p.text_hinting = true);
    let hinted = raster_glyph('x', 13.7);

    // The cache key has no hinting component, so flipping the flag alone
    // still returns the hinted glyph.
    crate::params::update(|p| p.text_hinting = false);
    let stale = raster_glyph('x', 13.7);
    assert_eq!(hinted, stale);

    clear_font_caches();
    let fresh = raster_glyph('x', 13.7);
    assert_ne!(*fresh, *hinted);

    crate::params::rc_defaults();
    clear_font_caches();
  }

  #[test]
  fn metrics_caches_are_per_backend_and_clearable() {
    let _guard = crate::test_guard();
    std::env::remove_var(BACKEND_ENV_VAR);
    clear_font_caches();

    switch_backend(Backend::Pdf);
    font_metrics(12.0);
    assert_eq!(metrics_cache_len(Backend::Pdf), 1);
    assert_eq!(metrics_cache_len(Backend::Svg), 0);

    switch_backend(Backend::Svg);
    font_metrics(12.0);
    font_metrics(9.0);
    assert_eq!(metrics_cache_len(Backend::Svg), 2);

    clear_font_caches();
    assert_eq!(metrics_cache_len(Backend::Pdf), 0);
    assert_eq!(metrics_cache_len(Backend::Svg), 0);
    switch_backend(Backend::Raster);
  }
}
