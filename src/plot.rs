//! The seam between the harness and a plotting engine.

use crate::error::Result;
use crate::figure::Figure;

/// A plot object that can produce a renderable figure on demand.
///
/// This is the only coupling the harness has to a plotting engine. The
/// harness never mutates the plot; it draws it once per comparison and
/// leaves the produced figure open for teardown to close.
pub trait Plot {
  fn draw(&self) -> Result<Figure>;
}

impl<P: Plot + ?Sized> Plot for &P {
  fn draw(&self) -> Result<Figure> {
    (**self).draw()
  }
}
