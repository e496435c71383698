/// User interface pieces
///
/// - `canvas.rs`   - circle overlay and input translation
/// - `viewport.rs` - the visible image raster under the overlay

pub mod canvas;
pub mod viewport;

pub use canvas::CircleOverlay;
