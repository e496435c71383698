/// Raster for the visible part of the image
///
/// Each viewport pixel samples the original pixel it maps to (nearest
/// neighbour), so the picture lines up with the circle overlay exactly.

use iced::widget::image::Handle;
use image::RgbaImage;

use crate::state::view::ViewState;

/// Build the on-screen image for the current view
pub fn render_visible(source: &RgbaImage, view: &ViewState) -> RgbaImage {
    let (x0, y0, width, height) = view.visible_region();
    let (src_w, src_h) = source.dimensions();
    if src_w == 0 || src_h == 0 {
        return RgbaImage::new(0, 0);
    }
    let scale = view.scale();

    RgbaImage::from_fn(width, height, |x, y| {
        let sx = ((f64::from(x0 + x) / scale) as u32).min(src_w - 1);
        let sy = ((f64::from(y0 + y) / scale) as u32).min(src_h - 1);
        *source.get_pixel(sx, sy)
    })
}

/// Same as `render_visible`, packaged for the image widget
pub fn visible_handle(source: &RgbaImage, view: &ViewState) -> Handle {
    let raster = render_visible(source, view);
    let (width, height) = raster.dimensions();
    Handle::from_rgba(width, height, raster.into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn checker() -> RgbaImage {
        RgbaImage::from_fn(4, 4, |x, y| Rgba([x as u8 * 10, y as u8 * 10, 0, 255]))
    }

    #[test]
    fn test_unit_scale_copies_visible_part() {
        let source = checker();
        let view = ViewState::new((4, 4), (3, 8));

        let raster = render_visible(&source, &view);
        assert_eq!(raster.dimensions(), (3, 4));
        assert_eq!(raster.get_pixel(2, 3), source.get_pixel(2, 3));
    }

    #[test]
    fn test_zoom_and_pan_sample_the_mapped_pixel() {
        let source = checker();
        let mut view = ViewState::new((4, 4), (4, 4));
        view.zoom(10, 0.1, 0.1);
        view.reset_pan();
        view.pan(2, 4);

        let raster = render_visible(&source, &view);
        assert_eq!(raster.dimensions(), (4, 4));
        // Viewport (0, 0) is scaled (2, 4), i.e. original (1, 2)
        assert_eq!(raster.get_pixel(0, 0), &Rgba([10, 20, 0, 255]));
        assert_eq!(raster.get_pixel(3, 3), &Rgba([20, 30, 0, 255]));
    }
}
