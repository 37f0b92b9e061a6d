use crate::error::RenderError;
use crate::geometry::fitted_size;
use crate::text::alloc_pixmap;
use image::RgbaImage;
use image::imageops::{self, FilterType};
use std::path::Path;
use tiny_skia::{ColorU8, Pixmap};

/// Decodes an image file and scales it to `target_width` pixels wide
pub fn load_image(path: &Path, target_width: f32) -> Result<Pixmap, RenderError> {
    let decoded = image::open(path).map_err(|source| RenderError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    let rgba = decoded.to_rgba8();
    let (w, h) = fitted_size(rgba.dimensions(), target_width);
    let scaled = imageops::resize(&rgba, w, h, FilterType::Triangle);
    tracing::debug!(
        path = %path.display(),
        from = ?rgba.dimensions(),
        to = ?(w, h),
        "loaded image"
    );
    pixmap_from_rgba(&scaled)
}

pub fn pixmap_from_rgba(img: &RgbaImage) -> Result<Pixmap, RenderError> {
    let (w, h) = img.dimensions();
    let mut pm = alloc_pixmap(w, h)?;
    for (dst, src) in pm.pixels_mut().iter_mut().zip(img.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_to_premultiplied() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgba([200, 100, 50, 255]));
        img.put_pixel(1, 0, image::Rgba([200, 100, 50, 0]));
        let pm = pixmap_from_rgba(&img).unwrap();
        let px = pm.pixels();
        assert_eq!((px[0].red(), px[0].green(), px[0].alpha()), (200, 100, 255));
        assert_eq!((px[1].red(), px[1].alpha()), (0, 0));
    }

    #[test]
    fn missing_file_is_an_image_error() {
        let err = load_image(Path::new("definitely/not/here.jpg"), 300.0).unwrap_err();
        assert!(matches!(err, RenderError::Image { .. }));
    }

    #[test]
    fn scales_saved_png_to_width() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.png");
        RgbaImage::from_pixel(60, 30, image::Rgba([0, 255, 0, 255]))
            .save(&path)
            .unwrap();
        let pm = load_image(&path, 300.0).unwrap();
        assert_eq!((pm.width(), pm.height()), (300, 150));
    }
}
