//! Glyph rasterisation into premultiplied pixmaps, plus a cache keyed by
//! interned text.

use crate::error::RenderError;
use ab_glyph::{Font, FontRef, Glyph, PxScale, ScaleFont, point};
use psylab_assets::{get_text, intern_text};
use psylab_core::scene::Rgba;
use std::collections::HashMap;
use std::sync::Arc;
use tiny_skia::{Pixmap, PremultipliedColorU8};

pub(crate) fn alloc_pixmap(width: u32, height: u32) -> Result<Pixmap, RenderError> {
    Pixmap::new(width, height).ok_or(RenderError::Pixmap { width, height })
}

/// Lays out `text` with each line centred on the widest one.
fn layout(font: &FontRef<'static>, scale: PxScale, text: &str) -> Vec<Glyph> {
    let sf = font.as_scaled(scale);
    let line_height = sf.height() + sf.line_gap();

    let line_width = |line: &str| {
        let mut w = 0.0f32;
        let mut prev = None;
        for ch in line.chars() {
            let id = font.glyph_id(ch);
            if let Some(p) = prev {
                w += sf.kern(p, id);
            }
            w += sf.h_advance(id);
            prev = Some(id);
        }
        w
    };
    let widths: Vec<f32> = text.lines().map(line_width).collect();
    let widest = widths.iter().copied().fold(0.0f32, f32::max);

    let mut glyphs = Vec::new();
    for (row, (line, width)) in text.lines().zip(widths).enumerate() {
        let baseline = sf.ascent() + row as f32 * line_height;
        let mut pen_x = (widest - width) * 0.5;
        let mut prev = None;
        for ch in line.chars() {
            let id = font.glyph_id(ch);
            if let Some(p) = prev {
                pen_x += sf.kern(p, id);
            }
            glyphs.push(Glyph {
                id,
                scale,
                position: point(pen_x, baseline),
            });
            pen_x += sf.h_advance(id);
            prev = Some(id);
        }
    }
    glyphs
}

/// Rasterises `text` into a pixmap cropped to its ink bounds. Text with no
/// visible glyphs yields a 1x1 transparent pixmap.
pub fn render_text_pixmap(
    text: &str,
    font_size: f32,
    font: &FontRef<'static>,
    color: Rgba,
) -> Result<Pixmap, RenderError> {
    let glyphs = layout(font, PxScale::from(font_size), text);
    let outlines: Vec<_> = glyphs
        .into_iter()
        .filter_map(|g| font.outline_glyph(g))
        .collect();

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for out in &outlines {
        let b = out.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }
    if outlines.is_empty() {
        return alloc_pixmap(1, 1);
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    let mut pm = alloc_pixmap(w, h)?;

    let stride = w as usize;
    let dst = pm.pixels_mut();
    for out in &outlines {
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + b.min.x - min_x).floor() as i32;
            let iy = (y as f32 + b.min.y - min_y).floor() as i32;
            if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                return;
            }
            let i = iy as usize * stride + ix as usize;

            let a_lin = (cov * color[3] as f32 / 255.0).clamp(0.0, 1.0);
            let sa = (a_lin * 255.0) as u8;
            let sr = (color[0] as f32 * a_lin) as u8;
            let sg = (color[1] as f32 * a_lin) as u8;
            let sb = (color[2] as f32 * a_lin) as u8;

            // source over, premultiplied
            let bg = dst[i];
            let inv = 1.0 - sa as f32 / 255.0;
            let blended = PremultipliedColorU8::from_rgba(
                sr.saturating_add((bg.red() as f32 * inv) as u8),
                sg.saturating_add((bg.green() as f32 * inv) as u8),
                sb.saturating_add((bg.blue() as f32 * inv) as u8),
                sa.saturating_add((bg.alpha() as f32 * inv) as u8),
            );
            if let Some(px) = blended {
                dst[i] = px;
            }
        });
    }

    Ok(pm)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TextKey {
    intern_id: usize,
    size_bits: u32,
    color: Rgba,
}

pub struct TextCache {
    font: FontRef<'static>,
    map: HashMap<TextKey, Arc<Pixmap>>,
}

impl TextCache {
    pub fn new(font: FontRef<'static>) -> Self {
        Self {
            font,
            map: HashMap::new(),
        }
    }

    pub fn get_or_render(
        &mut self,
        text: &str,
        size: f32,
        color: Rgba,
    ) -> Result<Arc<Pixmap>, RenderError> {
        let key = TextKey {
            intern_id: intern_text(text),
            size_bits: size.to_bits(),
            color,
        };
        if let Some(p) = self.map.get(&key) {
            return Ok(Arc::clone(p));
        }
        let atom = get_text(key.intern_id);
        let source = atom.as_deref().unwrap_or(text);
        let pm = Arc::new(render_text_pixmap(source, size, &self.font, color)?);
        tracing::trace!(text = source, size, "rasterised text");
        self.map.insert(key, Arc::clone(&pm));
        Ok(pm)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psylab_core::scene::WHITE;

    fn font() -> Option<FontRef<'static>> {
        let bytes = psylab_assets::font_bytes().ok()?;
        FontRef::try_from_slice(bytes).ok()
    }

    #[test]
    fn blank_text_is_a_single_pixel() {
        let Some(font) = font() else { return };
        let pm = render_text_pixmap("   ", 32.0, &font, WHITE).unwrap();
        assert_eq!((pm.width(), pm.height()), (1, 1));
    }

    #[test]
    fn second_line_makes_text_taller() {
        let Some(font) = font() else { return };
        let one = render_text_pixmap("Same", 30.0, &font, WHITE).unwrap();
        let two = render_text_pixmap("Same\nSame", 30.0, &font, WHITE).unwrap();
        assert_eq!(one.width(), two.width());
        assert!(two.height() > one.height() + 20);
    }

    #[test]
    fn glyph_pixels_are_premultiplied() {
        let Some(font) = font() else { return };
        let pm = render_text_pixmap("F", 80.0, &font, [128, 128, 128, 255]).unwrap();
        assert!(pm.pixels().iter().any(|p| p.alpha() == 255));
        assert!(
            pm.pixels()
                .iter()
                .all(|p| p.red() <= p.alpha() && p.green() <= p.alpha())
        );
    }

    #[test]
    fn cache_reuses_pixmaps_per_size_and_colour() {
        let Some(font) = font() else { return };
        let mut cache = TextCache::new(font);
        let a = cache.get_or_render("Trial 1/56", 30.0, WHITE).unwrap();
        let b = cache.get_or_render("Trial 1/56", 30.0, WHITE).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        cache.get_or_render("Trial 1/56", 40.0, WHITE).unwrap();
        cache.get_or_render("Trial 1/56", 30.0, [255, 0, 0, 255]).unwrap();
        assert_eq!(cache.len(), 3);
    }
}
