use crate::error::RenderError;
use crate::geometry::{SHADOW_OFFSET, centre_of, letter_transform, top_left};
use crate::images::load_image;
use crate::text::{TextCache, alloc_pixmap};
use ab_glyph::FontRef;
use bytemuck::{cast_slice, cast_slice_mut};
use psylab_core::scene::{GRAY, WHITE};
use psylab_core::{LetterStimulus, Rgba, Scene, Stimulus};
use psylab_timing::{HighPrecisionTimer, Timer};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tiny_skia::{FilterQuality, Pixmap, PixmapPaint, Transform};

/// Pixel height of the letter stimuli
pub const LETTER_SIZE: f32 = 80.0;
pub const FIXATION_SIZE: f32 = 40.0;
pub const PROMPT_SIZE: f32 = 30.0;

const BACKGROUND: [u8; 4] = [0, 0, 0, 255];

pub struct FrameStats {
    pub clear: Duration,
    pub draw: Duration,
    pub copy: Duration,
    pub total: Duration,
}

pub struct SkiaRenderer {
    width: u32,
    height: u32,
    center: (f32, f32),

    text_cache: TextCache,
    // (stimulus cache key, colour) -> upright glyph
    glyphs: HashMap<(usize, Rgba), Arc<Pixmap>>,
    images: Option<(Pixmap, Pixmap)>,

    canvas: Pixmap,
    clear_buffer: Vec<u8>,

    timer: HighPrecisionTimer,
}

impl SkiaRenderer {
    pub fn new(width: u32, height: u32, font: &'static [u8]) -> Result<Self, RenderError> {
        let font = FontRef::try_from_slice(font)?;
        let (width, height) = (width.max(1), height.max(1));
        let mut canvas = alloc_pixmap(width, height)?;
        let clear_buffer = opaque_background(width, height);
        canvas.data_mut().copy_from_slice(&clear_buffer);

        Ok(SkiaRenderer {
            width,
            height,
            center: centre_of(width, height),
            text_cache: TextCache::new(font),
            glyphs: HashMap::new(),
            images: None,
            canvas,
            clear_buffer,
            timer: HighPrecisionTimer::new(),
        })
    }

    /// Uses the font found by `psylab_assets::font_bytes`
    pub fn with_system_font(width: u32, height: u32) -> Result<Self, RenderError> {
        let bytes = psylab_assets::font_bytes()?;
        Self::new(width, height, bytes)
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) -> Result<(), RenderError> {
        let (w, h) = (new_width.max(1), new_height.max(1));
        self.canvas = alloc_pixmap(w, h)?;
        self.clear_buffer = opaque_background(w, h);
        self.canvas.data_mut().copy_from_slice(&self.clear_buffer);
        self.width = w;
        self.height = h;
        self.center = centre_of(w, h);
        tracing::debug!(width = w, height = h, "renderer resized");
        Ok(())
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of distinct letter glyphs rasterised so far
    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    pub fn set_images(&mut self, left: Pixmap, right: Pixmap) {
        self.images = Some((left, right));
    }

    /// Loads both choice images scaled to `target_width`
    pub fn load_images(&mut self, left: &Path, right: &Path, target_width: f32) -> Result<(), RenderError> {
        let l = load_image(left, target_width)?;
        let r = load_image(right, target_width)?;
        self.set_images(l, r);
        Ok(())
    }

    /// Draws `scene` and copies the result into `frame` (RGBA8, same size as the renderer)
    pub fn render_frame(&mut self, scene: &Scene, frame: &mut [u8]) -> Result<FrameStats, RenderError> {
        if frame.len() != self.clear_buffer.len() {
            return Err(RenderError::FrameSize {
                expected: self.clear_buffer.len(),
                actual: frame.len(),
            });
        }

        let t = self.timer.now();
        self.canvas.data_mut().copy_from_slice(&self.clear_buffer);
        let clear = self.timer.elapsed(t);

        let t = self.timer.now();
        self.draw_scene(scene)?;
        let draw = self.timer.elapsed(t);

        // canvas is opaque, so premultiplied and straight alpha agree
        let t = self.timer.now();
        frame.copy_from_slice(self.canvas.data());
        let copy = self.timer.elapsed(t);

        let total = clear + draw + copy;
        self.timer.record_frame(total);
        Ok(FrameStats {
            clear,
            draw,
            copy,
            total,
        })
    }

    /// Render-time statistics over the recent frames
    pub fn frame_stats(&self) -> psylab_timing::FrameStats {
        self.timer.frame_stats()
    }

    fn draw_scene(&mut self, scene: &Scene) -> Result<(), RenderError> {
        let (cx, cy) = self.center;
        match scene {
            Scene::Blank => {}
            Scene::Message {
                text,
                size,
                color,
                offset,
            } => {
                let pm = self.text_cache.get_or_render(text, *size, *color)?;
                self.blit(&pm, (cx + offset.0, cy + offset.1));
            }
            Scene::Fixation { opacity } => {
                let pm = self.text_cache.get_or_render("+", FIXATION_SIZE, WHITE)?;
                let opacity = opacity.clamp(0.0, 1.0);
                if opacity >= 1.0 {
                    self.blit(&pm, self.center);
                } else if opacity > 0.0 {
                    let (x, y) = top_left(self.center, pm.width(), pm.height());
                    let paint = PixmapPaint {
                        opacity,
                        ..PixmapPaint::default()
                    };
                    self.canvas
                        .draw_pixmap(x, y, Pixmap::as_ref(&pm), &paint, Transform::identity(), None);
                }
            }
            Scene::LetterPair {
                reference,
                comparison,
                offset_x,
            } => {
                self.draw_letter(reference, (cx - offset_x, cy))?;
                self.draw_letter(comparison, (cx + offset_x, cy))?;
            }
            Scene::ImagePair {
                prompt,
                offset_x,
                prompt_y,
            } => {
                if let Some((left, right)) = self.images.take() {
                    self.blit(&left, (cx - offset_x, cy));
                    self.blit(&right, (cx + offset_x, cy));
                    self.images = Some((left, right));
                }
                let pm = self.text_cache.get_or_render(prompt, PROMPT_SIZE, WHITE)?;
                self.blit(&pm, (cx, cy + prompt_y));
            }
        }
        Ok(())
    }

    /// Shadow first, then the letter itself
    fn letter_glyph(&mut self, stim: &LetterStimulus, color: Rgba) -> Result<Arc<Pixmap>, RenderError> {
        let key = (stim.cache_key(), color);
        if let Some(pm) = self.glyphs.get(&key) {
            return Ok(Arc::clone(pm));
        }
        let pm = self
            .text_cache
            .get_or_render(&stim.letter.to_string(), LETTER_SIZE, color)?;
        self.glyphs.insert(key, Arc::clone(&pm));
        Ok(pm)
    }

    fn draw_letter(&mut self, stim: &LetterStimulus, pos: (f32, f32)) -> Result<(), RenderError> {
        let layers = [
            (GRAY, (pos.0 + SHADOW_OFFSET.0, pos.1 + SHADOW_OFFSET.1)),
            (WHITE, pos),
        ];
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        for (color, at) in layers {
            let pm = self.letter_glyph(stim, color)?;
            let size = (pm.width() as f32, pm.height() as f32);
            let transform = letter_transform(at, size, stim.angle as f32, stim.is_mirrored());
            self.canvas
                .draw_pixmap(0, 0, Pixmap::as_ref(&pm), &paint, transform, None);
        }
        Ok(())
    }

    /// Axis-aligned copy of `pm` centred on `pos`, clipped to the canvas
    fn blit(&mut self, pm: &Pixmap, pos: (f32, f32)) {
        let (x, y) = top_left(pos, pm.width(), pm.height());
        let (w, h) = (pm.width() as i32, pm.height() as i32);
        let (cw, ch) = (self.width as i32, self.height as i32);

        // cull fully off-screen
        if x + w <= 0 || y + h <= 0 || x >= cw || y >= ch {
            return;
        }

        let dst_x = x.max(0);
        let dst_y = y.max(0);
        let src_x = (dst_x - x) as usize;
        let src_y = (dst_y - y) as usize;
        let copy_w = (w - src_x as i32).min(cw - dst_x) as usize;
        let copy_h = (h - src_y as i32).min(ch - dst_y) as usize;

        let src: &[[u8; 4]] = cast_slice(pm.data());
        let dst: &mut [[u8; 4]] = cast_slice_mut(self.canvas.data_mut());
        let (src_stride, dst_stride) = (w as usize, cw as usize);

        for row in 0..copy_h {
            let s0 = (src_y + row) * src_stride + src_x;
            let d0 = (dst_y as usize + row) * dst_stride + dst_x as usize;
            let s_row = &src[s0..s0 + copy_w];
            let d_row = &mut dst[d0..d0 + copy_w];
            if s_row.iter().all(|p| p[3] == 255) {
                d_row.copy_from_slice(s_row);
            } else {
                for (d, s) in d_row.iter_mut().zip(s_row) {
                    *d = over(*s, *d);
                }
            }
        }
    }
}

fn opaque_background(width: u32, height: u32) -> Vec<u8> {
    BACKGROUND
        .iter()
        .copied()
        .cycle()
        .take(width as usize * height as usize * 4)
        .collect()
}

/// Porter-Duff source-over on premultiplied RGBA
fn over(src: [u8; 4], dst: [u8; 4]) -> [u8; 4] {
    let inv = 255 - src[3] as u32;
    std::array::from_fn(|i| (src[i] as u32 + (dst[i] as u32 * inv + 127) / 255).min(255) as u8)
}
