//! Placement maths shared by the renderer. Coordinates are pixels with the
//! origin at the top-left and y growing downwards.

use tiny_skia::Transform;

/// Screen offset of the drop shadow drawn under each letter
pub const SHADOW_OFFSET: (f32, f32) = (4.0, 4.0);

pub fn centre_of(width: u32, height: u32) -> (f32, f32) {
    (width as f32 / 2.0, height as f32 / 2.0)
}

/// Maps a `size` pixmap so that its centre lands on `centre`, rotated
/// clockwise by `angle` degrees and, if `mirrored`, flipped about its
/// vertical axis before rotating.
pub fn letter_transform(centre: (f32, f32), size: (f32, f32), angle: f32, mirrored: bool) -> Transform {
    let flip = if mirrored { -1.0 } else { 1.0 };
    Transform::from_translate(centre.0, centre.1)
        .pre_concat(Transform::from_rotate(angle))
        .pre_scale(flip, 1.0)
        .pre_translate(-size.0 / 2.0, -size.1 / 2.0)
}

/// Top-left corner that centres a `w`x`h` box on `pos`
pub fn top_left(pos: (f32, f32), w: u32, h: u32) -> (i32, i32) {
    (
        (pos.0 - w as f32 * 0.5).floor() as i32,
        (pos.1 - h as f32 * 0.5).floor() as i32,
    )
}

/// Scales to `target_width`, keeping the aspect ratio
pub fn fitted_size(src: (u32, u32), target_width: f32) -> (u32, u32) {
    let w = target_width.round().max(1.0);
    let h = (src.1 as f32 * w / src.0.max(1) as f32).round().max(1.0);
    (w as u32, h as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_skia::Point;

    fn map(t: Transform, x: f32, y: f32) -> (f32, f32) {
        let mut p = [Point::from_xy(x, y)];
        t.map_points(&mut p);
        (p[0].x, p[0].y)
    }

    fn close(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 1e-3 && (a.1 - b.1).abs() < 1e-3
    }

    #[test]
    fn upright_letter_is_centred() {
        let t = letter_transform((262.0, 384.0), (40.0, 60.0), 0.0, false);
        assert!(close(map(t, 20.0, 30.0), (262.0, 384.0)));
        assert!(close(map(t, 0.0, 0.0), (242.0, 354.0)));
    }

    #[test]
    fn positive_angles_turn_clockwise() {
        // top-centre of the glyph swings round to the right
        let t = letter_transform((100.0, 100.0), (40.0, 60.0), 90.0, false);
        assert!(close(map(t, 20.0, 0.0), (130.0, 100.0)));
        let t = letter_transform((100.0, 100.0), (40.0, 60.0), 180.0, false);
        assert!(close(map(t, 20.0, 0.0), (100.0, 130.0)));
    }

    #[test]
    fn mirroring_swaps_left_and_right() {
        let t = letter_transform((100.0, 100.0), (40.0, 60.0), 0.0, true);
        assert!(close(map(t, 0.0, 30.0), (120.0, 100.0)));
        assert!(close(map(t, 40.0, 30.0), (80.0, 100.0)));
    }

    #[test]
    fn mirror_happens_before_rotation() {
        // left-middle -> flipped to the right -> rotated 90 cw to the bottom
        let t = letter_transform((0.0, 0.0), (40.0, 60.0), 90.0, true);
        assert!(close(map(t, 0.0, 30.0), (0.0, 20.0)));
    }

    #[test]
    fn fitting_keeps_aspect() {
        assert_eq!(fitted_size((600, 400), 300.0), (300, 200));
        assert_eq!(fitted_size((1000, 1500), 300.0), (300, 450));
        assert_eq!(fitted_size((0, 10), 300.0), (300, 3000));
    }

    #[test]
    fn top_left_of_centred_box() {
        assert_eq!(top_left((512.0, 384.0), 100, 50), (462, 359));
        assert_eq!(top_left((0.0, 0.0), 3, 3), (-2, -2));
    }
}
