//! Gradient color lookup for color tags.

use crate::document::{ColorStops, ColorTag, Rgb};

impl ColorStops {
    /// Color at normalized position `x`.
    ///
    /// Without an animation offset the stops are spread evenly over
    /// `0..=1` (first stop at 0, last at 1). With an offset, `x` is shifted
    /// and wrapped into `0..1` and the last stop blends back into the first,
    /// so a scrolling gradient tiles seamlessly.
    pub fn color_at(&self, x: f32, anim_offset: Option<f32>) -> Rgb {
        let stops = self.as_slice();
        let x = if x.is_finite() { x } else { 0.0 };
        let n = stops.len();
        match anim_offset {
            None => {
                let segments = n - 1;
                let pos = x.clamp(0.0, 1.0) * segments as f32;
                let index = (pos.floor() as usize).min(segments - 1);
                stops[index].lerp(stops[index + 1], pos - index as f32)
            }
            Some(offset) => {
                let offset = if offset.is_finite() { offset } else { 0.0 };
                let t = (x + offset).rem_euclid(1.0);
                let pos = t * n as f32;
                let index = (pos.floor() as usize).min(n - 1);
                stops[index].lerp(stops[(index + 1) % n], pos - index as f32)
            }
        }
    }
}

/// Color of `tag` at normalized position `x` across the tag's extent.
pub fn color_at(tag: &ColorTag, x: f32, anim_offset: Option<f32>) -> Rgb {
    tag.stops.color_at(x, anim_offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb = Rgb::new(255, 0, 0);
    const GREEN: Rgb = Rgb::new(0, 255, 0);
    const BLUE: Rgb = Rgb::new(0, 0, 255);

    fn stops(colors: &[Rgb]) -> ColorStops {
        ColorStops::from_slice(colors).unwrap()
    }

    #[test]
    fn test_two_stop_interpolation() {
        let s = stops(&[RED, BLUE]);
        assert_eq!(s.color_at(0.0, None), RED);
        assert_eq!(s.color_at(1.0, None), BLUE);
        assert_eq!(s.color_at(0.5, None), Rgb::new(128, 0, 128));
    }

    #[test]
    fn test_three_stops_hit_each_color() {
        let s = stops(&[RED, GREEN, BLUE]);
        assert_eq!(s.color_at(0.0, None), RED);
        assert_eq!(s.color_at(0.5, None), GREEN);
        assert_eq!(s.color_at(1.0, None), BLUE);
    }

    #[test]
    fn test_static_clamps_out_of_range() {
        let s = stops(&[RED, BLUE]);
        assert_eq!(s.color_at(-3.0, None), RED);
        assert_eq!(s.color_at(7.0, None), BLUE);
        assert_eq!(s.color_at(f32::NAN, None), RED);
    }

    #[test]
    fn test_animated_wraps_back_to_first_stop() {
        let s = stops(&[RED, GREEN, BLUE]);
        assert_eq!(s.color_at(0.0, Some(0.0)), RED);
        assert_eq!(s.color_at(1.0 / 3.0, Some(0.0)), GREEN);
        // halfway through the closing segment, blue blends back to red
        assert_eq!(s.color_at(5.0 / 6.0, Some(0.0)), Rgb::new(128, 0, 128));
        assert_eq!(s.color_at(0.0, Some(1.0)), RED);
    }

    #[test]
    fn test_animation_offset_shifts() {
        let s = stops(&[RED, GREEN, BLUE]);
        assert_eq!(s.color_at(0.0, Some(1.0 / 3.0)), GREEN);
        assert_eq!(s.color_at(0.5, Some(-0.5)), RED);
    }

    #[test]
    fn test_endpoints_equal_only_when_stops_match() {
        let open = stops(&[RED, GREEN]);
        assert_ne!(open.color_at(0.0, None), open.color_at(1.0, None));
        let closed = stops(&[RED, GREEN, RED]);
        assert_eq!(closed.color_at(0.0, None), closed.color_at(1.0, None));
    }

    #[test]
    fn test_color_at_uses_tag_stops() {
        let tag = ColorTag {
            start: 0,
            end: 2,
            stops: stops(&[RED, GREEN, BLUE]),
        };
        assert_eq!(color_at(&tag, 0.5, None), GREEN);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn rgb() -> impl Strategy<Value = Rgb> {
        (any::<u8>(), any::<u8>(), any::<u8>()).prop_map(|(r, g, b)| Rgb::new(r, g, b))
    }

    fn channel_gap(a: Rgb, b: Rgb) -> u8 {
        a.r.abs_diff(b.r).max(a.g.abs_diff(b.g)).max(a.b.abs_diff(b.b))
    }

    proptest! {
        #[test]
        fn static_gradient_is_continuous(colors in prop::collection::vec(rgb(), 2..=8), x in 0.0f32..0.999) {
            let s = ColorStops::from_slice(&colors).unwrap();
            let step = 0.001;
            let a = s.color_at(x, None);
            let b = s.color_at(x + step, None);
            // One thousandth of the span moves at most (n - 1) * 255 / 1000 per channel, plus rounding.
            let limit = ((colors.len() - 1) as f32 * 255.0 * step).ceil() as u8 + 1;
            prop_assert!(channel_gap(a, b) <= limit, "{a} -> {b} jumps more than {limit}");
        }

        #[test]
        fn animated_gradient_is_continuous_across_wrap(colors in prop::collection::vec(rgb(), 2..=8), offset in -2.0f32..2.0) {
            let s = ColorStops::from_slice(&colors).unwrap();
            let before = s.color_at(0.9995, Some(offset));
            let after = s.color_at(0.0, Some(offset + 0.9995 + 0.0005));
            let limit = (colors.len() as f32 * 255.0 * 0.001).ceil() as u8 + 2;
            prop_assert!(channel_gap(before, after) <= limit);
        }
    }
}
