#![forbid(unsafe_code)]

//! Straight-alpha RGBA color used by surfaces and palettes.

/// An RGBA color with straight (non-premultiplied) alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgba {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel, 255 = opaque.
    pub a: u8,
}

impl Rgba {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Color with explicit alpha.
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Scale the alpha channel by `opacity` in `[0, 1]`.
    #[must_use]
    pub fn with_opacity(self, opacity: f32) -> Self {
        let opacity = opacity.clamp(0.0, 1.0);
        Self {
            a: (f32::from(self.a) * opacity).round() as u8,
            ..self
        }
    }

    /// Linear interpolation toward `other` by `t` in `[0, 1]`.
    #[must_use]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| -> u8 {
            (f32::from(a) + (f32::from(b) - f32::from(a)) * t).round() as u8
        };
        Self {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }

    /// Source-over composite of `self` onto `dst`.
    #[must_use]
    pub fn over(self, dst: Self) -> Self {
        let sa = f32::from(self.a) / 255.0;
        if sa >= 1.0 {
            return self;
        }
        if sa <= 0.0 {
            return dst;
        }
        let da = f32::from(dst.a) / 255.0;
        let oa = sa + da * (1.0 - sa);
        if oa <= 0.0 {
            return Self::TRANSPARENT;
        }
        let blend = |s: u8, d: u8| -> u8 {
            let s = f32::from(s);
            let d = f32::from(d);
            ((s * sa + d * da * (1.0 - sa)) / oa).round() as u8
        };
        Self {
            r: blend(self.r, dst.r),
            g: blend(self.g, dst.g),
            b: blend(self.b, dst.b),
            a: (oa * 255.0).round() as u8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_endpoints() {
        let a = Rgba::rgb(0, 0, 0);
        let b = Rgba::rgb(255, 255, 255);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), Rgba::rgb(128, 128, 128));
    }

    #[test]
    fn with_opacity_scales_alpha_only() {
        let c = Rgba::rgb(10, 20, 30).with_opacity(0.5);
        assert_eq!((c.r, c.g, c.b), (10, 20, 30));
        assert_eq!(c.a, 128);
        assert_eq!(c.with_opacity(0.0).a, 0);
    }

    #[test]
    fn over_opaque_source_wins() {
        let src = Rgba::rgb(255, 0, 0);
        let dst = Rgba::rgb(0, 255, 0);
        assert_eq!(src.over(dst), src);
    }

    #[test]
    fn over_transparent_source_keeps_dst() {
        let src = Rgba::rgba(255, 0, 0, 0);
        let dst = Rgba::rgb(0, 255, 0);
        assert_eq!(src.over(dst), dst);
    }

    #[test]
    fn over_half_alpha_mixes() {
        let src = Rgba::rgba(255, 0, 0, 128);
        let dst = Rgba::rgb(0, 0, 255);
        let out = src.over(dst);
        assert_eq!(out.a, 255);
        assert!(out.r > 100 && out.b > 100);
    }
}
