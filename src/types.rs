use fixed::types::I32F32;

#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct Pt(I32F32);

impl Pt {
    pub const ZERO: Pt = Pt(I32F32::from_bits(0));

    pub fn from_f32(value: f32) -> Pt {
        if !value.is_finite() {
            return Pt::ZERO;
        }
        let milli = (value as f64 * 1000.0).round();
        let milli = milli.clamp(i64::MIN as f64, i64::MAX as f64) as i64;
        Pt::from_milli_i64(milli)
    }

    pub fn from_i32(value: i32) -> Pt {
        Pt::from_milli_i64((value as i64) * 1000)
    }

    /// 72pt per inch.
    pub fn from_inches(value: f32) -> Pt {
        Pt::from_f32(value * 72.0)
    }

    pub fn to_f32(self) -> f32 {
        self.0.to_num()
    }

    pub fn to_milli_i64(self) -> i64 {
        let bits = self.0.to_bits() as i128;
        let denom = 1i128 << 32;
        let scaled = bits * 1000;
        let adj = if scaled >= 0 { denom / 2 } else { -denom / 2 };
        let milli = (scaled + adj) / denom;
        milli.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    pub fn max(self, other: Pt) -> Pt {
        if self >= other { self } else { other }
    }

    pub fn min(self, other: Pt) -> Pt {
        if self <= other { self } else { other }
    }

    pub fn abs(self) -> Pt {
        if self.to_milli_i64() < 0 { -self } else { self }
    }

    pub fn mul_ratio(self, num: i32, denom: i32) -> Pt {
        if denom == 0 {
            return Pt::ZERO;
        }
        let milli = self.to_milli_i64() as i128;
        let num = num as i128;
        let denom = denom as i128;
        let value = div_round_i128(milli.saturating_mul(num), denom);
        Pt::from_milli_i128(value)
    }

    pub fn from_milli_i64(milli: i64) -> Pt {
        Pt::from_milli_i128(milli as i128)
    }

    fn from_milli_i128(milli: i128) -> Pt {
        let denom = 1i128 << 32;
        let adj = if milli >= 0 { 500 } else { -500 };
        let bits = (milli * denom + adj) / 1000;
        let bits = bits.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
        Pt(I32F32::from_bits(bits))
    }
}

impl std::ops::Add for Pt {
    type Output = Pt;
    fn add(self, rhs: Pt) -> Pt {
        Pt::from_milli_i128(self.to_milli_i64() as i128 + rhs.to_milli_i64() as i128)
    }
}

impl std::ops::AddAssign for Pt {
    fn add_assign(&mut self, rhs: Pt) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub for Pt {
    type Output = Pt;
    fn sub(self, rhs: Pt) -> Pt {
        Pt::from_milli_i128(self.to_milli_i64() as i128 - rhs.to_milli_i64() as i128)
    }
}

impl std::ops::SubAssign for Pt {
    fn sub_assign(&mut self, rhs: Pt) {
        *self = *self - rhs;
    }
}

impl std::ops::Mul<i32> for Pt {
    type Output = Pt;
    fn mul(self, rhs: i32) -> Pt {
        let milli = self.to_milli_i64() as i128;
        Pt::from_milli_i128(milli.saturating_mul(rhs as i128))
    }
}

impl std::ops::Div<i32> for Pt {
    type Output = Pt;
    fn div(self, rhs: i32) -> Pt {
        if rhs == 0 {
            Pt::ZERO
        } else {
            let milli = self.to_milli_i64() as i128;
            let value = div_round_i128(milli, rhs as i128);
            Pt::from_milli_i128(value)
        }
    }
}

impl std::ops::Mul<f32> for Pt {
    type Output = Pt;
    fn mul(self, rhs: f32) -> Pt {
        if !rhs.is_finite() {
            return Pt::ZERO;
        }
        Pt::from_f32(self.to_f32() * rhs)
    }
}

impl std::ops::Div<f32> for Pt {
    type Output = Pt;
    fn div(self, rhs: f32) -> Pt {
        if rhs == 0.0 || !rhs.is_finite() {
            Pt::ZERO
        } else {
            Pt::from_f32(self.to_f32() / rhs)
        }
    }
}

fn div_round_i128(num: i128, den: i128) -> i128 {
    if den == 0 {
        return 0;
    }
    let den_abs = den.abs();
    if num >= 0 {
        (num + (den_abs / 2)) / den
    } else {
        -(((-num) + (den_abs / 2)) / den)
    }
}

impl std::ops::Neg for Pt {
    type Output = Pt;
    fn neg(self) -> Pt {
        Pt::from_milli_i128(-(self.to_milli_i64() as i128))
    }
}

impl std::iter::Sum for Pt {
    fn sum<I: Iterator<Item = Pt>>(iter: I) -> Pt {
        iter.fold(Pt::ZERO, |acc, v| acc + v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: Pt,
    pub height: Pt,
}

impl Size {
    pub fn letter() -> Self {
        // 8.5in x 11in at 72pt/in.
        Self {
            width: Pt::from_f32(612.0),
            height: Pt::from_f32(792.0),
        }
    }

    pub fn from_inches(width_in: f32, height_in: f32) -> Self {
        Self {
            width: Pt::from_inches(width_in),
            height: Pt::from_inches(height_in),
        }
    }
}

/// Page-space rectangle, origin at the top-left corner, y growing downwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: Pt,
    pub y: Pt,
    pub width: Pt,
    pub height: Pt,
}

impl Rect {
    pub fn new(x: Pt, y: Pt, width: Pt, height: Pt) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Shrinks the rectangle by `padding` on every side.
    pub fn inset(self, padding: Pt) -> Self {
        Self {
            x: self.x + padding,
            y: self.y + padding,
            width: (self.width - padding * 2).max(Pt::ZERO),
            height: (self.height - padding * 2).max(Pt::ZERO),
        }
    }

    pub fn bottom(&self) -> Pt {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [channel(self.r), channel(self.g), channel(self.b), 255]
    }
}

/// Report palette.
pub mod palette {
    use super::Color;

    pub const PRIMARY: Color = Color::from_hex(0x1E5288);
    pub const SECONDARY: Color = Color::from_hex(0xD54E21);
    pub const DARK_GRAY: Color = Color::from_hex(0x4A4A4A);
    pub const LIGHT_GRAY: Color = Color::from_hex(0xF5F5F5);
    pub const WHITESMOKE: Color = Color::from_hex(0xF5F5F5);
    pub const GRID: Color = Color::from_hex(0x808080);
    pub const NOTICE_RED: Color = Color::from_hex(0xFF0000);

    pub const CHART_YES: Color = Color::from_hex(0x1E90FF);
    pub const CHART_NO: Color = Color::from_hex(0xFF8C00);
    pub const CHART_NA: Color = Color::from_hex(0x32CD32);
    pub const CHART_EMPTY: Color = Color::from_hex(0xD3D3D3);

    pub const SUCCESS_FILL: Color = Color::from_hex(0xEAFBE7);
    pub const SUCCESS_BORDER: Color = Color::from_hex(0x228B22);
    pub const FAILED_FILL: Color = Color::from_hex(0xFFEAEA);
    pub const FAILED_BORDER: Color = Color::from_hex(0xFF0000);
    pub const SKIPPED_FILL: Color = Color::from_hex(0xF2F2F2);
    pub const SKIPPED_BORDER: Color = Color::from_hex(0xA9A9A9);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_length_is_zero() {
        assert_eq!(Pt::default(), Pt::ZERO);
    }

    #[test]
    fn inches_convert_at_72_points() {
        assert_eq!(Pt::from_inches(1.25).to_milli_i64(), 90_000);
        let letter = Size::letter();
        assert_eq!(letter, Size::from_inches(8.5, 11.0));
    }

    #[test]
    fn milli_arithmetic_is_exact() {
        let a = Pt::from_f32(0.1);
        let b = Pt::from_f32(0.2);
        assert_eq!((a + b).to_milli_i64(), 300);
        assert_eq!(Pt::from_f32(12.0).mul_ratio(6, 5).to_milli_i64(), 14_400);
    }

    #[test]
    fn inset_never_goes_negative() {
        let rect = Rect::new(Pt::ZERO, Pt::ZERO, Pt::from_f32(10.0), Pt::from_f32(4.0));
        let inner = rect.inset(Pt::from_f32(3.0));
        assert_eq!(inner.width.to_milli_i64(), 4_000);
        assert_eq!(inner.height, Pt::ZERO);
    }

    #[test]
    fn hex_colors_round_trip_to_bytes() {
        assert_eq!(palette::PRIMARY.to_rgba8(), [0x1E, 0x52, 0x88, 255]);
        assert_eq!(palette::CHART_NA.to_rgba8(), [0x32, 0xCD, 0x32, 255]);
    }
}
