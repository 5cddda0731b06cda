//! Screen-space geometry and colors

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// 2D vector in screen or image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };
    pub const ONE: Vector2 = Vector2 { x: 1.0, y: 1.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean length.
    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    /// Rotate counter-clockwise by `radians` (clockwise on screen, where y points down).
    pub fn rotate(self, radians: f32) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self { x: self.x * cos - self.y * sin, y: self.x * sin + self.y * cos }
    }

    /// Component-wise product.
    pub fn scale_by(self, other: Vector2) -> Self {
        Self { x: self.x * other.x, y: self.y * other.y }
    }
}

impl Add for Vector2 {
    type Output = Vector2;

    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2 { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl Sub for Vector2 {
    type Output = Vector2;

    fn sub(self, rhs: Vector2) -> Vector2 {
        Vector2 { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

impl Mul<f32> for Vector2 {
    type Output = Vector2;

    fn mul(self, rhs: f32) -> Vector2 {
        Vector2 { x: self.x * rhs, y: self.y * rhs }
    }
}

/// Axis-aligned rectangle in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// RGBA8 color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 128, 0);
    pub const LIGHT_GREEN: Color = Color::rgb(144, 238, 144);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const GRAY: Color = Color::rgb(128, 128, 128);
    pub const DARK_RED: Color = Color::rgb(139, 0, 0);
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_array(rgba: [u8; 4]) -> Self {
        Self { r: rgba[0], g: rgba[1], b: rgba[2], a: rgba[3] }
    }

    /// Channel-wise multiply, the way a sprite tint modulates a texel.
    pub fn modulate(self, tint: Color) -> Self {
        let mul = |a: u8, b: u8| ((a as u16 * b as u16 + 127) / 255) as u8;
        Self {
            r: mul(self.r, tint.r),
            g: mul(self.g, tint.g),
            b: mul(self.b, tint.b),
            a: mul(self.a, tint.a),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_arithmetic() {
        let a = Vector2::new(3.0, 4.0);
        assert_eq!(a.length(), 5.0);
        assert_eq!(a - Vector2::new(1.0, 1.0), Vector2::new(2.0, 3.0));
        assert_eq!(a + Vector2::ONE, Vector2::new(4.0, 5.0));
        assert_eq!(a * 2.0, Vector2::new(6.0, 8.0));
        assert_eq!(a.scale_by(Vector2::new(0.5, 2.0)), Vector2::new(1.5, 8.0));
    }

    #[test]
    fn quarter_turn_rotation() {
        let rotated = Vector2::new(1.0, 0.0).rotate(std::f32::consts::FRAC_PI_2);
        assert!(rotated.x.abs() < 1e-6);
        assert!((rotated.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn white_tint_is_identity() {
        assert_eq!(Color::YELLOW.modulate(Color::WHITE), Color::YELLOW);
        assert_eq!(Color::GREEN.modulate(Color::BLACK), Color::BLACK);
    }
}
