//! Point, vector and color types

use bytemuck::{Pod, Zeroable};
use nalgebra::{Point3, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D point with double precision coordinates
pub type Point3d = Point3<f64>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// A texture coordinate pair
pub type Vector2f = Vector2<f32>;

/// An 8-bit sRGB encoded color, as stored per wedge in a raw mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// A linear-space floating point color.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct LinearColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl LinearColor {
    pub const TRANSPARENT: LinearColor = LinearColor::new(0.0, 0.0, 0.0, 0.0);
    pub const WHITE: LinearColor = LinearColor::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Decode an sRGB color. Alpha is linear.
    pub fn from_srgb(color: Color) -> Self {
        Self {
            r: srgb_to_linear(color.r),
            g: srgb_to_linear(color.g),
            b: srgb_to_linear(color.b),
            a: color.a as f32 / 255.0,
        }
    }

    /// Encode back to 8-bit sRGB, clamping out of range channels.
    pub fn to_srgb(self) -> Color {
        let c = self.clamped();
        Color {
            r: linear_to_srgb(c.r),
            g: linear_to_srgb(c.g),
            b: linear_to_srgb(c.b),
            a: (c.a * 255.0).round() as u8,
        }
    }

    /// Clamp every channel to [0, 1].
    pub fn clamped(self) -> Self {
        Self {
            r: self.r.clamp(0.0, 1.0),
            g: self.g.clamp(0.0, 1.0),
            b: self.b.clamp(0.0, 1.0),
            a: self.a.clamp(0.0, 1.0),
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        bytemuck::cast(self)
    }

    pub fn from_array(rgba: [f32; 4]) -> Self {
        bytemuck::cast(rgba)
    }
}

impl From<Color> for LinearColor {
    fn from(color: Color) -> Self {
        Self::from_srgb(color)
    }
}

fn srgb_to_linear(channel: u8) -> f32 {
    let c = channel as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(channel: f32) -> u8 {
    let c = if channel <= 0.003_130_8 {
        channel * 12.92
    } else {
        1.055 * channel.powf(1.0 / 2.4) - 0.055
    };
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}
