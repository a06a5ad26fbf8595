//! Sequential color scale for trouble rates
//!
//! Yellow-orange-red ramp over [0, 1], interpolated through the nine YlOrRd
//! stops with a uniform cubic B-spline per RGB channel.

use serde::{Deserialize, Serialize};

/// Nine-class YlOrRd stops, light to dark
const YL_OR_RD: [[u8; 3]; 9] = [
    [0xff, 0xff, 0xcc],
    [0xff, 0xed, 0xa0],
    [0xfe, 0xd9, 0x76],
    [0xfe, 0xb2, 0x4c],
    [0xfd, 0x8d, 0x3c],
    [0xfc, 0x4e, 0x2a],
    [0xe3, 0x1a, 0x1c],
    [0xbd, 0x00, 0x26],
    [0x80, 0x00, 0x26],
];

/// An sRGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Maps a value in `[domain_min, domain_max]` onto the YlOrRd ramp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    domain_min: f64,
    domain_max: f64,
}

impl Default for ColorScale {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

impl ColorScale {
    pub fn new(domain_min: f64, domain_max: f64) -> Self {
        Self {
            domain_min,
            domain_max,
        }
    }

    /// Color for a value; out-of-domain values clamp to the ends
    pub fn color(&self, value: f64) -> Rgb {
        let span = self.domain_max - self.domain_min;
        let t = if span == 0.0 || !value.is_finite() {
            0.0
        } else {
            (value - self.domain_min) / span
        };
        interpolate(t)
    }

    pub fn hex(&self, value: f64) -> String {
        self.color(value).to_hex()
    }
}

/// Evaluate the ramp at `t` (clamped to [0, 1])
pub fn interpolate(t: f64) -> Rgb {
    let channel = |c: usize| {
        let values: Vec<f64> = YL_OR_RD.iter().map(|stop| f64::from(stop[c])).collect();
        basis_spline(&values, t).round().clamp(0.0, 255.0) as u8
    };
    Rgb {
        r: channel(0),
        g: channel(1),
        b: channel(2),
    }
}

/// Uniform cubic B-spline through `values`, hitting the first and last exactly
fn basis_spline(values: &[f64], t: f64) -> f64 {
    let n = values.len() - 1;
    let (i, t) = if t <= 0.0 {
        (0, 0.0)
    } else if t >= 1.0 {
        (n - 1, 1.0)
    } else {
        ((t * n as f64).floor() as usize, t)
    };

    let v1 = values[i];
    let v2 = values[i + 1];
    let v0 = if i > 0 { values[i - 1] } else { 2.0 * v1 - v2 };
    let v3 = if i < n - 1 { values[i + 2] } else { 2.0 * v2 - v1 };

    let t1 = (t - i as f64 / n as f64) * n as f64;
    let t2 = t1 * t1;
    let t3 = t2 * t1;
    ((1.0 - 3.0 * t1 + 3.0 * t2 - t3) * v0
        + (4.0 - 6.0 * t2 + 3.0 * t3) * v1
        + (1.0 + 3.0 * t1 + 3.0 * t2 - 3.0 * t3) * v2
        + t3 * v3)
        / 6.0
}
