//! Color utility functions shared across the application.
//!
//! Category colors are derived from the category name so that importing the
//! same class list twice yields the same palette.

/// Saturation used for generated category colors.
const CATEGORY_SATURATION: f32 = 0.7;

/// Brightness used for generated category colors.
const CATEGORY_VALUE: f32 = 0.9;

/// Golden angle in degrees, used to step away from a taken hue.
const GOLDEN_ANGLE: f32 = 137.5;

/// Upper bound on hue steps when searching for an unused color.
const MAX_HUE_STEPS: usize = 64;

/// Convert HSV to RGB.
///
/// # Arguments
/// * `h` - Hue in degrees (0-360)
/// * `s` - Saturation (0.0-1.0)
/// * `v` - Value/brightness (0.0-1.0)
///
/// # Returns
/// RGB tuple with values in range 0.0-1.0
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let h = h.rem_euclid(360.0);
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    (r + m, g + m, b + m)
}

/// FNV-1a hash; stable across platforms and compiler versions.
fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in bytes {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

fn rgb_from_hue(hue: f32) -> [u8; 3] {
    let (r, g, b) = hsv_to_rgb(hue, CATEGORY_SATURATION, CATEGORY_VALUE);
    [to_byte(r), to_byte(g), to_byte(b)]
}

fn to_byte(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Deterministic color for a category name.
pub fn category_color(name: &str) -> [u8; 3] {
    let hue = (fnv1a(name.as_bytes()) % 360) as f32;
    rgb_from_hue(hue)
}

/// Deterministic color for a category name that avoids every color in `taken`.
///
/// Starts from [`category_color`] and walks the hue circle by the golden
/// angle until a free color is found. Falls back to the hashed color when
/// the palette is exhausted.
pub fn distinct_category_color(name: &str, taken: &[[u8; 3]]) -> [u8; 3] {
    let base_hue = (fnv1a(name.as_bytes()) % 360) as f32;
    (0..MAX_HUE_STEPS)
        .map(|step| rgb_from_hue(base_hue + step as f32 * GOLDEN_ANGLE))
        .find(|color| !taken.contains(color))
        .unwrap_or_else(|| rgb_from_hue(base_hue))
}

/// Format an RGB color as `#RRGGBB`.
pub fn to_hex(color: [u8; 3]) -> String {
    format!("#{:02X}{:02X}{:02X}", color[0], color[1], color[2])
}

/// Parse a `#RRGGBB` (or `RRGGBB`) string.
pub fn from_hex(hex: &str) -> Option<[u8; 3]> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
    Some([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}

/// Convert an RGB byte color to RGBA floats for rendering.
pub fn to_rgba(color: [u8; 3], alpha: f32) -> [f32; 4] {
    [
        f32::from(color[0]) / 255.0,
        f32::from(color[1]) / 255.0,
        f32::from(color[2]) / 255.0,
        alpha,
    ]
}
