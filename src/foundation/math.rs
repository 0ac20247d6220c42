/// Rec.601 luma of an 8-bit RGB sample, in `0..=255`.
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)
}

/// Euclidean distance between two RGB colours.
#[inline]
pub fn rgb_distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    (dr * dr + dg * dg + db * db).sqrt()
}

/// Mean absolute per-channel difference of two RGB samples.
#[inline]
pub fn mean_abs_rgb_delta(a: [u8; 3], b: [u8; 3]) -> f64 {
    let d = |x: u8, y: u8| f64::from(x.abs_diff(y));
    (d(a[0], b[0]) + d(a[1], b[1]) + d(a[2], b[2])) / 3.0
}

/// Parse `#rrggbb` / `#rgb` (leading `#` optional) into RGB bytes.
pub fn parse_hex_color(s: &str) -> Option<[u8; 3]> {
    let hex = s.trim().trim_start_matches('#');
    let nibble = |c: u8| -> Option<u8> { (c as char).to_digit(16).map(|v| v as u8) };
    let bytes = hex.as_bytes();
    match bytes.len() {
        3 => {
            let mut out = [0u8; 3];
            for (i, c) in bytes.iter().enumerate() {
                let v = nibble(*c)?;
                out[i] = v * 17;
            }
            Some(out)
        }
        6 => {
            let mut out = [0u8; 3];
            for i in 0..3 {
                out[i] = nibble(bytes[2 * i])? * 16 + nibble(bytes[2 * i + 1])?;
            }
            Some(out)
        }
        _ => None,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
