//! Linear color scale for shading regions by a numeric value

use crate::{Result, TripSkyError};

/// Maps a numeric domain onto evenly spaced color stops.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearScale {
    domain_min: f64,
    span: f64,
    stops: Vec<[u8; 3]>,
}

/// Build a scale over `[domain_min, domain_max]` through `colors` (hex strings).
pub fn make_linear_scale(domain_min: f64, domain_max: f64, colors: &[&str]) -> Result<LinearScale> {
    if colors.is_empty() {
        return Err(TripSkyError::validation("A color scale needs at least one color"));
    }
    let stops = colors.iter().map(|c| hex_to_rgb(c)).collect::<Result<Vec<_>>>()?;

    Ok(LinearScale {
        domain_min,
        span: (domain_max - domain_min).max(1e-9),
        stops,
    })
}

impl LinearScale {
    /// Channel values for `v`; values outside the domain clamp to the end stops.
    #[must_use]
    pub fn rgb(&self, v: f64) -> [u8; 3] {
        let t = ((v - self.domain_min) / self.span).clamp(0.0, 1.0);
        let t = if t.is_nan() { 0.0 } else { t };

        let last = self.stops.len() - 1;
        let p = t * last as f64;
        let i = (p.floor() as usize).min(last);
        let f = p - i as f64;

        let c1 = self.stops[i];
        let c2 = self.stops[(i + 1).min(last)];

        let mut out = [0u8; 3];
        for (channel, slot) in out.iter_mut().enumerate() {
            let blended = lerp(f64::from(c1[channel]), f64::from(c2[channel]), f).round();
            *slot = blended.clamp(0.0, 255.0) as u8;
        }
        out
    }

    /// CSS color for `v`, e.g. `rgb(255,128,0)`
    #[must_use]
    pub fn color(&self, v: f64) -> String {
        let [r, g, b] = self.rgb(v);
        format!("rgb({r},{g},{b})")
    }
}

#[must_use]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Parse `#rgb`, `#rrggbb` or the same without `#`.
pub fn hex_to_rgb(hex: &str) -> Result<[u8; 3]> {
    let digits = hex.trim().trim_start_matches('#');
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return Err(TripSkyError::validation(format!("Invalid hex color '{hex}'"))),
    };
    if !expanded.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(TripSkyError::validation(format!("Invalid hex color '{hex}'")));
    }

    let num = u32::from_str_radix(&expanded, 16)
        .map_err(|_| TripSkyError::validation(format!("Invalid hex color '{hex}'")))?;

    Ok([
        ((num >> 16) & 0xff) as u8,
        ((num >> 8) & 0xff) as u8,
        (num & 0xff) as u8,
    ])
}
