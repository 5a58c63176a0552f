// Magnitude formatting for tooltips, axis ticks and tiles
use serde::Deserialize;

/// Unit ladder: thresholds are successive powers of `base`.
struct Scale {
    base: f64,
    units: &'static [&'static str],
}

const BYTES: Scale = Scale {
    base: 1024.0,
    units: &["B", "KB", "MB", "GB"],
};

const COUNTS: Scale = Scale {
    base: 1000.0,
    units: &["", "k", "M", "B"],
};

impl Scale {
    /// Picks the largest unit `value` reaches, then climbs one unit whenever
    /// rounding to that unit's precision would print the base itself.
    ///
    /// `places` maps (unit index, scaled value) to decimal places. It is asked
    /// again with the rounded value, so a value that rounds up into a coarser
    /// precision tier prints with that tier's places.
    fn render(&self, value: f64, places: impl Fn(usize, f64) -> usize) -> String {
        let top = self.units.len() - 1;
        let mut unit = 0;
        while unit < top && value >= self.threshold(unit + 1) {
            unit += 1;
        }

        loop {
            let scaled = value / self.threshold(unit);
            let decimals = places(unit, round_to(scaled, places(unit, scaled)));
            let rounded = round_to(scaled, decimals);
            if unit < top && rounded >= self.base {
                unit += 1;
                continue;
            }
            return format!("{:.*}{}", decimals, rounded, self.units[unit]);
        }
    }

    fn threshold(&self, unit: usize) -> f64 {
        self.base.powi(unit as i32)
    }
}

fn round_to(value: f64, decimals: usize) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Positive finite input, or `None` for anything a formatter treats as zero.
fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// `1023` → `"1023B"`, `1536` → `"1.5KB"`. Missing, zero, negative and
/// non-finite input → `"0B"`.
pub fn format_bytes(value: impl Into<Option<f64>>) -> String {
    match positive(value.into()) {
        Some(v) => BYTES.render(v, |unit, _| if unit == 0 { 0 } else { 1 }),
        None => "0B".to_string(),
    }
}

/// `999` → `"999"`, `1000` → `"1.0k"`. Guarded input → `"0"`.
pub fn format_count(value: impl Into<Option<f64>>) -> String {
    match positive(value.into()) {
        Some(v) => COUNTS.render(v, |unit, _| if unit == 0 { 0 } else { 1 }),
        None => "0".to_string(),
    }
}

/// Like [`format_count`] above 1000; below it keeps more decimals as the
/// value shrinks: ≥1 → 1, ≥0.1 → 2, otherwise 3.
pub fn format_rate(value: impl Into<Option<f64>>) -> String {
    match positive(value.into()) {
        Some(v) => COUNTS.render(v, |unit, scaled| match unit {
            0 if scaled >= 1.0 => 1,
            0 if scaled >= 0.1 => 2,
            0 => 3,
            _ => 1,
        }),
        None => "0".to_string(),
    }
}

/// Which formatter a tile renders its headline value with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricFormat {
    Bytes,
    Rate,
    Count,
}

impl MetricFormat {
    pub fn format(&self, value: Option<f64>) -> String {
        match self {
            MetricFormat::Bytes => format_bytes(value),
            MetricFormat::Rate => format_rate(value),
            MetricFormat::Count => format_count(value),
        }
    }
}
