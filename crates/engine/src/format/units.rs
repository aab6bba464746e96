//! Units: display forms for durations and byte sizes.

use std::fmt;
use std::time::Duration;

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;
const TB: u64 = GB * 1024;
const PB: u64 = TB * 1024;

/// A numeric value that can be plotted in a histogram.
pub trait HistValue: fmt::Display {
    fn value(&self) -> u64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct DurationValue(pub Duration);

impl HistValue for DurationValue {
    fn value(&self) -> u64 {
        u64::try_from(self.0.as_nanos()).unwrap_or(u64::MAX)
    }
}

impl fmt::Display for DurationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_duration(self.0))
    }
}

/// Byte count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct SizeValue(pub u64);

impl HistValue for SizeValue {
    fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SizeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0;
        let scaled = |unit: u64| bytes as f64 / unit as f64;
        match bytes {
            b if b >= PB => write!(f, "{:.3}PB", scaled(PB)),
            b if b >= TB => write!(f, "{:.3}TB", scaled(TB)),
            b if b >= GB => write!(f, "{:.3}GB", scaled(GB)),
            b if b >= MB => write!(f, "{:.3}MB", scaled(MB)),
            b if b >= KB => write!(f, "{:.3}KB", scaled(KB)),
            b => write!(f, "{b}B"),
        }
    }
}

/// Compact duration text: `0s`, `950ns`, `818µs`, `2.113ms`, `1.5s`, `2m0s`, `1h0m0s`.
///
/// Sub-second values use the largest unit below one second that keeps the
/// integer part non-zero; trailing fractional zeros are dropped.
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < 1_000 {
        return format!("{nanos}ns");
    }
    if nanos < 1_000_000 {
        return format!("{}µs", with_fraction(nanos / 1_000, nanos % 1_000, 3));
    }
    if nanos < 1_000_000_000 {
        return format!("{}ms", with_fraction(nanos / 1_000_000, nanos % 1_000_000, 6));
    }

    let total = d.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    let seconds = with_fraction(u128::from(seconds), u128::from(d.subsec_nanos()), 9);

    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

fn with_fraction(whole: u128, rem: u128, digits: usize) -> String {
    if rem == 0 {
        return whole.to_string();
    }
    let fraction = format!("{rem:0digits$}");
    format!("{whole}.{}", fraction.trim_end_matches('0'))
}
