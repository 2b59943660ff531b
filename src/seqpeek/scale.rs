//! Linear, logarithmic, and ordinal band scales.
//!
//! All scales degrade to the start of their range on a zero-width domain instead of
//! producing NaN.

use indexmap::IndexMap;

/// Position of `x` relative to `[a, b]`; zero when the interval is empty or not finite.
fn uninterpolate(a: f64, b: f64, x: f64) -> f64 {
    let span = b - a;
    if span == 0.0 || !span.is_finite() {
        0.0
    } else {
        (x - a) / span
    }
}

/// Linear mapping of a continuous domain onto a continuous range.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn apply(&self, x: f64) -> f64 {
        let t = uninterpolate(self.domain.0, self.domain.1, x);
        self.range.0 + t * (self.range.1 - self.range.0)
    }

    pub fn invert(&self, y: f64) -> f64 {
        let t = uninterpolate(self.range.0, self.range.1, y);
        self.domain.0 + t * (self.domain.1 - self.domain.0)
    }

    /// Roughly `count` evenly spaced, human-friendly values inside the domain.
    ///
    /// The step is a power of ten, refined by a factor of 2, 5, or 10 depending on how far
    /// the plain power of ten is from the requested count.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (lo, hi) = if self.domain.0 <= self.domain.1 {
            self.domain
        } else {
            (self.domain.1, self.domain.0)
        };
        let span = hi - lo;
        if count == 0 || !span.is_finite() || span <= 0.0 {
            return Vec::new();
        }

        let m = count as f64;
        let mut step = 10f64.powf((span / m).log10().floor());
        let err = m / span * step;
        if err <= 0.15 {
            step *= 10.0;
        } else if err <= 0.35 {
            step *= 5.0;
        } else if err <= 0.75 {
            step *= 2.0;
        }

        let start = (lo / step).ceil() * step;
        let stop = (hi / step).floor() * step + step * 0.5;
        let n = ((stop - start) / step).ceil().max(0.0) as usize;
        (0..n).map(|i| start + i as f64 * step).collect()
    }
}

/// Logarithmic mapping of a positive domain onto a continuous range.
///
/// The base cancels out of the normalized position, so this is also the base-10 scale.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LogScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LogScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    /// Map `x`; non-positive inputs and non-positive domains map to the range start.
    pub fn apply(&self, x: f64) -> f64 {
        if x <= 0.0 || self.domain.0 <= 0.0 || self.domain.1 <= 0.0 || x.is_nan() {
            return self.range.0;
        }
        let t = uninterpolate(self.domain.0.log10(), self.domain.1.log10(), x.log10());
        self.range.0 + t * (self.range.1 - self.range.0)
    }
}

/// Ordinal scale assigning each distinct key a band of fixed width, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct OrdinalBands {
    index: IndexMap<String, usize>,
    band: f64,
}

impl OrdinalBands {
    pub fn new<I, S>(keys: I, band: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = IndexMap::new();
        for key in keys {
            let next = index.len();
            index.entry(key.into()).or_insert(next);
        }
        Self { index, band }
    }

    /// Start offset of the band of `key`.
    pub fn offset(&self, key: &str) -> Option<f64> {
        self.index.get(key).map(|&i| i as f64 * self.band)
    }

    /// End of the last band, i.e., the total extent of the scale.
    pub fn range_extent(&self) -> f64 {
        self.index.len() as f64 * self.band
    }

    pub fn band(&self) -> f64 {
        self.band
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
