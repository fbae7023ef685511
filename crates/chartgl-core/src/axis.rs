//! Per-dimension tick generation and label formatting.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Value scale of an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AxisScale {
    /// Linear spacing.
    #[default]
    Linear,
    /// Base-10 logarithmic spacing; ticks sit on decades.
    Log10,
}

/// Which data dimension an axis describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisKind {
    X,
    Y,
    Z,
}

impl AxisKind {
    /// Index into `(x, y, z)` triples.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            AxisKind::X => 0,
            AxisKind::Y => 1,
            AxisKind::Z => 2,
        }
    }
}

/// A single labelled tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickLabel {
    pub value: f64,
    pub text: String,
}

/// Major and minor ticks for the current range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickSet {
    pub major: Vec<TickLabel>,
    pub minor: Vec<f64>,
}

/// Picks a 1/2/5 x 10^k step that yields roughly `target` intervals.
#[must_use]
pub fn nice_step(range: f64, target: usize) -> f64 {
    if !(range.is_finite() && range > 0.0) || target == 0 {
        return 1.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let rough = range / target as f64;
    let mag = 10f64.powf(rough.log10().floor());
    let normalized = rough / mag;
    let nice = if normalized < 1.5 {
        1.0
    } else if normalized < 3.5 {
        2.0
    } else if normalized < 7.5 {
        5.0
    } else {
        10.0
    };
    nice * mag
}

/// Tick values on multiples of a nice step inside `[min, max]`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn nice_ticks(min: f64, max: f64, target: usize) -> (Vec<f64>, f64) {
    let range = max - min;
    if !(range.is_finite() && range > 0.0) {
        return (if min.is_finite() { vec![min] } else { vec![] }, 1.0);
    }
    let step = nice_step(range, target);
    let tol = step * 1e-9;
    let first = ((min - tol) / step).ceil() as i64;
    let last = ((max + tol) / step).floor() as i64;
    #[allow(clippy::cast_precision_loss)]
    let ticks = (first..=last)
        .map(|i| {
            let v = i as f64 * step;
            if v.abs() < tol {
                0.0
            } else {
                v
            }
        })
        .collect();
    (ticks, step)
}

/// Decade exponents `e` with `10^e` inside `[min, max]`. Empty for non-positive ranges.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn decade_exponents(min: f64, max: f64) -> Vec<i32> {
    if !(min > 0.0 && max >= min && max.is_finite()) {
        return Vec::new();
    }
    let lo = (min.log10() - 1e-9).ceil() as i32;
    let hi = (max.log10() + 1e-9).floor() as i32;
    (lo..=hi).collect()
}

/// Number of decimals needed to show multiples of `step` exactly.
fn decimals_for_step(step: f64) -> usize {
    let step = step.abs();
    if step == 0.0 || !step.is_finite() {
        return 0;
    }
    let mut d = 0usize;
    let mut scaled = step;
    while d < 10 && (scaled - scaled.round()).abs() > 1e-6 * scaled.max(1.0) {
        d += 1;
        scaled *= 10.0;
    }
    d
}

/// Formats a tick value given the tick spacing.
///
/// Very large or very small magnitudes switch to exponent notation.
#[must_use]
pub fn format_tick_value(value: f64, step: f64) -> String {
    if value == 0.0 || value.abs() < step.abs() * 1e-9 {
        let digits = decimals_for_step(step);
        return format!("{:.digits$}", 0.0);
    }
    let mag = value.abs();
    if !(1e-4..1e7).contains(&mag) {
        let digits = decimals_for_step(step / 10f64.powf(mag.log10().floor())).min(4);
        return format!("{value:.digits$e}");
    }
    let digits = decimals_for_step(step);
    format!("{value:.digits$}")
}

/// Exponent label for a decade tick, in the `10^{e}` form.
#[must_use]
pub fn format_decade(exponent: i32) -> String {
    format!("10^{{{exponent}}}")
}

/// One dimension's tick policy and label cache.
#[derive(Debug, Clone)]
pub struct Axis {
    kind: AxisKind,
    label: String,
    min: f64,
    max: f64,
    scale: AxisScale,
    auto_tick: bool,
    tick_locations: Vec<f64>,
    tick_labels: Vec<String>,
    target_tick_count: usize,
    minor_tick_visible: bool,
    minor_tick_num: usize,
    inverse: bool,
    visible: bool,
    cache: OnceLock<TickSet>,
}

impl Axis {
    /// Creates an auto-ticking linear axis over `[0, 1]`.
    #[must_use]
    pub fn new(kind: AxisKind) -> Self {
        Self {
            kind,
            label: String::new(),
            min: 0.0,
            max: 1.0,
            scale: AxisScale::Linear,
            auto_tick: true,
            tick_locations: Vec::new(),
            tick_labels: Vec::new(),
            target_tick_count: 5,
            minor_tick_visible: false,
            minor_tick_num: 5,
            inverse: false,
            visible: true,
            cache: OnceLock::new(),
        }
    }

    pub fn kind(&self) -> AxisKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    /// Sets the value range; the label cache is dropped only if it changed.
    #[allow(clippy::float_cmp)]
    pub fn set_range(&mut self, min: f64, max: f64) {
        if self.min != min || self.max != max {
            self.min = min;
            self.max = max;
            self.cache = OnceLock::new();
        }
    }

    pub fn scale(&self) -> AxisScale {
        self.scale
    }

    pub fn set_scale(&mut self, scale: AxisScale) {
        self.scale = scale;
        self.cache = OnceLock::new();
    }

    pub fn is_auto_tick(&self) -> bool {
        self.auto_tick
    }

    /// Switches back to automatic tick placement.
    pub fn set_auto_tick(&mut self) {
        self.auto_tick = true;
        self.tick_locations.clear();
        self.tick_labels.clear();
        self.cache = OnceLock::new();
    }

    /// Uses explicit tick locations; labels are formatted unless given.
    pub fn set_tick_locations(&mut self, locations: Vec<f64>, labels: Option<Vec<String>>) {
        self.auto_tick = false;
        self.tick_locations = locations;
        self.tick_labels = labels.unwrap_or_default();
        self.cache = OnceLock::new();
    }

    pub fn set_target_tick_count(&mut self, n: usize) {
        self.target_tick_count = n.max(1);
        self.cache = OnceLock::new();
    }

    pub fn set_minor_ticks(&mut self, visible: bool, num: usize) {
        self.minor_tick_visible = visible;
        self.minor_tick_num = num.max(1);
        self.cache = OnceLock::new();
    }

    pub fn is_inverse(&self) -> bool {
        self.inverse
    }

    pub fn set_inverse(&mut self, inverse: bool) {
        self.inverse = inverse;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Whether the next [`ticks`](Self::ticks) call rebuilds the cache.
    pub fn is_stale(&self) -> bool {
        self.cache.get().is_none()
    }

    /// Current ticks, rebuilding the cache if the range or policy changed.
    pub fn ticks(&self) -> &TickSet {
        self.cache.get_or_init(|| {
            let built = self.build_ticks();
            log::trace!("rebuilt {:?} axis ticks: {} major", self.kind, built.major.len());
            built
        })
    }

    fn build_ticks(&self) -> TickSet {
        let (lo, hi) = (self.min.min(self.max), self.min.max(self.max));
        if !self.auto_tick {
            return self.explicit_ticks(lo, hi);
        }
        match self.scale {
            AxisScale::Linear => {
                let (values, step) = nice_ticks(lo, hi, self.target_tick_count);
                let minor = if self.minor_tick_visible {
                    minor_between(&values, self.minor_tick_num)
                } else {
                    Vec::new()
                };
                let major = values
                    .into_iter()
                    .map(|value| TickLabel {
                        value,
                        text: format_tick_value(value, step),
                    })
                    .collect();
                TickSet { major, minor }
            }
            AxisScale::Log10 => {
                let exps = decade_exponents(lo, hi);
                let major = exps
                    .iter()
                    .map(|&e| TickLabel {
                        value: 10f64.powi(e),
                        text: format_decade(e),
                    })
                    .collect();
                let minor = if self.minor_tick_visible {
                    let first = exps.first().map_or(0, |e| e - 1);
                    let last = exps.last().map_or(0, |e| *e);
                    (first..=last)
                        .flat_map(|e| (2..10).map(move |k| f64::from(k) * 10f64.powi(e)))
                        .filter(|v| *v >= lo && *v <= hi)
                        .collect()
                } else {
                    Vec::new()
                };
                TickSet { major, minor }
            }
        }
    }

    fn explicit_ticks(&self, lo: f64, hi: f64) -> TickSet {
        let step = self
            .tick_locations
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .filter(|d| *d > 0.0)
            .fold(f64::INFINITY, f64::min);
        let step = if step.is_finite() { step } else { 1.0 };
        let major = self
            .tick_locations
            .iter()
            .enumerate()
            .filter(|(_, v)| **v >= lo && **v <= hi)
            .map(|(i, &value)| TickLabel {
                value,
                text: self.tick_labels.get(i).cloned().unwrap_or_else(|| match self.scale {
                    AxisScale::Linear => format_tick_value(value, step),
                    AxisScale::Log10 => format_tick_value(value, value),
                }),
            })
            .collect();
        TickSet {
            major,
            minor: Vec::new(),
        }
    }
}

/// Values splitting each gap between adjacent majors into `num` equal steps.
#[must_use]
pub fn minor_between(majors: &[f64], num: usize) -> Vec<f64> {
    let num = num.max(1);
    majors
        .windows(2)
        .flat_map(|w| {
            let (a, b) = (w[0], w[1]);
            #[allow(clippy::cast_precision_loss)]
            (1..num).map(move |k| a + (b - a) * k as f64 / num as f64)
        })
        .collect()
}
