//! Normalization functions mapping data values onto `[0, 1]`.
//!
//! The same function positions colorbar ticks and picks colors, so a value
//! always sits where its color is drawn.

use serde::{Deserialize, Serialize};

use crate::error::{ChartError, Result};

/// Maps data values into `[0, 1]` for color lookup and tick placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Normalize {
    /// Linear between `vmin` and `vmax`.
    Linear { vmin: f64, vmax: f64, clip: bool },
    /// Linear in `log10`; non-positive values are masked (NaN).
    Log { vmin: f64, vmax: f64, clip: bool },
    /// Discrete bins; boundaries are spaced evenly along the bar.
    Boundary {
        boundaries: Vec<f64>,
        ncolors: usize,
        clip: bool,
    },
}

impl Normalize {
    /// Linear normalization without clipping.
    #[must_use]
    pub fn linear(vmin: f64, vmax: f64) -> Self {
        Self::Linear {
            vmin,
            vmax,
            clip: false,
        }
    }

    /// Logarithmic normalization without clipping.
    #[must_use]
    pub fn log(vmin: f64, vmax: f64) -> Self {
        Self::Log {
            vmin,
            vmax,
            clip: false,
        }
    }

    /// Boundary normalization with one color per bin.
    #[must_use]
    pub fn boundary(boundaries: Vec<f64>) -> Self {
        let ncolors = boundaries.len().saturating_sub(1);
        Self::Boundary {
            boundaries,
            ncolors,
            clip: false,
        }
    }

    /// Checks the parameters.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Linear { vmin, vmax, .. } => {
                if !(vmin.is_finite() && vmax.is_finite() && vmin < vmax) {
                    return Err(ChartError::InvalidNormalize(format!(
                        "linear range [{vmin}, {vmax}]"
                    )));
                }
            }
            Self::Log { vmin, vmax, .. } => {
                if !(vmin.is_finite() && vmax.is_finite() && *vmin > 0.0 && vmin < vmax) {
                    return Err(ChartError::InvalidNormalize(format!(
                        "log range [{vmin}, {vmax}] must be positive and increasing"
                    )));
                }
            }
            Self::Boundary {
                boundaries,
                ncolors,
                ..
            } => {
                if boundaries.len() < 2 || boundaries.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(ChartError::InvalidNormalize(
                        "boundaries must be at least two increasing values".into(),
                    ));
                }
                if *ncolors == 0 {
                    return Err(ChartError::InvalidNormalize("ncolors must be positive".into()));
                }
            }
        }
        Ok(())
    }

    /// Lower end of the normalized range.
    #[must_use]
    pub fn vmin(&self) -> f64 {
        match self {
            Self::Linear { vmin, .. } | Self::Log { vmin, .. } => *vmin,
            Self::Boundary { boundaries, .. } => boundaries.first().copied().unwrap_or(0.0),
        }
    }

    /// Upper end of the normalized range.
    #[must_use]
    pub fn vmax(&self) -> f64 {
        match self {
            Self::Linear { vmax, .. } | Self::Log { vmax, .. } => *vmax,
            Self::Boundary { boundaries, .. } => boundaries.last().copied().unwrap_or(1.0),
        }
    }

    fn clip(&self) -> bool {
        match self {
            Self::Linear { clip, .. } | Self::Log { clip, .. } | Self::Boundary { clip, .. } => {
                *clip
            }
        }
    }

    /// Position of `value` along the bar; may fall outside `[0, 1]` unless clipping.
    #[must_use]
    pub fn normalize(&self, value: f64) -> f64 {
        let t = match self {
            Self::Linear { vmin, vmax, .. } => {
                let span = vmax - vmin;
                if span == 0.0 {
                    0.0
                } else {
                    (value - vmin) / span
                }
            }
            Self::Log { vmin, vmax, .. } => {
                if value <= 0.0 || *vmin <= 0.0 {
                    return f64::NAN;
                }
                let (lo, hi) = (vmin.log10(), vmax.log10());
                if hi == lo {
                    0.0
                } else {
                    (value.log10() - lo) / (hi - lo)
                }
            }
            Self::Boundary { boundaries, .. } => boundary_position(boundaries, value),
        };
        if self.clip() && !t.is_nan() {
            t.clamp(0.0, 1.0)
        } else {
            t
        }
    }

    /// Fraction used to sample a color map.
    ///
    /// Equal to [`normalize`](Self::normalize) except for boundary norms,
    /// where every value in a bin shares one color spread over `ncolors`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn color_fraction(&self, value: f64) -> f64 {
        match self {
            Self::Boundary {
                boundaries,
                ncolors,
                clip,
            } => {
                let nbins = boundaries.len().saturating_sub(1);
                if nbins == 0 || value.is_nan() {
                    return f64::NAN;
                }
                let (first, last) = (boundaries[0], boundaries[nbins]);
                if value < first {
                    return if *clip { 0.0 } else { -1.0 };
                }
                if value >= last {
                    return if *clip { 1.0 } else { 2.0 };
                }
                let bin = boundaries.partition_point(|b| *b <= value).saturating_sub(1);
                let ncolors = (*ncolors).max(1);
                let color_idx = if nbins == 1 {
                    0
                } else {
                    bin * (ncolors - 1) / (nbins - 1)
                };
                if ncolors == 1 {
                    0.5
                } else {
                    color_idx as f64 / (ncolors - 1) as f64
                }
            }
            _ => self.normalize(value),
        }
    }

    /// Value at bar position `t` (inverse of [`normalize`](Self::normalize)).
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn inverse(&self, t: f64) -> f64 {
        match self {
            Self::Linear { vmin, vmax, .. } => vmin + t * (vmax - vmin),
            Self::Log { vmin, vmax, .. } => {
                let (lo, hi) = (vmin.log10(), vmax.log10());
                10f64.powf(lo + t * (hi - lo))
            }
            Self::Boundary { boundaries, .. } => {
                let nbins = boundaries.len().saturating_sub(1);
                if nbins == 0 {
                    return f64::NAN;
                }
                let scaled = (t * nbins as f64).clamp(0.0, nbins as f64);
                let bin = (scaled.floor() as usize).min(nbins - 1);
                let frac = scaled - bin as f64;
                boundaries[bin] + frac * (boundaries[bin + 1] - boundaries[bin])
            }
        }
    }

    /// Whether the colorbar ticks should use decade spacing.
    #[must_use]
    pub fn is_log(&self) -> bool {
        matches!(self, Self::Log { .. })
    }
}

/// Piecewise-linear position: boundary `i` of `n` bins lands at `i / n`.
#[allow(clippy::cast_precision_loss)]
fn boundary_position(boundaries: &[f64], value: f64) -> f64 {
    let nbins = boundaries.len().saturating_sub(1);
    if nbins == 0 || value.is_nan() {
        return f64::NAN;
    }
    let n = nbins as f64;
    let (first, last) = (boundaries[0], boundaries[nbins]);
    if value <= first {
        let w = boundaries[1] - first;
        return (value - first) / w / n;
    }
    if value >= last {
        let w = last - boundaries[nbins - 1];
        return 1.0 + (value - last) / w / n;
    }
    let bin = boundaries.partition_point(|b| *b <= value).saturating_sub(1);
    let (a, b) = (boundaries[bin], boundaries[bin + 1]);
    (bin as f64 + (value - a) / (b - a)) / n
}
