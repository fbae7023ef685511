//! Legend and colorbar layout.
//!
//! Layout is pure: given a scheme, options and the viewport it produces a
//! [`LegendGeometry`] in pixel coordinates, which [`LegendGeometry::overlay`]
//! turns into overlay batches. Positions along the bar are expressed as a
//! fraction `t` in `[0, 1]` (bottom to top, or left to right) and a fraction
//! `across` the bar's thickness.
//!
//! Discrete legends give every break an equal cell and label break end
//! values. Continuous colorbars place ticks through the scheme's own
//! normalization, so a value's tick always sits on its color.

use chartgl_core::axis::{decade_exponents, format_decade, format_tick_value, minor_between, nice_ticks};
use chartgl_core::{
    BreakKind, ChartError, LegendOptions, LegendPosition, LegendScheme, LegendType, Normalize,
    Orientation,
};
use glam::{Vec2, Vec4};

use crate::backend::{HAlign, OverlayBatch, TextLabel, Topology, VAlign};

/// Color strips drawn for a smooth colorbar.
const COLORBAR_STRIPS: usize = 64;

/// Where the bar sits on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarGeometry {
    /// Top-left corner of the bar's bounding rectangle, caps included.
    pub origin: Vec2,
    pub length: f32,
    pub thickness: f32,
    pub orientation: Orientation,
    /// Tick length in pixels.
    pub tick_length: f32,
    /// Font size in pixels.
    pub font_size: f32,
}

impl BarGeometry {
    /// Places the bar against the configured viewport edge.
    #[must_use]
    pub fn place(options: &LegendOptions, viewport: Vec2, dpi_scale: f32) -> Self {
        let thickness = options.thickness * dpi_scale;
        let margin = options.margin * dpi_scale;
        let font_size = options.font_size * dpi_scale;
        // Room for tick labels on the outer side of the bar.
        let label_room = font_size * 4.0;
        let (orientation, origin, length) = match (options.orientation, options.position) {
            (Orientation::Vertical, LegendPosition::Left) => {
                let length = viewport.y * options.shrink;
                (
                    Orientation::Vertical,
                    Vec2::new(margin, (viewport.y - length) * 0.5),
                    length,
                )
            }
            (Orientation::Vertical, _) => {
                let length = viewport.y * options.shrink;
                (
                    Orientation::Vertical,
                    Vec2::new(
                        viewport.x - margin - thickness - label_room,
                        (viewport.y - length) * 0.5,
                    ),
                    length,
                )
            }
            (Orientation::Horizontal, LegendPosition::Top) => {
                let length = viewport.x * options.shrink;
                (
                    Orientation::Horizontal,
                    Vec2::new((viewport.x - length) * 0.5, margin),
                    length,
                )
            }
            (Orientation::Horizontal, _) => {
                let length = viewport.x * options.shrink;
                (
                    Orientation::Horizontal,
                    Vec2::new(
                        (viewport.x - length) * 0.5,
                        viewport.y - margin - thickness - font_size * 2.0,
                    ),
                    length,
                )
            }
        };
        Self {
            origin,
            length,
            thickness,
            orientation,
            tick_length: options.tick_length * dpi_scale,
            font_size,
        }
    }

    /// Pixel position of bar fraction `t` at fraction `across` of the thickness.
    #[must_use]
    pub fn at(&self, t: f32, across: f32) -> Vec2 {
        match self.orientation {
            Orientation::Vertical => Vec2::new(
                self.origin.x + across * self.thickness,
                self.origin.y + (1.0 - t) * self.length,
            ),
            Orientation::Horizontal => Vec2::new(
                self.origin.x + t * self.length,
                self.origin.y + across * self.thickness,
            ),
        }
    }

    /// Size of one label along the bar, used to thin out ticks.
    fn label_extent(&self, longest: usize) -> f32 {
        match self.orientation {
            Orientation::Vertical => self.font_size,
            #[allow(clippy::cast_precision_loss)]
            Orientation::Horizontal => self.font_size * 0.6 * longest.max(1) as f32,
        }
    }

    fn across_of(&self, pixels: f32) -> f32 {
        pixels / self.thickness.max(f32::EPSILON)
    }
}

/// One filled cell of the bar.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendCell {
    /// Convex outline in pixels.
    pub polygon: Vec<Vec2>,
    pub color: Vec4,
}

/// Everything needed to draw a legend.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendGeometry {
    pub bar: BarGeometry,
    pub cells: Vec<LegendCell>,
    /// Closed outline following the bar silhouette, caps included.
    pub neatline: Vec<Vec2>,
    pub ticks: Vec<[Vec2; 2]>,
    pub minor_ticks: Vec<[Vec2; 2]>,
    pub labels: Vec<TextLabel>,
    /// Values of the labelled ticks, in label order.
    pub tick_values: Vec<f64>,
}

/// Number of breaks between labels so that labels do not overlap.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn tick_gap(break_count: usize, length: f32, label_extent: f32) -> usize {
    if break_count == 0 || label_extent <= 0.0 {
        return 1;
    }
    let max_labels = ((length / (label_extent * 1.5)).floor() as usize).max(1);
    break_count.div_ceil(max_labels).max(1)
}

/// Break indices labelled by auto ticking, centered in the bar.
///
/// Starts at `(n % gap) / 2` and steps by `gap` while below `n - 1`.
#[must_use]
pub fn auto_tick_indices(break_count: usize, gap: usize) -> Vec<usize> {
    let gap = gap.max(1);
    let start = (break_count % gap) / 2;
    (start..break_count.saturating_sub(1)).step_by(gap).collect()
}

/// Label anchor for tick labels given bar orientation and label angle.
#[must_use]
pub fn label_alignment(orientation: Orientation, angle: f32) -> (HAlign, VAlign) {
    let a = angle.abs();
    match orientation {
        Orientation::Vertical => {
            if a == 0.0 {
                (HAlign::Left, VAlign::Middle)
            } else if a < 45.0 {
                (HAlign::Left, VAlign::Bottom)
            } else {
                (HAlign::Center, VAlign::Top)
            }
        }
        Orientation::Horizontal => {
            if a == 0.0 {
                (HAlign::Center, VAlign::Top)
            } else if a < 45.0 {
                (HAlign::Right, VAlign::Top)
            } else {
                (HAlign::Right, VAlign::Middle)
            }
        }
    }
}

/// Lays out the scheme as a discrete legend or continuous colorbar.
pub fn layout(
    scheme: &LegendScheme,
    options: &LegendOptions,
    viewport: Vec2,
    dpi_scale: f32,
) -> Result<LegendGeometry, ChartError> {
    scheme.validate()?;
    let bar = BarGeometry::place(options, viewport, dpi_scale);
    if scheme.is_continuous() {
        layout_colorbar(scheme, options, &bar)
    } else {
        Ok(layout_discrete(scheme, options, &bar))
    }
}

/// Cap silhouette for the ends of a bar.
#[derive(Debug, Clone, Copy)]
struct Caps {
    /// Body starts here; `0` when there is no min cap.
    lo: f32,
    /// Body ends here; `1` when there is no max cap.
    hi: f32,
    min_arrow: bool,
    max_arrow: bool,
}

impl Caps {
    fn new(extend_min: bool, extend_max: bool, cap: f32, rect: bool) -> Self {
        Self {
            lo: if extend_min { cap } else { 0.0 },
            hi: if extend_max { 1.0 - cap } else { 1.0 },
            min_arrow: extend_min && !rect,
            max_arrow: extend_max && !rect,
        }
    }

    /// Outline of the whole bar in `(t, across)` terms.
    fn silhouette(&self, bar: &BarGeometry) -> Vec<Vec2> {
        let mut pts = Vec::with_capacity(8);
        if self.min_arrow {
            pts.push(bar.at(0.0, 0.5));
            pts.push(bar.at(self.lo, 0.0));
        } else {
            pts.push(bar.at(0.0, 0.0));
        }
        if self.max_arrow {
            pts.push(bar.at(self.hi, 0.0));
            pts.push(bar.at(1.0, 0.5));
            pts.push(bar.at(self.hi, 1.0));
        } else {
            pts.push(bar.at(1.0, 0.0));
            pts.push(bar.at(1.0, 1.0));
        }
        if self.min_arrow {
            pts.push(bar.at(self.lo, 1.0));
        } else {
            pts.push(bar.at(0.0, 1.0));
        }
        pts
    }

    fn min_cell(&self, bar: &BarGeometry) -> Vec<Vec2> {
        if self.min_arrow {
            vec![bar.at(0.0, 0.5), bar.at(self.lo, 0.0), bar.at(self.lo, 1.0)]
        } else {
            rect(bar, 0.0, self.lo)
        }
    }

    fn max_cell(&self, bar: &BarGeometry) -> Vec<Vec2> {
        if self.max_arrow {
            vec![bar.at(self.hi, 0.0), bar.at(1.0, 0.5), bar.at(self.hi, 1.0)]
        } else {
            rect(bar, self.hi, 1.0)
        }
    }
}

fn rect(bar: &BarGeometry, t0: f32, t1: f32) -> Vec<Vec2> {
    vec![bar.at(t0, 0.0), bar.at(t1, 0.0), bar.at(t1, 1.0), bar.at(t0, 1.0)]
}

/// Smallest positive spacing between break boundaries, for label precision.
fn break_step(scheme: &LegendScheme) -> f64 {
    let mut values: Vec<f64> = scheme
        .breaks
        .iter()
        .flat_map(|b| [b.start_value, b.end_value])
        .collect();
    values.sort_by(f64::total_cmp);
    values
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|d| *d > 0.0)
        .fold(f64::INFINITY, f64::min)
        .min(1.0e12)
}

fn values_match(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

struct TickBuilder<'a> {
    bar: &'a BarGeometry,
    options: &'a LegendOptions,
    ticks: Vec<[Vec2; 2]>,
    labels: Vec<TextLabel>,
    values: Vec<f64>,
    /// Bar fractions of the major ticks.
    positions: Vec<f32>,
}

impl<'a> TickBuilder<'a> {
    fn new(bar: &'a BarGeometry, options: &'a LegendOptions) -> Self {
        Self {
            bar,
            options,
            ticks: Vec::new(),
            labels: Vec::new(),
            values: Vec::new(),
            positions: Vec::new(),
        }
    }

    fn tick_end(&self) -> f32 {
        1.0 + self.bar.across_of(self.bar.tick_length)
    }

    fn add(&mut self, t: f32, value: f64, text: String) {
        let end = self.tick_end();
        self.ticks.push([self.bar.at(t, 1.0), self.bar.at(t, end)]);
        let (h_align, v_align) = label_alignment(self.bar.orientation, self.options.label_angle);
        let gap = self.bar.across_of(self.bar.font_size * 0.25);
        self.labels.push(TextLabel {
            text,
            position: self.bar.at(t, end + gap),
            h_align,
            v_align,
            angle: self.options.label_angle,
            font_size: self.bar.font_size,
            color: self.options.label_color,
        });
        self.values.push(value);
        self.positions.push(t);
    }

    fn minor(&self, t: f32) -> [Vec2; 2] {
        let half = 1.0 + self.bar.across_of(self.bar.tick_length * 0.5);
        [self.bar.at(t, 1.0), self.bar.at(t, half)]
    }
}

/// Explicit tick text for `value`, or `None` if it was not requested.
fn explicit_label(options: &LegendOptions, value: f64, step: f64) -> Option<String> {
    let i = options
        .tick_locations
        .iter()
        .position(|loc| values_match(*loc, value))?;
    Some(
        options
            .tick_labels
            .get(i)
            .cloned()
            .unwrap_or_else(|| format_tick_value(value, step)),
    )
}

fn bar_title(bar: &BarGeometry, options: &LegendOptions) -> Option<TextLabel> {
    if options.label.is_empty() {
        return None;
    }
    let offset = 1.0 + bar.across_of(bar.tick_length + bar.font_size * 3.5);
    let (position, angle, h_align, v_align) = match bar.orientation {
        Orientation::Vertical => (bar.at(0.5, offset), 90.0, HAlign::Center, VAlign::Top),
        Orientation::Horizontal => (bar.at(0.5, offset), 0.0, HAlign::Center, VAlign::Top),
    };
    Some(TextLabel {
        text: options.label.clone(),
        position,
        h_align,
        v_align,
        angle,
        font_size: bar.font_size,
        color: options.label_color,
    })
}

fn cell_shape(kind: &BreakKind, bar: &BarGeometry, t0: f32, t1: f32) -> Vec<Vec2> {
    match kind {
        BreakKind::Point(p) => {
            let c = bar.at((t0 + t1) * 0.5, 0.5);
            let cell = (t1 - t0) * bar.length;
            let r = (p.size * 0.5).min(bar.thickness * 0.5).min(cell * 0.5);
            vec![
                c + Vec2::new(0.0, -r),
                c + Vec2::new(r, 0.0),
                c + Vec2::new(0.0, r),
                c + Vec2::new(-r, 0.0),
            ]
        }
        BreakKind::Line(l) => {
            // A stroke across the cell, along the bar.
            let half = bar.across_of(l.width.max(1.0) * 0.5);
            let (a, b) = (0.5 - half, 0.5 + half);
            vec![bar.at(t0, a), bar.at(t1, a), bar.at(t1, b), bar.at(t0, b)]
        }
        BreakKind::Color | BreakKind::Polygon(_) | BreakKind::ColorBar => rect(bar, t0, t1),
    }
}

/// One cell per break; end values are labelled.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn layout_discrete(scheme: &LegendScheme, options: &LegendOptions, bar: &BarGeometry) -> LegendGeometry {
    let n = scheme.breaks.len();
    let cell = 1.0 / n.max(1) as f32;
    let graduated = scheme.legend_type == LegendType::GraduatedColor;
    let caps = Caps::new(
        graduated && scheme.extend.extends_min() && n > 1,
        graduated && scheme.extend.extends_max() && n > 1,
        cell,
        options.extend_rect,
    );

    let mut cells = Vec::with_capacity(n);
    for (i, brk) in scheme.breaks.iter().enumerate() {
        let (t0, t1) = (i as f32 * cell, (i + 1) as f32 * cell);
        let polygon = if i == 0 && caps.lo > 0.0 {
            caps.min_cell(bar)
        } else if i == n - 1 && caps.hi < 1.0 {
            caps.max_cell(bar)
        } else {
            cell_shape(&brk.kind, bar, t0, t1)
        };
        cells.push(LegendCell {
            polygon,
            color: brk.color,
        });
    }

    let step = break_step(scheme);
    let mut tb = TickBuilder::new(bar, options);
    let text_of = |brk: &chartgl_core::ColorBreak, v: f64| {
        if scheme.legend_type == LegendType::GraduatedColor || brk.caption.is_empty() {
            format_tick_value(v, step)
        } else {
            brk.caption.clone()
        }
    };

    if !options.auto_tick && !options.tick_locations.is_empty() {
        for (i, brk) in scheme.breaks.iter().enumerate() {
            if i == 0 {
                if let Some(text) = explicit_label(options, brk.start_value, step) {
                    tb.add(0.0, brk.start_value, text);
                }
            }
            if let Some(text) = explicit_label(options, brk.end_value, step) {
                tb.add((i + 1) as f32 * cell, brk.end_value, text);
            }
        }
    } else if scheme.legend_type == LegendType::GraduatedColor {
        if options.draw_min_label {
            if let Some(first) = scheme.breaks.first() {
                tb.add(0.0, first.start_value, text_of(first, first.start_value));
            }
        }
        let longest = scheme
            .breaks
            .iter()
            .map(|b| format_tick_value(b.end_value, step).len())
            .max()
            .unwrap_or(1);
        let gap = tick_gap(n, bar.length, bar.label_extent(longest));
        for i in auto_tick_indices(n, gap) {
            let brk = &scheme.breaks[i];
            tb.add((i + 1) as f32 * cell, brk.end_value, text_of(brk, brk.end_value));
        }
    } else {
        // Categorical legends label every cell at its center.
        for (i, brk) in scheme.breaks.iter().enumerate() {
            tb.add((i as f32 + 0.5) * cell, brk.start_value, text_of(brk, brk.start_value));
        }
    }

    // Discrete ticks sit on break boundaries, so minors split the bar
    // distance between adjacent majors.
    let minor_ticks = if options.minor_ticks {
        let majors: Vec<f64> = tb.positions.iter().map(|t| f64::from(*t)).collect();
        minor_between(&majors, options.minor_tick_num)
            .into_iter()
            .map(|t| tb.minor(t as f32))
            .collect()
    } else {
        Vec::new()
    };

    let mut labels = tb.labels;
    labels.extend(bar_title(bar, options));
    LegendGeometry {
        bar: *bar,
        cells,
        neatline: caps.silhouette(bar),
        ticks: tb.ticks,
        minor_ticks,
        labels,
        tick_values: tb.values,
    }
}

/// Major tick values for a colorbar and their labels.
fn colorbar_ticks(norm: &Normalize, options: &LegendOptions, bar: &BarGeometry) -> Vec<(f64, String)> {
    let (vmin, vmax) = (norm.vmin(), norm.vmax());
    if !options.auto_tick && !options.tick_locations.is_empty() {
        let (_, step) = nice_ticks(vmin, vmax, 5);
        return options
            .tick_locations
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let text = options
                    .tick_labels
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format_tick_value(*v, step));
                (*v, text)
            })
            .collect();
    }
    match norm {
        Normalize::Log { .. } => decade_exponents(vmin, vmax)
            .into_iter()
            .map(|e| (10f64.powi(e), format_decade(e)))
            .collect(),
        Normalize::Boundary { boundaries, .. } => {
            let step = boundaries
                .windows(2)
                .map(|w| w[1] - w[0])
                .fold(f64::INFINITY, f64::min);
            let gap = tick_gap(boundaries.len(), bar.length, bar.label_extent(6));
            boundaries
                .iter()
                .step_by(gap)
                .map(|b| (*b, format_tick_value(*b, step)))
                .collect()
        }
        Normalize::Linear { .. } => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let target = ((bar.length / (bar.label_extent(6) * 3.0)) as usize).clamp(2, 10);
            let (values, step) = nice_ticks(vmin, vmax, target);
            values
                .into_iter()
                .map(|v| (v, format_tick_value(v, step)))
                .collect()
        }
    }
}

/// A continuous colorbar with optional extend caps.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn layout_colorbar(
    scheme: &LegendScheme,
    options: &LegendOptions,
    bar: &BarGeometry,
) -> Result<LegendGeometry, ChartError> {
    let (Some(map), Some(norm)) = (&scheme.color_map, &scheme.normalize) else {
        return Err(ChartError::MalformedLegend(
            "colorbar needs a color map and a normalization".into(),
        ));
    };
    norm.validate()?;

    let cap = options.extend_fraction.clamp(0.0, 0.45);
    let caps = Caps::new(
        scheme.extend.extends_min(),
        scheme.extend.extends_max(),
        cap,
        options.extend_rect,
    );
    let body = caps.hi - caps.lo;
    let to_t = |fraction: f64| caps.lo + body * fraction as f32;

    let strips = match norm {
        Normalize::Boundary { boundaries, .. } => boundaries.len().saturating_sub(1).max(1),
        _ => COLORBAR_STRIPS,
    };
    let mut cells = Vec::with_capacity(strips + 2);
    if caps.lo > 0.0 {
        cells.push(LegendCell {
            polygon: caps.min_cell(bar),
            color: map.under_color(),
        });
    }
    for k in 0..strips {
        let (f0, f1) = (k as f64 / strips as f64, (k + 1) as f64 / strips as f64);
        let value = norm.inverse((f0 + f1) * 0.5);
        cells.push(LegendCell {
            polygon: rect(bar, to_t(f0), to_t(f1)),
            color: map.map(norm.color_fraction(value)),
        });
    }
    if caps.hi < 1.0 {
        cells.push(LegendCell {
            polygon: caps.max_cell(bar),
            color: map.over_color(),
        });
    }

    let mut tb = TickBuilder::new(bar, options);
    let majors = colorbar_ticks(norm, options, bar);
    for (value, text) in &majors {
        let f = norm.normalize(*value);
        if f.is_nan() || !(-1e-9..=1.0 + 1e-9).contains(&f) {
            continue;
        }
        tb.add(to_t(f.clamp(0.0, 1.0)), *value, text.clone());
    }

    let minor_ticks = if options.minor_ticks {
        let values: Vec<f64> = majors.iter().map(|(v, _)| *v).collect();
        minor_between(&values, options.minor_tick_num)
            .into_iter()
            .map(|v| norm.normalize(v))
            .filter(|f| (0.0..=1.0).contains(f))
            .map(|f| tb.minor(to_t(f)))
            .collect()
    } else {
        Vec::new()
    };

    let mut labels = tb.labels;
    labels.extend(bar_title(bar, options));
    Ok(LegendGeometry {
        bar: *bar,
        cells,
        neatline: caps.silhouette(bar),
        ticks: tb.ticks,
        minor_ticks,
        labels,
        tick_values: tb.values,
    })
}

impl LegendGeometry {
    /// Filled cells, then neatline and ticks, as overlay batches.
    #[must_use]
    pub fn overlay(&self, options: &LegendOptions) -> (OverlayBatch, OverlayBatch) {
        let mut fill = OverlayBatch::new(Topology::Triangles);
        for cell in &self.cells {
            fill.push_convex(&cell.polygon, cell.color);
        }
        let mut lines = OverlayBatch::new(Topology::Lines);
        if options.draw_neatline {
            lines.push_loop(&self.neatline, options.neatline_color);
        }
        for [a, b] in self.ticks.iter().chain(&self.minor_ticks) {
            lines.push_segment(*a, *b, options.label_color);
        }
        (fill, lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartgl_core::{ColorMap, ExtendMode, ShapeType};

    fn vertical_bar(length: f32) -> BarGeometry {
        BarGeometry {
            origin: Vec2::new(700.0, 100.0),
            length,
            thickness: 20.0,
            orientation: Orientation::Vertical,
            tick_length: 4.0,
            font_size: 12.0,
        }
    }

    fn graduated(n: usize) -> LegendScheme {
        #[allow(clippy::cast_precision_loss)]
        let values: Vec<f64> = (0..=n).map(|i| i as f64 * 10.0).collect();
        let colors = vec![Vec4::ONE; n];
        LegendScheme::graduated(ShapeType::Polygon, &values, &colors).unwrap()
    }

    #[test]
    fn test_auto_tick_oracle() {
        assert_eq!(auto_tick_indices(10, 3), vec![0, 3, 6]);
        assert_eq!(auto_tick_indices(10, 1), (0..9).collect::<Vec<_>>());
        assert_eq!(auto_tick_indices(11, 3), vec![1, 4, 7]);
        assert_eq!(auto_tick_indices(1, 1), Vec::<usize>::new());
    }

    #[test]
    fn test_tick_gap() {
        // 80 px fits floor(80 / 18) = 4 labels
        assert_eq!(tick_gap(10, 80.0, 12.0), 3);
        assert_eq!(tick_gap(10, 1000.0, 12.0), 1);
        assert_eq!(tick_gap(10, 1.0, 12.0), 10);
    }

    #[test]
    fn test_discrete_labels_selected_breaks() {
        let scheme = graduated(10);
        let geom = layout_discrete(&scheme, &LegendOptions::default(), &vertical_bar(80.0));
        // breaks 0, 3, 6 are labelled with their end values
        assert_eq!(geom.tick_values, vec![10.0, 40.0, 70.0]);
        assert_eq!(geom.cells.len(), 10);
        assert_eq!(geom.labels[0].text, "10");
    }

    #[test]
    fn test_draw_min_label() {
        let scheme = graduated(10);
        let options = LegendOptions {
            draw_min_label: true,
            ..LegendOptions::default()
        };
        let geom = layout_discrete(&scheme, &options, &vertical_bar(80.0));
        assert_eq!(geom.tick_values, vec![0.0, 10.0, 40.0, 70.0]);
        assert_eq!(geom.ticks[0][0], vertical_bar(80.0).at(0.0, 1.0));
    }

    #[test]
    fn test_unique_values_label_every_break() {
        let scheme =
            LegendScheme::unique_values(ShapeType::Point, &[1.0, 2.0, 3.0], &[Vec4::ONE; 3]).unwrap();
        let geom = layout_discrete(&scheme, &LegendOptions::default(), &vertical_bar(30.0));
        assert_eq!(geom.tick_values, vec![1.0, 2.0, 3.0]);
        assert_eq!(geom.labels[1].text, "2");
        // point cells are diamonds
        assert_eq!(geom.cells[0].polygon.len(), 4);
    }

    #[test]
    fn test_explicit_ticks_match_break_values() {
        let scheme = graduated(4);
        let options = LegendOptions {
            auto_tick: false,
            tick_locations: vec![0.0, 20.0, 25.0],
            tick_labels: vec!["zero".into(), "twenty".into(), "unused".into()],
            ..LegendOptions::default()
        };
        let geom = layout_discrete(&scheme, &options, &vertical_bar(200.0));
        assert_eq!(geom.tick_values, vec![0.0, 20.0]);
        assert_eq!(geom.labels[1].text, "twenty");
    }

    #[test]
    fn test_pointed_caps_shape_the_neatline() {
        let scheme = graduated(5).with_extend(ExtendMode::Both);
        let bar = vertical_bar(100.0);
        let geom = layout_discrete(&scheme, &LegendOptions::default(), &bar);
        assert_eq!(geom.cells[0].polygon.len(), 3);
        assert_eq!(geom.cells[4].polygon.len(), 3);
        assert_eq!(geom.neatline.len(), 6);
        assert!(geom.neatline.contains(&bar.at(0.0, 0.5)));
        assert!(geom.neatline.contains(&bar.at(1.0, 0.5)));
        assert!(!geom.neatline.contains(&bar.at(0.0, 0.0)));

        let rect_caps = LegendOptions {
            extend_rect: true,
            ..LegendOptions::default()
        };
        let geom = layout_discrete(&scheme, &rect_caps, &bar);
        assert_eq!(geom.cells[0].polygon.len(), 4);
        assert_eq!(geom.neatline.len(), 4);
    }

    #[test]
    fn test_single_end_cap() {
        let scheme = graduated(5).with_extend(ExtendMode::Max);
        let bar = vertical_bar(100.0);
        let geom = layout_discrete(&scheme, &LegendOptions::default(), &bar);
        assert_eq!(geom.cells[0].polygon.len(), 4);
        assert_eq!(geom.cells[4].polygon.len(), 3);
        assert_eq!(geom.neatline.len(), 5);
    }

    #[test]
    fn test_log_colorbar_decades() {
        let scheme = LegendScheme::continuous(
            ColorMap::new("gray", vec![Vec4::ZERO, Vec4::ONE]),
            Normalize::log(1.0, 1000.0),
        )
        .unwrap();
        let bar = vertical_bar(300.0);
        let geom = layout_colorbar(&scheme, &LegendOptions::default(), &bar).unwrap();
        assert_eq!(geom.tick_values, vec![1.0, 10.0, 100.0, 1000.0]);
        let texts: Vec<_> = geom.labels.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["10^{0}", "10^{1}", "10^{2}", "10^{3}"]);
        // decades are evenly spaced under a log norm
        let ys: Vec<f32> = geom.ticks.iter().map(|t| t[0].y).collect();
        assert!((ys[0] - ys[1] - (ys[1] - ys[2])).abs() < 1e-3);
        assert!((ys[0] - (bar.origin.y + bar.length)).abs() < 1e-3);
        assert!((ys[3] - bar.origin.y).abs() < 1e-3);
    }

    #[test]
    fn test_colorbar_ticks_follow_normalization() {
        let norm = Normalize::linear(0.0, 100.0);
        let scheme =
            LegendScheme::continuous(ColorMap::new("gray", vec![Vec4::ZERO, Vec4::ONE]), norm.clone())
                .unwrap();
        let bar = vertical_bar(300.0);
        let geom = layout_colorbar(&scheme, &LegendOptions::default(), &bar).unwrap();
        for (value, tick) in geom.tick_values.iter().zip(&geom.ticks) {
            #[allow(clippy::cast_possible_truncation)]
            let expected = bar.at(norm.normalize(*value) as f32, 1.0);
            assert!((tick[0] - expected).length() < 1e-3);
        }
        assert_eq!(geom.cells.len(), COLORBAR_STRIPS);
    }

    #[test]
    fn test_colorbar_extend_caps_use_under_over() {
        let map = ColorMap {
            under: Some(Vec4::new(1.0, 0.0, 0.0, 1.0)),
            over: Some(Vec4::new(0.0, 0.0, 1.0, 1.0)),
            ..ColorMap::new("gray", vec![Vec4::ZERO, Vec4::ONE])
        };
        let scheme = LegendScheme::continuous(map, Normalize::linear(0.0, 1.0))
            .unwrap()
            .with_extend(ExtendMode::Both);
        let geom = layout_colorbar(&scheme, &LegendOptions::default(), &vertical_bar(200.0)).unwrap();
        assert_eq!(geom.cells.len(), COLORBAR_STRIPS + 2);
        assert_eq!(geom.cells[0].color, Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(geom.cells[0].polygon.len(), 3);
        assert_eq!(geom.neatline.len(), 6);
    }

    #[test]
    fn test_minor_ticks_subdivide_majors() {
        let scheme = LegendScheme::continuous(
            ColorMap::new("gray", vec![Vec4::ZERO, Vec4::ONE]),
            Normalize::log(1.0, 100.0),
        )
        .unwrap();
        let options = LegendOptions {
            minor_ticks: true,
            minor_tick_num: 5,
            ..LegendOptions::default()
        };
        let geom = layout_colorbar(&scheme, &options, &vertical_bar(300.0)).unwrap();
        // two decade gaps, four minor ticks each
        assert_eq!(geom.minor_ticks.len(), 8);
    }

    #[test]
    fn test_discrete_minor_ticks_between_labels() {
        let scheme = graduated(10);
        let bar = vertical_bar(80.0);
        let options = LegendOptions {
            minor_ticks: true,
            minor_tick_num: 3,
            ..LegendOptions::default()
        };
        let geom = layout_discrete(&scheme, &options, &bar);
        // majors at 0.1, 0.4 and 0.7 of the bar, two minors in each gap
        assert_eq!(geom.minor_ticks.len(), 4);
        for (tick, t) in geom.minor_ticks.iter().zip([0.2, 0.3, 0.5, 0.6]) {
            assert!((tick[0] - bar.at(t, 1.0)).length() < 1e-3);
        }

        let plain = layout_discrete(&scheme, &LegendOptions::default(), &bar);
        assert!(plain.minor_ticks.is_empty());
    }

    #[test]
    fn test_horizontal_mirror() {
        let scheme = graduated(4);
        let bar = BarGeometry {
            orientation: Orientation::Horizontal,
            ..vertical_bar(400.0)
        };
        let geom = layout_discrete(&scheme, &LegendOptions::default(), &bar);
        let ys: Vec<f32> = geom.ticks.iter().map(|t| t[0].y).collect();
        assert!(ys.iter().all(|y| (*y - ys[0]).abs() < 1e-6));
        assert!(geom.ticks[0][0].x < geom.ticks[1][0].x);
        assert_eq!(geom.labels[0].h_align, HAlign::Center);
    }

    #[test]
    fn test_label_alignment_by_angle() {
        assert_eq!(label_alignment(Orientation::Horizontal, 0.0), (HAlign::Center, VAlign::Top));
        assert_eq!(label_alignment(Orientation::Horizontal, 30.0), (HAlign::Right, VAlign::Top));
        assert_eq!(label_alignment(Orientation::Horizontal, 90.0), (HAlign::Right, VAlign::Middle));
        assert_eq!(label_alignment(Orientation::Vertical, 0.0), (HAlign::Left, VAlign::Middle));
    }

    #[test]
    fn test_malformed_scheme_is_rejected() {
        let empty = LegendScheme::default();
        assert!(matches!(
            layout(&empty, &LegendOptions::default(), Vec2::new(800.0, 600.0), 1.0),
            Err(ChartError::MalformedLegend(_))
        ));
        let no_norm = LegendScheme {
            color_map: Some(ColorMap::new("gray", vec![Vec4::ZERO, Vec4::ONE])),
            ..LegendScheme::default()
        };
        assert!(layout(&no_norm, &LegendOptions::default(), Vec2::new(800.0, 600.0), 1.0).is_err());
    }

    #[test]
    fn test_overlay_batches() {
        let scheme = graduated(3);
        let geom = layout_discrete(&scheme, &LegendOptions::default(), &vertical_bar(300.0));
        let (fill, lines) = geom.overlay(&LegendOptions::default());
        assert_eq!(fill.indices.len(), 3 * 6);
        // neatline (4 segments) plus one per tick
        assert_eq!(lines.indices.len(), (4 + geom.ticks.len()) * 2);
    }
}
