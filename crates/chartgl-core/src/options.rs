//! Configuration options for plots and legends.

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::interaction::InteractionConfig;

/// Plot-wide drawing options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotOptions {
    /// Background color.
    pub background_color: Vec4,

    /// Color of axis lines, ticks and labels.
    pub foreground_color: Vec4,

    /// Whether to enable multisample antialiasing.
    pub antialias: bool,

    /// Whether to alpha-blend translucent graphics.
    pub blend: bool,

    /// Draw the base rectangle under the data.
    pub draw_base: bool,

    /// Draw the full bounding box.
    pub draw_bounding_box: bool,

    /// Draw grid lines at the major ticks on the back walls.
    pub draw_grid: bool,

    /// Draw axis lines, ticks and labels.
    pub draw_axes: bool,

    /// Clip graphics to the axes extent.
    pub clip_plane: bool,

    pub box_color: Vec4,
    pub grid_color: Vec4,

    /// Tick length in normalized units.
    pub tick_length: f32,

    pub tick_font_size: f32,
    pub axis_label_font_size: f32,
    pub title_font_size: f32,

    /// Multiplier applied to every pixel size (line widths, fonts, markers).
    pub dpi_scale: f32,

    pub lighting: Lighting,

    pub interaction: InteractionConfig,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            background_color: Vec4::ONE,
            foreground_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            antialias: true,
            blend: true,
            draw_base: true,
            draw_bounding_box: false,
            draw_grid: true,
            draw_axes: true,
            clip_plane: true,
            box_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            grid_color: Vec4::new(0.8, 0.8, 0.8, 1.0),
            tick_length: 0.08,
            tick_font_size: 12.0,
            axis_label_font_size: 14.0,
            title_font_size: 16.0,
            dpi_scale: 1.0,
            lighting: Lighting::default(),
            interaction: InteractionConfig::default(),
        }
    }
}

impl PlotOptions {
    /// Serializes the options as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses options from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Phong lighting parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lighting {
    pub enabled: bool,
    /// Light direction in normalized space, pointing toward the light.
    pub direction: Vec3,
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
    pub shininess: f32,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            enabled: false,
            direction: Vec3::new(-1.0, -1.0, 1.0),
            ambient: 0.3,
            diffuse: 0.7,
            specular: 0.2,
            shininess: 32.0,
        }
    }
}

/// GPU-compatible lighting block.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingUniforms {
    pub direction: [f32; 3],
    pub enabled: f32,
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
    pub shininess: f32,
}

impl From<&Lighting> for LightingUniforms {
    fn from(l: &Lighting) -> Self {
        Self {
            direction: l.direction.normalize_or_zero().to_array(),
            enabled: if l.enabled { 1.0 } else { 0.0 },
            ambient: l.ambient,
            diffuse: l.diffuse,
            specular: l.specular,
            shininess: l.shininess,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    #[default]
    Vertical,
}

/// Where the legend is anchored in the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LegendPosition {
    #[default]
    Right,
    Bottom,
    Left,
    Top,
}

/// Legend and colorbar layout options. Sizes are in pixels before DPI scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegendOptions {
    pub visible: bool,
    pub orientation: Orientation,
    pub position: LegendPosition,
    /// Bar length as a fraction of the viewport side it runs along.
    pub shrink: f32,
    /// Bar thickness.
    pub thickness: f32,
    /// Gap between the bar and the viewport edge.
    pub margin: f32,
    pub auto_tick: bool,
    /// Explicit tick values; used when `auto_tick` is off.
    pub tick_locations: Vec<f64>,
    /// Labels for `tick_locations`; formatted values when empty.
    pub tick_labels: Vec<String>,
    /// Also label the start value of the first break.
    pub draw_min_label: bool,
    /// Draw end cells of an extended bar as rectangles instead of arrows.
    pub extend_rect: bool,
    /// Length of an extend cap relative to the bar length.
    pub extend_fraction: f32,
    /// Tick label rotation in degrees.
    pub label_angle: f32,
    pub font_size: f32,
    pub tick_length: f32,
    pub minor_ticks: bool,
    pub minor_tick_num: usize,
    pub draw_neatline: bool,
    pub neatline_color: Vec4,
    pub label_color: Vec4,
    /// Title drawn along the bar.
    pub label: String,
}

impl Default for LegendOptions {
    fn default() -> Self {
        Self {
            visible: true,
            orientation: Orientation::Vertical,
            position: LegendPosition::Right,
            shrink: 0.8,
            thickness: 20.0,
            margin: 20.0,
            auto_tick: true,
            tick_locations: Vec::new(),
            tick_labels: Vec::new(),
            draw_min_label: false,
            extend_rect: false,
            extend_fraction: 0.05,
            label_angle: 0.0,
            font_size: 12.0,
            tick_length: 4.0,
            minor_ticks: false,
            minor_tick_num: 5,
            draw_neatline: true,
            neatline_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            label_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            label: String::new(),
        }
    }
}
