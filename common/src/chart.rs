use std::{fmt, path::Path, str::FromStr};

use eyre::{Result, bail};
use plotters::{
    coord::{Shift, types::RangedCoordf64},
    prelude::*,
    style::{
        Color as _,
        text_anchor::{HPos, Pos, VPos},
    },
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

const FIGURE_BACKGROUND: RGBColor = RGBColor(0x0d, 0x0d, 0x0d);
const PANEL_BACKGROUND: RGBColor = RGBColor(0x1a, 0x1a, 0x1a);
const GRID: RGBColor = RGBColor(0x2a, 0x2a, 0x2a);

const TITLE_FONT_SIZE: u32 = 28;
const CAPTION_FONT_SIZE: u32 = 20;
const AXIS_LABEL_FONT_SIZE: u32 = 16;
const TICK_LABEL_FONT_SIZE: u32 = 13;
const DATA_LABEL_FONT_SIZE: u32 = 13;

const PANEL_SIZE: (u32, u32) = (800, 550);
const BAR_WIDTH: f64 = 0.7;
const ERROR_CAP_WIDTH: u32 = 12;

/// An `#rrggbb` color token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub const FALLBACK: Color = Color(0x80, 0x80, 0x80);

    fn rgb(&self) -> RGBColor {
        RGBColor(self.0, self.1, self.2)
    }
}

impl FromStr for Color {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidColor(s.to_owned());
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Color(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl TryFrom<String> for Color {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
    pub error_low: f64,
    pub error_high: f64,
    pub color: Color,
    /// Text drawn above the bar
    pub annotation: Option<String>,
}

/// Shaded band of `center ± percent%`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseBand {
    pub center: f64,
    pub percent: f64,
}

impl NoiseBand {
    pub fn bounds(&self) -> (f64, f64) {
        let half = self.center.abs() * self.percent / 100.0;
        (self.center - half, self.center + half)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    pub title: String,
    pub y_label: String,
    pub log_scale: bool,
    pub noise_band: Option<NoiseBand>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub options: ChartOptions,
    pub bars: Vec<Bar>,
}

impl Panel {
    fn y_max(&self) -> f64 {
        let top = self
            .bars
            .iter()
            .map(|b| b.value + b.error_high)
            .chain(self.options.noise_band.map(|band| band.bounds().1))
            .fold(0.0_f64, f64::max);
        if top > 0.0 { top } else { 1.0 }
    }

    fn y_min_positive(&self) -> f64 {
        let bottom = self
            .bars
            .iter()
            .flat_map(|b| [b.value - b.error_low, b.value])
            .filter(|v| *v > 0.0)
            .fold(f64::MAX, f64::min);
        if bottom == f64::MAX { 0.1 } else { bottom }
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Renders one bar chart as an SVG
pub fn render_bar_chart(path: &Path, panel: &Panel) -> Result<()> {
    ensure_parent(path)?;
    let root = SVGBackend::new(path, PANEL_SIZE).into_drawing_area();
    root.fill(&FIGURE_BACKGROUND)?;
    draw_panel(&root, panel)?;
    root.present()?;
    debug!("Generated {}", path.display());
    Ok(())
}

/// Renders several panels under a shared title, `columns` panels per row
pub fn render_bar_grid(path: &Path, title: &str, panels: &[Panel], columns: usize) -> Result<()> {
    if panels.is_empty() {
        bail!("No panels to render for {title}");
    }
    ensure_parent(path)?;

    let columns = columns.clamp(1, panels.len());
    let rows = panels.len().div_ceil(columns);
    let size = (
        PANEL_SIZE.0 * columns as u32,
        PANEL_SIZE.1 * rows as u32 + 60,
    );

    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&FIGURE_BACKGROUND)?;
    let root = root.titled(
        title,
        ("sans-serif", TITLE_FONT_SIZE).into_font().color(&WHITE),
    )?;
    for (area, panel) in root.split_evenly((rows, columns)).iter().zip(panels) {
        draw_panel(area, panel)?;
    }
    root.present()?;
    debug!("Generated {}", path.display());
    Ok(())
}

fn draw_panel(area: &DrawingArea<SVGBackend<'_>, Shift>, panel: &Panel) -> Result<()> {
    let n = panel.bars.len().max(1);
    let x_range = -0.5..(n as f64 - 0.5);
    // bar labels are drawn by `draw_x_labels`, ticks stay blank
    let x_formatter = |_: &f64| String::new();

    let mut builder = ChartBuilder::on(area);
    builder
        .caption(
            &panel.options.title,
            ("sans-serif", CAPTION_FONT_SIZE).into_font().color(&WHITE),
        )
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70);

    if panel.options.log_scale {
        let floor = panel.y_min_positive() / 2.0;
        let top = panel.y_max() * 2.0;
        let mut chart = builder.build_cartesian_2d(x_range, (floor..top).log_scale())?;
        chart.plotting_area().fill(&PANEL_BACKGROUND)?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&x_formatter)
            .y_desc(&panel.options.y_label)
            .bold_line_style(GRID)
            .light_line_style(TRANSPARENT)
            .axis_style(WHITE.mix(0.5))
            .label_style(white_text(TICK_LABEL_FONT_SIZE))
            .axis_desc_style(white_text(AXIS_LABEL_FONT_SIZE))
            .draw()?;
        draw_bars(&mut chart, panel, floor, |v| v * 1.08)?;
        draw_x_labels(area, &chart, panel, floor)
    } else {
        let top = panel.y_max() * 1.2;
        let mut chart = builder.build_cartesian_2d(x_range, 0.0..top)?;
        chart.plotting_area().fill(&PANEL_BACKGROUND)?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&x_formatter)
            .y_desc(&panel.options.y_label)
            .bold_line_style(GRID)
            .light_line_style(TRANSPARENT)
            .axis_style(WHITE.mix(0.5))
            .label_style(white_text(TICK_LABEL_FONT_SIZE))
            .axis_desc_style(white_text(AXIS_LABEL_FONT_SIZE))
            .draw()?;
        draw_bars(&mut chart, panel, 0.0, |v| v + top * 0.02)?;
        draw_x_labels(area, &chart, panel, 0.0)
    }
}

fn white_text(size: u32) -> TextStyle<'static> {
    ("sans-serif", size).into_font().color(&WHITE)
}

fn draw_x_labels<Y>(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    chart: &ChartContext<'_, SVGBackend<'_>, Cartesian2d<RangedCoordf64, Y>>,
    panel: &Panel,
    floor: f64,
) -> Result<()>
where
    Y: Ranged<ValueType = f64>,
{
    let (base_x, base_y) = area.get_base_pixel();
    let style = ("sans-serif", TICK_LABEL_FONT_SIZE)
        .into_font()
        .color(&WHITE)
        .pos(Pos::new(HPos::Center, VPos::Top));
    for (idx, bar) in panel.bars.iter().enumerate() {
        let (x, y) = chart.backend_coord(&(idx as f64, floor));
        area.draw(&Text::new(
            bar.label.as_str(),
            (x - base_x, y - base_y + 6),
            style.clone(),
        ))?;
    }
    Ok(())
}

fn draw_bars<Y>(
    chart: &mut ChartContext<'_, SVGBackend<'_>, Cartesian2d<RangedCoordf64, Y>>,
    panel: &Panel,
    floor: f64,
    label_offset: impl Fn(f64) -> f64,
) -> Result<()>
where
    Y: Ranged<ValueType = f64>,
{
    let n = panel.bars.len() as f64;

    if let Some(band) = panel.options.noise_band {
        let (low, high) = band.bounds();
        chart.draw_series(std::iter::once(Rectangle::new(
            [(-0.5, low.max(floor)), (n - 0.5, high.max(floor))],
            WHITE.mix(0.08).filled(),
        )))?;
    }

    for (idx, bar) in panel.bars.iter().enumerate() {
        let x = idx as f64;
        let value = bar.value.max(floor);
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x - BAR_WIDTH / 2.0, floor), (x + BAR_WIDTH / 2.0, value)],
            bar.color.rgb().mix(0.85).filled(),
        )))?;

        let low = (bar.value - bar.error_low).max(floor);
        let high = bar.value + bar.error_high;
        if high > low {
            chart.draw_series(std::iter::once(ErrorBar::new_vertical(
                x,
                low,
                value,
                high,
                WHITE.stroke_width(2),
                ERROR_CAP_WIDTH,
            )))?;
        }

        if let Some(text) = &bar.annotation {
            chart.draw_series(std::iter::once(Text::new(
                text.clone(),
                (x, label_offset(high.max(value))),
                ("sans-serif", DATA_LABEL_FONT_SIZE)
                    .into_font()
                    .color(&WHITE)
                    .pos(Pos::new(HPos::Center, VPos::Bottom)),
            )))?;
        }
    }
    Ok(())
}
