use crate::error::ReportError;
use crate::font::ChartFont;
use crate::types::{Color, palette};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};

pub const CHART_WIDTH_IN: f32 = 3.0;
pub const CHART_HEIGHT_IN: f32 = 3.5;

const TITLE_WRAP_CHARS: usize = 16;
const TITLE_SHRINK_THRESHOLD: usize = 20;
const TITLE_FONT_PT: f32 = 13.0;
const TITLE_FONT_SMALL_PT: f32 = 10.0;
const COUNT_FONT_PT: f32 = 12.0;
const LEGEND_FONT_PT: f32 = 10.0;
const HOLE_RATIO: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ChartLabel {
    Yes,
    No,
    NotApplicable,
}

impl ChartLabel {
    /// Fixed per label, never by position.
    pub fn color(self) -> Color {
        match self {
            ChartLabel::Yes => palette::CHART_YES,
            ChartLabel::No => palette::CHART_NO,
            ChartLabel::NotApplicable => palette::CHART_NA,
        }
    }

    pub fn legend_text(self) -> &'static str {
        match self {
            ChartLabel::Yes => "Yes",
            ChartLabel::No => "No",
            ChartLabel::NotApplicable => "N/A",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSegment {
    pub label: ChartLabel,
    pub count: u32,
    #[serde(skip)]
    pub color: Color,
    /// Degrees, counter-clockwise from the positive x axis.
    pub start_deg: f32,
    /// Clockwise sweep in degrees.
    pub sweep_deg: f32,
}

/// Everything a chart raster depends on. Rendering is a pure function of the plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPlan {
    pub title: String,
    pub segments: Vec<ChartSegment>,
    pub legend: Vec<ChartLabel>,
    pub title_lines: Vec<String>,
    pub title_font_pt: f32,
}

impl ChartPlan {
    pub fn total(&self) -> u32 {
        self.segments.iter().map(|s| s.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// SHA-256 of the serialized plan.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let digest = Sha256::digest(&bytes);
        let mut out = String::with_capacity(digest.len() * 2);
        for b in digest {
            out.push_str(&format!("{:02x}", b));
        }
        out
    }
}

/// Zero counts are dropped from both the wedges and the legend. Wedges start at
/// 12 o'clock and run clockwise in input order.
pub fn plan_proportion_chart(counts: &[(ChartLabel, u32)], title: &str) -> ChartPlan {
    let total: u32 = counts.iter().map(|(_, c)| *c).sum();
    let mut segments = Vec::new();
    let mut start = 90.0f32;
    if total > 0 {
        for (label, count) in counts.iter().copied() {
            if count == 0 {
                continue;
            }
            let sweep = 360.0 * count as f32 / total as f32;
            segments.push(ChartSegment {
                label,
                count,
                color: label.color(),
                start_deg: start,
                sweep_deg: sweep,
            });
            start -= sweep;
        }
    }
    let legend = segments.iter().map(|s| s.label).collect();
    let visible_len = title.chars().filter(|c| *c != '\n').count();
    ChartPlan {
        title: title.to_string(),
        segments,
        legend,
        title_lines: wrap_title(title, TITLE_WRAP_CHARS),
        title_font_pt: if visible_len > TITLE_SHRINK_THRESHOLD {
            TITLE_FONT_SMALL_PT
        } else {
            TITLE_FONT_PT
        },
    }
}

fn wrap_title(title: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for explicit in title.split('\n') {
        let mut current = String::new();
        for word in explicit.split_whitespace() {
            if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

/// Rasterizes the plan to PNG at `dpi`. Text is skipped when no font is available.
pub fn render_proportion_chart(
    plan: &ChartPlan,
    font: Option<&ChartFont>,
    dpi: u32,
) -> Result<Vec<u8>, ReportError> {
    let px_per_in = dpi as f32;
    let px_per_pt = px_per_in / 72.0;
    let width = (CHART_WIDTH_IN * px_per_in).round() as u32;
    let height = (CHART_HEIGHT_IN * px_per_in).round() as u32;
    let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
        ReportError::InvalidConfiguration(format!("chart raster {}x{} is empty", width, height))
    })?;
    pixmap.fill(tiny_skia::Color::from_rgba8(255, 255, 255, 255));

    let w = width as f32;
    let cx = w / 2.0;
    let cy = w / 2.0;
    let outer = w * 0.45;
    let inner = outer * HOLE_RATIO;

    if plan.is_empty() {
        if let Some(ring) = ring_path(cx, cy, outer, inner, 90.0, 360.0) {
            fill(&mut pixmap, &ring, palette::CHART_EMPTY);
        }
    } else {
        let separator = Stroke {
            width: 2.0 * px_per_pt,
            ..Stroke::default()
        };
        for segment in &plan.segments {
            let Some(path) = ring_path(cx, cy, outer, inner, segment.start_deg, segment.sweep_deg)
            else {
                continue;
            };
            fill(&mut pixmap, &path, segment.color);
            if plan.segments.len() > 1 {
                let paint = paint_for(Color::WHITE);
                pixmap.stroke_path(&path, &paint, &separator, Transform::identity(), None);
            }
        }
    }

    if let Some(font) = font {
        draw_counts(&mut pixmap, plan, font, cx, cy, (outer + inner) / 2.0, px_per_pt);
        draw_title(&mut pixmap, plan, font, cx, cy, px_per_pt);
    }
    draw_legend(&mut pixmap, plan, font, w, height as f32, px_per_pt);

    pixmap
        .encode_png()
        .map_err(|err| ReportError::missing_asset("chart", plan.title.as_str(), err))
}

fn draw_counts(
    pixmap: &mut Pixmap,
    plan: &ChartPlan,
    font: &ChartFont,
    cx: f32,
    cy: f32,
    radius: f32,
    px_per_pt: f32,
) {
    let px = COUNT_FONT_PT * px_per_pt;
    for segment in &plan.segments {
        let mid = (segment.start_deg - segment.sweep_deg / 2.0).to_radians();
        let (x, y) = polar(cx, cy, radius, mid);
        let text = segment.count.to_string();
        let text_w = font.measure(&text, px);
        if let Some(path) = font.text_path(&text, x - text_w / 2.0, y + px * 0.35, px) {
            fill(pixmap, &path, Color::WHITE);
        }
    }
}

fn draw_title(
    pixmap: &mut Pixmap,
    plan: &ChartPlan,
    font: &ChartFont,
    cx: f32,
    cy: f32,
    px_per_pt: f32,
) {
    let px = plan.title_font_pt * px_per_pt;
    let line_h = px * 1.2;
    let block_h = line_h * plan.title_lines.len() as f32;
    let mut baseline = cy - block_h / 2.0 + px;
    for line in &plan.title_lines {
        let line_w = font.measure(line, px);
        if let Some(path) = font.text_path(line, cx - line_w / 2.0, baseline, px) {
            fill(pixmap, &path, palette::DARK_GRAY);
        }
        baseline += line_h;
    }
}

fn draw_legend(
    pixmap: &mut Pixmap,
    plan: &ChartPlan,
    font: Option<&ChartFont>,
    width: f32,
    height: f32,
    px_per_pt: f32,
) {
    if plan.legend.is_empty() {
        return;
    }
    let px = LEGEND_FONT_PT * px_per_pt;
    let swatch = px;
    let gap = px * 0.4;
    let spacing = px * 1.2;
    let entries: Vec<(ChartLabel, f32)> = plan
        .legend
        .iter()
        .map(|label| {
            let text_w = font.map(|f| f.measure(label.legend_text(), px)).unwrap_or(0.0);
            (*label, swatch + gap + text_w)
        })
        .collect();
    let total_w: f32 = entries.iter().map(|(_, w)| *w).sum::<f32>()
        + spacing * (entries.len().saturating_sub(1)) as f32;
    let band_top = width;
    let center_y = band_top + (height - band_top) / 2.0;
    let mut x = (width - total_w) / 2.0;
    for (label, entry_w) in entries {
        if let Some(rect) = tiny_skia::Rect::from_xywh(x, center_y - swatch / 2.0, swatch, swatch) {
            let paint = paint_for(label.color());
            pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        }
        if let Some(font) = font {
            let text_x = x + swatch + gap;
            if let Some(path) =
                font.text_path(label.legend_text(), text_x, center_y + px * 0.35, px)
            {
                fill(pixmap, &path, palette::DARK_GRAY);
            }
        }
        x += entry_w + spacing;
    }
}

fn polar(cx: f32, cy: f32, radius: f32, angle_rad: f32) -> (f32, f32) {
    (
        cx + radius * libm::cosf(angle_rad),
        cy - radius * libm::sinf(angle_rad),
    )
}

/// Annular wedge approximated with a point per degree.
fn ring_path(
    cx: f32,
    cy: f32,
    outer: f32,
    inner: f32,
    start_deg: f32,
    sweep_deg: f32,
) -> Option<tiny_skia::Path> {
    if sweep_deg <= 0.0 {
        return None;
    }
    let steps = (sweep_deg.ceil() as usize).max(2);
    let mut pb = PathBuilder::new();
    for i in 0..=steps {
        let deg = start_deg - sweep_deg * i as f32 / steps as f32;
        let (x, y) = polar(cx, cy, outer, deg.to_radians());
        if i == 0 {
            pb.move_to(x, y);
        } else {
            pb.line_to(x, y);
        }
    }
    for i in (0..=steps).rev() {
        let deg = start_deg - sweep_deg * i as f32 / steps as f32;
        let (x, y) = polar(cx, cy, inner, deg.to_radians());
        pb.line_to(x, y);
    }
    pb.close();
    pb.finish()
}

fn paint_for(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(to_sk_color(color));
    paint.anti_alias = true;
    paint
}

fn fill(pixmap: &mut Pixmap, path: &tiny_skia::Path, color: Color) {
    let paint = paint_for(color);
    pixmap.fill_path(path, &paint, FillRule::Winding, Transform::identity(), None);
}

fn to_sk_color(color: Color) -> tiny_skia::Color {
    let [r, g, b, a] = color.to_rgba8();
    tiny_skia::Color::from_rgba8(r, g, b, a)
}
