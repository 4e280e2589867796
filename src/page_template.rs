use crate::canvas::Canvas;
use crate::font::BaseFont;
use crate::frame::Frame;
use crate::types::{Pt, Rect, Size, palette};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct DocContext {
    pub page_number: usize,
    pub template_name: String,
}

impl DocContext {
    pub fn new(page_number: usize, template_name: impl Into<String>) -> Self {
        Self {
            page_number,
            template_name: template_name.into(),
        }
    }
}

#[derive(Clone, Copy)]
pub struct FrameSpec {
    pub rect: Rect,
}

pub type OnPageCallback = Arc<dyn Fn(&mut Canvas, &DocContext) + Send + Sync>;

#[derive(Clone)]
pub struct PageTemplate {
    pub name: String,
    pub page_size: Size,
    frames: Vec<FrameSpec>,
    on_page: Option<OnPageCallback>,
}

impl PageTemplate {
    pub fn new(name: impl Into<String>, page_size: Size) -> Self {
        Self {
            name: name.into(),
            page_size,
            frames: Vec::new(),
            on_page: None,
        }
    }

    pub fn with_frame(mut self, rect: Rect) -> Self {
        self.frames.push(FrameSpec { rect });
        self
    }

    pub fn set_on_page<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut Canvas, &DocContext) + Send + Sync + 'static,
    {
        self.on_page = Some(Arc::new(callback));
        self
    }

    pub fn on_page(&self) -> Option<&OnPageCallback> {
        self.on_page.as_ref()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn instantiate_frames(&self) -> Vec<Frame> {
        self.frames
            .iter()
            .map(|spec| Frame::new(spec.rect))
            .collect()
    }
}

/// The page layouts a report is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateKind {
    Cover,
    Introduction,
    PrincipleFirst,
    PrincipleContinuation,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 4] = [
        TemplateKind::Cover,
        TemplateKind::Introduction,
        TemplateKind::PrincipleFirst,
        TemplateKind::PrincipleContinuation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TemplateKind::Cover => "cover",
            TemplateKind::Introduction => "introduction",
            TemplateKind::PrincipleFirst => "principle_first",
            TemplateKind::PrincipleContinuation => "principle_continuation",
        }
    }
}

/// An image placed by page decoration, sized from its pixel aspect ratio.
#[derive(Debug, Clone)]
pub struct DecorImage {
    pub resource_id: String,
    pub width_px: u32,
    pub height_px: u32,
}

impl DecorImage {
    fn height_for(&self, width: Pt) -> Pt {
        if self.width_px == 0 {
            return Pt::ZERO;
        }
        width * (self.height_px as f32 / self.width_px as f32)
    }
}

/// What page callbacks draw around the flowing content.
#[derive(Debug, Clone)]
pub struct PageDecor {
    pub logo: Option<DecorImage>,
    pub background: Option<String>,
    /// Short date printed in the footer of every page after the first.
    pub footer_date: String,
}

const MARGIN_IN: f32 = 0.5;
const RULE_OFFSET_IN: f32 = 0.75;
const COVER_LOGO_WIDTH_IN: f32 = 2.5;
const HEADER_LOGO_SCALE: f32 = 0.49;
const FOOTER_FONT_SIZE: f32 = 9.0;

fn frame_rect(page: Size, x_in: f32, bottom_in: f32, width_in: f32, height_in: f32) -> Rect {
    // Positions are given from the bottom-left corner of the page.
    let height = Pt::from_inches(height_in);
    Rect::new(
        Pt::from_inches(x_in),
        page.height - Pt::from_inches(bottom_in) - height,
        Pt::from_inches(width_in),
        height,
    )
}

fn draw_cover(canvas: &mut Canvas, page: Size, decor: &PageDecor) {
    canvas.save_state();
    if let Some(background) = &decor.background {
        canvas.draw_image(Pt::ZERO, Pt::ZERO, page.width, page.height, background.clone());
    }
    if let Some(logo) = &decor.logo {
        let width = Pt::from_inches(COVER_LOGO_WIDTH_IN);
        let height = logo.height_for(width);
        let margin = Pt::from_inches(MARGIN_IN);
        canvas.draw_image(
            page.width - width - margin,
            page.height - margin - height,
            width,
            height,
            logo.resource_id.clone(),
        );
    }
    canvas.restore_state();
}

fn draw_running_header_footer(canvas: &mut Canvas, page: Size, decor: &PageDecor, ctx: &DocContext) {
    if ctx.page_number <= 1 {
        return;
    }
    let margin = Pt::from_inches(MARGIN_IN);
    let rule = Pt::from_inches(RULE_OFFSET_IN);
    canvas.save_state();

    canvas.set_stroke_color(palette::LIGHT_GRAY);
    canvas.set_line_width(Pt::from_f32(1.0));
    canvas.line(margin, rule, page.width - margin, rule);
    canvas.line(margin, page.height - rule, page.width - margin, page.height - rule);

    let size = Pt::from_f32(FOOTER_FONT_SIZE);
    let line_top = page.height - margin - size;
    canvas.set_fill_color(palette::DARK_GRAY);
    canvas.set_font_name(BaseFont::Helvetica.pdf_name());
    canvas.set_font_size(size);
    let label = format!("Page {}", ctx.page_number);
    let label_width = BaseFont::Helvetica.measure(&label, size);
    canvas.draw_string(page.width - margin - label_width, line_top, label);
    canvas.draw_string(margin, line_top, decor.footer_date.clone());

    if let Some(logo) = &decor.logo {
        let width = Pt::from_inches(COVER_LOGO_WIDTH_IN * HEADER_LOGO_SCALE);
        let height = logo.height_for(width);
        canvas.draw_image(
            page.width - width - margin,
            Pt::from_inches(0.3),
            width,
            height,
            logo.resource_id.clone(),
        );
    }
    canvas.restore_state();
}

/// The four report templates, cover first.
pub fn report_templates(page: Size, decor: PageDecor) -> Vec<PageTemplate> {
    let decor = Arc::new(decor);
    let wide_padding = Pt::from_f32(12.0);
    let column_padding = Pt::from_f32(6.0);
    let left_column = frame_rect(page, 0.5, 1.0, 3.75, 9.0).inset(column_padding);
    let right_column = frame_rect(page, 4.5, 1.0, 3.75, 9.0).inset(column_padding);

    let cover_decor = Arc::clone(&decor);
    let cover = PageTemplate::new(TemplateKind::Cover.name(), page)
        .with_frame(frame_rect(page, 1.25, 1.25, 6.0, 8.5).inset(wide_padding))
        .set_on_page(move |canvas, _ctx| draw_cover(canvas, page, &cover_decor));

    let running = |kind: TemplateKind, frames: &[Rect]| {
        let decor = Arc::clone(&decor);
        let mut template = PageTemplate::new(kind.name(), page).set_on_page(move |canvas, ctx| {
            draw_running_header_footer(canvas, page, &decor, ctx)
        });
        for rect in frames {
            template = template.with_frame(*rect);
        }
        template
    };

    vec![
        cover,
        running(
            TemplateKind::Introduction,
            &[frame_rect(page, 0.75, 1.0, 7.0, 9.0).inset(wide_padding)],
        ),
        running(TemplateKind::PrincipleFirst, &[left_column, right_column]),
        running(TemplateKind::PrincipleContinuation, &[right_column]),
    ]
}
