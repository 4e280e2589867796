use crate::types::{Color, Pt, Rect, Size};

pub const META_PAGE_TEMPLATE_KEY: &str = "__govreport_page_template";
const META_BBOX_KEY: &str = "__govreport_bbox";

/// Page-space drawing commands. Coordinates are top-left origin, y down; the PDF
/// writer flips them.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SaveState,
    RestoreState,
    // Non-rendered metadata used for page-aware reporting. Ignored by the PDF writer.
    Meta {
        key: String,
        value: String,
    },
    SetFillColor(Color),
    SetStrokeColor(Color),
    SetLineWidth(Pt),
    SetFontName(String),
    SetFontSize(Pt),
    MoveTo {
        x: Pt,
        y: Pt,
    },
    LineTo {
        x: Pt,
        y: Pt,
    },
    ClosePath,
    Fill,
    Stroke,
    /// `y` is the top of the text line; the writer places the baseline one font size below.
    DrawString {
        x: Pt,
        y: Pt,
        text: String,
    },
    DrawRect {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
    },
    DrawImage {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
        resource_id: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    pub commands: Vec<Command>,
}

impl Page {
    pub fn meta_value(&self, key: &str) -> Option<&str> {
        self.commands.iter().find_map(|cmd| match cmd {
            Command::Meta { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Every string drawn on the page, in drawing order.
    pub fn text_runs(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|cmd| match cmd {
            Command::DrawString { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    pub page_size: Size,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn page_template_names(&self) -> Vec<String> {
        self.pages
            .iter()
            .map(|page| {
                page.meta_value(META_PAGE_TEMPLATE_KEY)
                    .unwrap_or_default()
                    .to_string()
            })
            .collect()
    }

    /// Resource ids of every image drawn, first use first.
    pub fn image_resources(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for page in &self.pages {
            for cmd in &page.commands {
                if let Command::DrawImage { resource_id, .. } = cmd {
                    if !out.contains(resource_id) {
                        out.push(resource_id.clone());
                    }
                }
            }
        }
        out
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    fill_color: Color,
    stroke_color: Color,
    line_width: Pt,
    font_size: Pt,
    font_name: String,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            fill_color: Color::BLACK,
            stroke_color: Color::BLACK,
            line_width: Pt::from_f32(1.0),
            font_size: Pt::from_f32(12.0),
            font_name: "Helvetica".to_string(),
        }
    }
}

pub struct Canvas {
    page_size: Size,
    pages: Vec<Page>,
    current: Page,
    state_stack: Vec<GraphicsState>,
    current_state: GraphicsState,
}

impl Canvas {
    pub fn new(page_size: Size) -> Self {
        Self {
            page_size,
            pages: Vec::new(),
            current: Page::default(),
            state_stack: Vec::new(),
            current_state: GraphicsState::default(),
        }
    }

    pub fn page_size(&self) -> Size {
        self.page_size
    }

    pub fn save_state(&mut self) {
        self.state_stack.push(self.current_state.clone());
        self.current.commands.push(Command::SaveState);
    }

    pub fn restore_state(&mut self) {
        if let Some(state) = self.state_stack.pop() {
            self.current_state = state;
            self.current.commands.push(Command::RestoreState);
        }
    }

    pub fn record_flowable_bounds(&mut self, rect: Rect) {
        let value = format!(
            "{},{},{},{}",
            rect.x.to_milli_i64(),
            rect.y.to_milli_i64(),
            rect.width.to_milli_i64(),
            rect.height.to_milli_i64()
        );
        self.current.commands.push(Command::Meta {
            key: META_BBOX_KEY.to_string(),
            value,
        });
    }

    pub fn meta(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.current.commands.push(Command::Meta {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn set_fill_color(&mut self, color: Color) {
        if self.current_state.fill_color == color {
            return;
        }
        self.current_state.fill_color = color;
        self.current.commands.push(Command::SetFillColor(color));
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        if self.current_state.stroke_color == color {
            return;
        }
        self.current_state.stroke_color = color;
        self.current.commands.push(Command::SetStrokeColor(color));
    }

    pub fn set_line_width(&mut self, width: Pt) {
        let width = if width < Pt::ZERO { Pt::ZERO } else { width };
        if self.current_state.line_width == width {
            return;
        }
        self.current_state.line_width = width;
        self.current.commands.push(Command::SetLineWidth(width));
    }

    pub fn set_font_name(&mut self, name: &str) {
        if self.current_state.font_name == name {
            return;
        }
        self.current_state.font_name = name.to_string();
        self.current
            .commands
            .push(Command::SetFontName(self.current_state.font_name.clone()));
    }

    pub fn set_font_size(&mut self, size: Pt) {
        if self.current_state.font_size == size {
            return;
        }
        self.current_state.font_size = size;
        self.current.commands.push(Command::SetFontSize(size));
    }

    pub fn move_to(&mut self, x: Pt, y: Pt) {
        self.current.commands.push(Command::MoveTo { x, y });
    }

    pub fn line_to(&mut self, x: Pt, y: Pt) {
        self.current.commands.push(Command::LineTo { x, y });
    }

    pub fn close_path(&mut self) {
        self.current.commands.push(Command::ClosePath);
    }

    pub fn fill(&mut self) {
        self.current.commands.push(Command::Fill);
    }

    pub fn stroke(&mut self) {
        self.current.commands.push(Command::Stroke);
    }

    pub fn line(&mut self, x1: Pt, y1: Pt, x2: Pt, y2: Pt) {
        self.move_to(x1, y1);
        self.line_to(x2, y2);
        self.stroke();
    }

    pub fn stroke_rect(&mut self, x: Pt, y: Pt, width: Pt, height: Pt) {
        self.move_to(x, y);
        self.line_to(x + width, y);
        self.line_to(x + width, y + height);
        self.line_to(x, y + height);
        self.close_path();
        self.stroke();
    }

    pub fn draw_string(&mut self, x: Pt, y: Pt, text: impl Into<String>) {
        self.current.commands.push(Command::DrawString {
            x,
            y,
            text: text.into(),
        });
    }

    pub fn draw_rect(&mut self, x: Pt, y: Pt, width: Pt, height: Pt) {
        self.current.commands.push(Command::DrawRect {
            x,
            y,
            width,
            height,
        });
    }

    pub fn draw_image(
        &mut self,
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
        resource_id: impl Into<String>,
    ) {
        self.current.commands.push(Command::DrawImage {
            x,
            y,
            width,
            height,
            resource_id: resource_id.into(),
        });
    }

    pub fn show_page(&mut self) {
        let current = std::mem::take(&mut self.current);
        self.pages.push(current);
        self.state_stack.clear();
        self.current_state = GraphicsState::default();
    }

    /// Drops everything drawn on the page in progress without emitting it.
    pub fn reset_current(&mut self) {
        self.current.commands.clear();
        self.state_stack.clear();
        self.current_state = GraphicsState::default();
    }

    pub fn current_command_count(&self) -> usize {
        self.current.commands.len()
    }

    pub fn is_current_empty(&self) -> bool {
        self.current.commands.is_empty()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn finish(mut self) -> Document {
        if !self.current.commands.is_empty() || self.pages.is_empty() {
            self.show_page();
        }
        Document {
            page_size: self.page_size,
            pages: self.pages,
        }
    }

    pub fn finish_without_show(self) -> Document {
        Document {
            page_size: self.page_size,
            pages: self.pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graphics_state_changes_are_deduplicated() {
        let mut canvas = Canvas::new(Size::letter());
        canvas.set_fill_color(Color::WHITE);
        canvas.set_fill_color(Color::WHITE);
        canvas.set_font_name("Helvetica");
        canvas.set_font_size(Pt::from_f32(9.0));
        canvas.set_font_size(Pt::from_f32(9.0));
        assert_eq!(canvas.current_command_count(), 2);
    }

    #[test]
    fn restore_reinstates_previous_state() {
        let mut canvas = Canvas::new(Size::letter());
        canvas.save_state();
        canvas.set_fill_color(Color::WHITE);
        canvas.restore_state();
        canvas.set_fill_color(Color::BLACK);
        assert_eq!(canvas.current_command_count(), 3);
    }

    #[test]
    fn pages_carry_template_names_and_text() {
        let mut canvas = Canvas::new(Size::letter());
        canvas.meta(META_PAGE_TEMPLATE_KEY, "cover");
        canvas.draw_string(Pt::ZERO, Pt::ZERO, "hello");
        canvas.show_page();
        canvas.meta(META_PAGE_TEMPLATE_KEY, "introduction");
        canvas.draw_image(Pt::ZERO, Pt::ZERO, Pt::from_i32(1), Pt::from_i32(1), "logo");
        let doc = canvas.finish();
        assert_eq!(doc.page_template_names(), vec!["cover", "introduction"]);
        assert_eq!(doc.pages[0].text_runs().collect::<Vec<_>>(), vec!["hello"]);
        assert_eq!(doc.image_resources(), vec!["logo".to_string()]);
    }

    #[test]
    fn reset_discards_the_page_in_progress() {
        let mut canvas = Canvas::new(Size::letter());
        canvas.set_fill_color(Color::WHITE);
        canvas.draw_rect(Pt::ZERO, Pt::ZERO, Pt::from_i32(5), Pt::from_i32(5));
        canvas.reset_current();
        assert!(canvas.is_current_empty());
        canvas.set_fill_color(Color::WHITE);
        assert_eq!(canvas.current_command_count(), 1);
        assert_eq!(canvas.finish().pages.len(), 1);
    }
}
