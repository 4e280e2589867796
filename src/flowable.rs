use crate::canvas::Canvas;
use crate::font::BaseFont;
use crate::types::{Color, Pt, Rect, Size};

fn huge_pt() -> Pt {
    Pt::from_f32(1_000_000.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakInside {
    Auto,
    /// Move the block whole to the next frame when it does not fit but would fit an empty one.
    Avoid,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pagination {
    pub break_inside: BreakInside,
    pub orphans: usize,
    pub widows: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            break_inside: BreakInside::Auto,
            orphans: 2,
            widows: 2,
        }
    }
}

impl Pagination {
    pub fn avoid() -> Self {
        Self {
            break_inside: BreakInside::Avoid,
            ..Self::default()
        }
    }

    fn resolved_orphans(self) -> usize {
        self.orphans.max(1)
    }

    fn resolved_widows(self) -> usize {
        self.widows.max(1)
    }
}

pub trait Flowable: FlowableClone + Send + Sync {
    fn wrap(&self, avail_width: Pt, avail_height: Pt) -> Size;
    fn split(
        &self,
        avail_width: Pt,
        avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)>;
    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, avail_height: Pt);

    fn pagination(&self) -> Pagination {
        Pagination::default()
    }

    fn debug_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

pub trait FlowableClone {
    fn clone_box(&self) -> Box<dyn Flowable>;
}

impl<T> FlowableClone for T
where
    T: 'static + Flowable + Clone,
{
    fn clone_box(&self) -> Box<dyn Flowable> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Flowable> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

fn stack_height(items: &[Box<dyn Flowable>], avail_width: Pt) -> Pt {
    items
        .iter()
        .map(|item| item.wrap(avail_width, huge_pt()).height)
        .sum()
}

/// Splits a vertical stack at `avail_height`. The tail is empty when everything fits.
fn split_stack(
    items: &[Box<dyn Flowable>],
    avail_width: Pt,
    avail_height: Pt,
) -> (Vec<Box<dyn Flowable>>, Vec<Box<dyn Flowable>>) {
    let mut used = Pt::ZERO;
    let mut head: Vec<Box<dyn Flowable>> = Vec::new();
    let mut tail: Vec<Box<dyn Flowable>> = Vec::new();
    let mut iter = items.iter();
    for item in iter.by_ref() {
        let remaining = avail_height - used;
        let height = item.wrap(avail_width, remaining).height;
        if height <= remaining {
            head.push(item.clone());
            used += height;
            continue;
        }
        match item.split(avail_width, remaining) {
            Some((first, second)) => {
                head.push(first);
                tail.push(second);
            }
            None => tail.push(item.clone()),
        }
        break;
    }
    tail.extend(iter.cloned());
    (head, tail)
}

fn draw_stack(items: &[Box<dyn Flowable>], canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt) {
    let mut cursor_y = y;
    for item in items {
        let size = item.wrap(avail_width, huge_pt());
        item.draw(canvas, x, cursor_y, avail_width, size.height);
        cursor_y += size.height;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    Top,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font: BaseFont,
    pub font_size: Pt,
    pub leading: Pt,
    pub color: Color,
    pub space_after: Pt,
}

impl Default for TextStyle {
    fn default() -> Self {
        let font_size = Pt::from_f32(12.0);
        Self {
            font: BaseFont::Helvetica,
            font_size,
            leading: font_size.mul_ratio(6, 5),
            color: Color::BLACK,
            space_after: Pt::ZERO,
        }
    }
}

impl TextStyle {
    pub fn new(font: BaseFont, size: f32, leading: f32, color: Color) -> Self {
        Self {
            font,
            font_size: Pt::from_f32(size),
            leading: Pt::from_f32(leading),
            color,
            space_after: Pt::ZERO,
        }
    }

    pub fn with_space_after(mut self, space_after: f32) -> Self {
        self.space_after = Pt::from_f32(space_after);
        self
    }

    pub fn with_font(mut self, font: BaseFont) -> Self {
        self.font = font;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }
}

/// A piece of paragraph text. Unset font or color fall back to the paragraph style.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub text: String,
    pub font: Option<BaseFont>,
    pub color: Option<Color>,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font: None,
            color: None,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font: Some(BaseFont::HelveticaBold),
            color: None,
        }
    }

    pub fn colored(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word {
        text: String,
        font: BaseFont,
        color: Color,
        space_before: bool,
    },
    Break,
}

#[derive(Debug, Clone)]
struct PlacedWord {
    text: String,
    font: BaseFont,
    color: Color,
    x: Pt,
    space_before: bool,
}

#[derive(Debug, Clone, Default)]
struct Line {
    words: Vec<PlacedWord>,
    width: Pt,
}

fn tokenize(runs: &[Run], style: &TextStyle) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pending_space = false;
    for run in runs {
        let font = run.font.unwrap_or(style.font);
        let color = run.color.unwrap_or(style.color);
        for (idx, segment) in run.text.split('\n').enumerate() {
            if idx > 0 {
                tokens.push(Token::Break);
                pending_space = false;
            }
            let mut rest = segment;
            loop {
                let trimmed = rest.trim_start();
                if trimmed.len() != rest.len() {
                    pending_space = true;
                }
                if trimmed.is_empty() {
                    break;
                }
                let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
                tokens.push(Token::Word {
                    text: trimmed[..end].to_string(),
                    font,
                    color,
                    space_before: pending_space,
                });
                pending_space = false;
                rest = &trimmed[end..];
            }
        }
    }
    tokens
}

/// Wrapped text. Splits between lines, honouring orphans and widows.
#[derive(Debug, Clone)]
pub struct Paragraph {
    tokens: Vec<Token>,
    style: TextStyle,
    align: TextAlign,
    pagination: Pagination,
}

impl Paragraph {
    pub fn new(text: impl Into<String>, style: TextStyle) -> Self {
        Self::rich(vec![Run::plain(text)], style)
    }

    pub fn rich(runs: Vec<Run>, style: TextStyle) -> Self {
        Self {
            tokens: tokenize(&runs, &style),
            style,
            align: TextAlign::Left,
            pagination: Pagination::default(),
        }
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    /// Plain text with words re-joined by single spaces and breaks as newlines.
    pub fn text(&self) -> String {
        let mut out = String::new();
        let mut line_start = true;
        for token in &self.tokens {
            match token {
                Token::Break => {
                    out.push('\n');
                    line_start = true;
                }
                Token::Word {
                    text, space_before, ..
                } => {
                    if !line_start && *space_before {
                        out.push(' ');
                    }
                    out.push_str(text);
                    line_start = false;
                }
            }
        }
        out
    }

    fn with_tokens(&self, tokens: Vec<Token>, space_after: Pt) -> Paragraph {
        Paragraph {
            tokens,
            style: TextStyle {
                space_after,
                ..self.style
            },
            align: self.align,
            pagination: self.pagination,
        }
    }

    fn layout_lines(&self, avail_width: Pt) -> Vec<Line> {
        let size = self.style.font_size;
        let mut lines = Vec::new();
        let mut current = Line::default();
        for token in &self.tokens {
            let (text, font, color, space_before) = match token {
                Token::Break => {
                    lines.push(std::mem::take(&mut current));
                    continue;
                }
                Token::Word {
                    text,
                    font,
                    color,
                    space_before,
                } => (text, *font, *color, *space_before),
            };
            let word_width = font.measure(text, size);
            let mut space = if !current.words.is_empty() && space_before {
                font.measure(" ", size)
            } else {
                Pt::ZERO
            };
            if !current.words.is_empty() && current.width + space + word_width > avail_width {
                lines.push(std::mem::take(&mut current));
                space = Pt::ZERO;
            }
            if current.words.is_empty() && word_width > avail_width {
                let mut pieces = split_long_word_by_width(font, size, text, avail_width);
                let last = pieces.pop().unwrap_or_default();
                for piece in pieces {
                    let width = font.measure(&piece, size);
                    lines.push(Line {
                        words: vec![PlacedWord {
                            text: piece,
                            font,
                            color,
                            x: Pt::ZERO,
                            space_before: false,
                        }],
                        width,
                    });
                }
                let width = font.measure(&last, size);
                current.words.push(PlacedWord {
                    text: last,
                    font,
                    color,
                    x: Pt::ZERO,
                    space_before: false,
                });
                current.width = width;
                continue;
            }
            current.words.push(PlacedWord {
                text: text.clone(),
                font,
                color,
                x: current.width + space,
                space_before: space > Pt::ZERO,
            });
            current.width = current.width + space + word_width;
        }
        if !current.words.is_empty() {
            lines.push(current);
        }
        lines
    }

    fn tokens_from_lines(lines: &[Line]) -> Vec<Token> {
        let mut tokens = Vec::new();
        for (idx, line) in lines.iter().enumerate() {
            if idx > 0 {
                tokens.push(Token::Break);
            }
            for word in &line.words {
                tokens.push(Token::Word {
                    text: word.text.clone(),
                    font: word.font,
                    color: word.color,
                    space_before: word.space_before,
                });
            }
        }
        tokens
    }
}

fn split_long_word_by_width(font: BaseFont, size: Pt, word: &str, max_width: Pt) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_width = Pt::ZERO;
    for ch in word.chars() {
        let w = Pt::from_milli_i64(size.to_milli_i64() * i64::from(font.char_width(ch)) / 1000);
        let mut next_width = current_width + w;
        if !current.is_empty() && next_width > max_width {
            parts.push(std::mem::take(&mut current));
            next_width = w;
        }
        current.push(ch);
        current_width = next_width;
    }
    if !current.is_empty() {
        parts.push(current);
    }
    if parts.is_empty() {
        parts.push(String::new());
    }
    parts
}

impl Flowable for Paragraph {
    fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
        let lines = self.layout_lines(avail_width);
        let height = self.style.leading * (lines.len() as i32) + self.style.space_after;
        let width = lines
            .iter()
            .fold(Pt::ZERO, |acc, line| acc.max(line.width))
            .min(avail_width);
        Size { width, height }
    }

    fn split(
        &self,
        avail_width: Pt,
        avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        let lines = self.layout_lines(avail_width);
        let lh = self.style.leading.to_milli_i64();
        let ah = avail_height.to_milli_i64();
        if lh <= 0 || ah <= 0 {
            return None;
        }
        let max_lines = (ah / lh) as usize;
        let total_lines = lines.len();
        if max_lines == 0 || max_lines >= total_lines {
            return None;
        }

        let orphans = self.pagination.resolved_orphans();
        let widows = self.pagination.resolved_widows();
        let mut split_at = max_lines;
        if total_lines - split_at < widows {
            split_at = total_lines.saturating_sub(widows);
        }
        if split_at < orphans {
            return None;
        }

        let first = self.with_tokens(Self::tokens_from_lines(&lines[..split_at]), Pt::ZERO);
        let second = self.with_tokens(
            Self::tokens_from_lines(&lines[split_at..]),
            self.style.space_after,
        );
        Some((Box::new(first), Box::new(second)))
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, _avail_height: Pt) {
        let lines = self.layout_lines(avail_width);
        canvas.set_font_size(self.style.font_size);
        let top_gap = (self.style.leading - self.style.font_size)
            .max(Pt::ZERO)
            .mul_ratio(1, 2);

        let mut cursor_y = y;
        for line in &lines {
            let offset = match self.align {
                TextAlign::Left => Pt::ZERO,
                TextAlign::Center => (avail_width - line.width).max(Pt::ZERO).mul_ratio(1, 2),
                TextAlign::Right => (avail_width - line.width).max(Pt::ZERO),
            };
            // Consecutive words sharing font and color become one string.
            let mut segment: Option<(BaseFont, Color, Pt, String)> = None;
            for word in &line.words {
                match segment.as_mut() {
                    Some((font, color, _, text)) if *font == word.font && *color == word.color => {
                        if word.space_before {
                            text.push(' ');
                        }
                        text.push_str(&word.text);
                    }
                    _ => {
                        if let Some(done) = segment.take() {
                            emit_segment(canvas, done, x + offset, cursor_y + top_gap);
                        }
                        segment = Some((word.font, word.color, word.x, word.text.clone()));
                    }
                }
            }
            if let Some(done) = segment.take() {
                emit_segment(canvas, done, x + offset, cursor_y + top_gap);
            }
            cursor_y += self.style.leading;
        }
    }

    fn pagination(&self) -> Pagination {
        self.pagination
    }
}

fn emit_segment(canvas: &mut Canvas, segment: (BaseFont, Color, Pt, String), x: Pt, y: Pt) {
    let (font, color, dx, text) = segment;
    canvas.set_fill_color(color);
    canvas.set_font_name(font.pdf_name());
    canvas.draw_string(x + dx, y, text);
}

/// Bullet label beside a body; the body may split, the label stays with the first part.
#[derive(Clone)]
pub struct BulletItem {
    label: Option<Paragraph>,
    body: Box<dyn Flowable>,
    indent: Pt,
    pagination: Pagination,
}

impl BulletItem {
    pub fn new(label: Paragraph, body: Box<dyn Flowable>, indent: Pt) -> Self {
        Self {
            label: Some(label),
            body,
            indent,
            pagination: Pagination::default(),
        }
    }

    fn body_width(&self, avail_width: Pt) -> Pt {
        (avail_width - self.indent).max(Pt::from_f32(1.0))
    }
}

impl Flowable for BulletItem {
    fn wrap(&self, avail_width: Pt, avail_height: Pt) -> Size {
        let label_height = self
            .label
            .as_ref()
            .map(|label| label.wrap(self.indent, huge_pt()).height)
            .unwrap_or(Pt::ZERO);
        let body_size = self.body.wrap(self.body_width(avail_width), avail_height);
        Size {
            width: avail_width,
            height: label_height.max(body_size.height),
        }
    }

    fn split(
        &self,
        avail_width: Pt,
        avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        let (first, second) = self.body.split(self.body_width(avail_width), avail_height)?;
        let head = BulletItem {
            label: self.label.clone(),
            body: first,
            indent: self.indent,
            pagination: self.pagination,
        };
        let tail = BulletItem {
            label: None,
            body: second,
            indent: self.indent,
            pagination: self.pagination,
        };
        Some((Box::new(head), Box::new(tail)))
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, avail_height: Pt) {
        if let Some(label) = &self.label {
            label.draw(canvas, x, y, self.indent, avail_height);
        }
        self.body.draw(
            canvas,
            x + self.indent,
            y,
            self.body_width(avail_width),
            avail_height,
        );
    }

    fn pagination(&self) -> Pagination {
        self.pagination
    }
}

#[derive(Debug, Clone)]
pub struct Spacer {
    height: Pt,
}

impl Spacer {
    pub fn new(height: f32) -> Self {
        Self::new_pt(Pt::from_f32(height))
    }

    pub fn new_pt(height: Pt) -> Self {
        Self { height }
    }
}

impl Flowable for Spacer {
    // Truncated at the frame bottom instead of pushing content onward.
    fn wrap(&self, avail_width: Pt, avail_height: Pt) -> Size {
        Size {
            width: avail_width,
            height: self.height.min(avail_height).max(Pt::ZERO),
        }
    }

    fn split(
        &self,
        _avail_width: Pt,
        _avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        None
    }

    fn draw(&self, _canvas: &mut Canvas, _x: Pt, _y: Pt, _avail_width: Pt, _avail_height: Pt) {}
}

#[derive(Debug, Clone)]
pub struct ImageFlowable {
    pub width: Pt,
    pub height: Pt,
    pub resource_id: String,
    align: TextAlign,
}

impl ImageFlowable {
    pub fn new_pt(width: Pt, height: Pt, resource_id: impl Into<String>) -> Self {
        Self {
            width,
            height,
            resource_id: resource_id.into(),
            align: TextAlign::Center,
        }
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }
}

impl Flowable for ImageFlowable {
    fn wrap(&self, _avail_width: Pt, _avail_height: Pt) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }

    fn split(
        &self,
        _avail_width: Pt,
        _avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        None
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, _avail_height: Pt) {
        let slack = (avail_width - self.width).max(Pt::ZERO);
        let offset = match self.align {
            TextAlign::Left => Pt::ZERO,
            TextAlign::Center => slack.mul_ratio(1, 2),
            TextAlign::Right => slack,
        };
        canvas.draw_image(x + offset, y, self.width, self.height, self.resource_id.clone());
    }
}

/// Blocks stacked vertically and moved as a unit when they fit an empty frame.
#[derive(Clone)]
pub struct KeepTogether {
    items: Vec<Box<dyn Flowable>>,
    pagination: Pagination,
}

impl KeepTogether {
    pub fn new(items: Vec<Box<dyn Flowable>>) -> Self {
        Self {
            items,
            pagination: Pagination::avoid(),
        }
    }
}

impl Flowable for KeepTogether {
    fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
        Size {
            width: avail_width,
            height: stack_height(&self.items, avail_width),
        }
    }

    fn split(
        &self,
        avail_width: Pt,
        avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        let (head, tail) = split_stack(&self.items, avail_width, avail_height);
        if head.is_empty() || tail.is_empty() {
            return None;
        }
        let first = KeepTogether {
            items: head,
            pagination: Pagination::default(),
        };
        let second = KeepTogether {
            items: tail,
            pagination: self.pagination,
        };
        Some((Box::new(first), Box::new(second)))
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, _avail_height: Pt) {
        draw_stack(&self.items, canvas, x, y, avail_width);
    }

    fn pagination(&self) -> Pagination {
        self.pagination
    }
}

#[derive(Clone)]
pub struct Column {
    pub width: Pt,
    pub valign: VerticalAlign,
    pub content: Vec<Box<dyn Flowable>>,
}

/// Fixed-width columns side by side, centred in the available width. Never splits.
#[derive(Clone)]
pub struct Columns {
    columns: Vec<Column>,
    padding: Pt,
}

impl Columns {
    pub fn new(columns: Vec<Column>, padding: Pt) -> Self {
        Self { columns, padding }
    }

    fn inner_width(&self, column: &Column) -> Pt {
        (column.width - self.padding * 2).max(Pt::from_f32(1.0))
    }

    fn total_width(&self) -> Pt {
        self.columns.iter().map(|c| c.width).sum()
    }
}

impl Flowable for Columns {
    fn wrap(&self, _avail_width: Pt, _avail_height: Pt) -> Size {
        let height = self
            .columns
            .iter()
            .map(|column| stack_height(&column.content, self.inner_width(column)))
            .fold(Pt::ZERO, Pt::max);
        Size {
            width: self.total_width(),
            height: height + self.padding * 2,
        }
    }

    fn split(
        &self,
        _avail_width: Pt,
        _avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        None
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, _avail_height: Pt) {
        let row_height = self.wrap(avail_width, huge_pt()).height - self.padding * 2;
        let mut cursor_x = x + (avail_width - self.total_width()).max(Pt::ZERO).mul_ratio(1, 2);
        for column in &self.columns {
            let inner = self.inner_width(column);
            let height = stack_height(&column.content, inner);
            let offset = match column.valign {
                VerticalAlign::Top => Pt::ZERO,
                VerticalAlign::Middle => (row_height - height).max(Pt::ZERO).mul_ratio(1, 2),
            };
            draw_stack(
                &column.content,
                canvas,
                cursor_x + self.padding,
                y + self.padding + offset,
                inner,
            );
            cursor_x += column.width;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnWidth {
    Fixed(Pt),
    /// Share of the available width.
    Fraction(f32),
}

#[derive(Clone)]
pub struct TableCell {
    content: Vec<Box<dyn Flowable>>,
    col_span: usize,
    background: Option<Color>,
    border: Option<(Pt, Color)>,
}

impl TableCell {
    pub fn new(content: Vec<Box<dyn Flowable>>) -> Self {
        Self {
            content,
            col_span: 1,
            background: None,
            border: None,
        }
    }

    pub fn paragraph(paragraph: Paragraph) -> Self {
        Self::new(vec![Box::new(paragraph)])
    }

    pub fn with_span(mut self, col_span: usize) -> Self {
        self.col_span = col_span.max(1);
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    pub fn with_border(mut self, width: f32, color: Color) -> Self {
        self.border = Some((Pt::from_f32(width), color));
        self
    }
    fn with_content(&self, content: Vec<Box<dyn Flowable>>) -> TableCell {
        TableCell {
            content,
            col_span: self.col_span,
            background: self.background,
            border: self.border,
        }
    }
}

#[derive(Clone)]
pub struct TableRow {
    cells: Vec<TableCell>,
    background: Option<Color>,
    min_height: Pt,
    padding_bottom: Option<Pt>,
}

impl TableRow {
    pub fn new(cells: Vec<TableCell>) -> Self {
        Self {
            cells,
            background: None,
            min_height: Pt::ZERO,
            padding_bottom: None,
        }
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    pub fn with_min_height(mut self, height: f32) -> Self {
        self.min_height = Pt::from_f32(height);
        self
    }

    pub fn with_padding_bottom(mut self, padding: f32) -> Self {
        self.padding_bottom = Some(Pt::from_f32(padding));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellPadding {
    pub left: Pt,
    pub right: Pt,
    pub top: Pt,
    pub bottom: Pt,
}

impl CellPadding {
    pub fn new(horizontal: f32, vertical: f32) -> Self {
        Self {
            left: Pt::from_f32(horizontal),
            right: Pt::from_f32(horizontal),
            top: Pt::from_f32(vertical),
            bottom: Pt::from_f32(vertical),
        }
    }
}

/// Grid of cells. Splits between rows, repeating the first `repeat_rows` rows.
#[derive(Clone)]
pub struct Table {
    col_widths: Vec<ColumnWidth>,
    rows: Vec<TableRow>,
    grid: Option<(Pt, Color)>,
    outer_border: Option<(Pt, Color)>,
    padding: CellPadding,
    valign: VerticalAlign,
    align: TextAlign,
    repeat_rows: usize,
    pagination: Pagination,
}

impl Table {
    pub fn new(col_widths: Vec<ColumnWidth>, rows: Vec<TableRow>) -> Self {
        Self {
            col_widths,
            rows,
            grid: None,
            outer_border: None,
            padding: CellPadding::new(6.0, 3.0),
            valign: VerticalAlign::Top,
            align: TextAlign::Left,
            repeat_rows: 0,
            pagination: Pagination::default(),
        }
    }

    pub fn with_grid(mut self, width: f32, color: Color) -> Self {
        self.grid = Some((Pt::from_f32(width), color));
        self
    }

    pub fn with_outer_border(mut self, width: f32, color: Color) -> Self {
        self.outer_border = Some((Pt::from_f32(width), color));
        self
    }

    pub fn with_padding(mut self, padding: CellPadding) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_valign(mut self, valign: VerticalAlign) -> Self {
        self.valign = valign;
        self
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn with_repeat_rows(mut self, rows: usize) -> Self {
        self.repeat_rows = rows;
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    fn resolve_widths(&self, avail_width: Pt) -> Vec<Pt> {
        self.col_widths
            .iter()
            .map(|w| match w {
                ColumnWidth::Fixed(pt) => *pt,
                ColumnWidth::Fraction(share) => avail_width * *share,
            })
            .collect()
    }

    /// (x offset, width) of each cell in the row.
    fn cell_spans(row: &TableRow, widths: &[Pt]) -> Vec<(Pt, Pt)> {
        let mut out = Vec::with_capacity(row.cells.len());
        let mut col = 0usize;
        let mut x = Pt::ZERO;
        for cell in &row.cells {
            let end = (col + cell.col_span).min(widths.len());
            let width: Pt = widths[col.min(end)..end].iter().copied().sum();
            out.push((x, width));
            x += width;
            col = end;
        }
        out
    }

    fn padding_bottom(&self, row: &TableRow) -> Pt {
        row.padding_bottom.unwrap_or(self.padding.bottom)
    }

    fn cell_inner_width(&self, width: Pt) -> Pt {
        (width - self.padding.left - self.padding.right).max(Pt::from_f32(1.0))
    }

    fn row_height(&self, row: &TableRow, widths: &[Pt]) -> Pt {
        let spans = Self::cell_spans(row, widths);
        let content = row
            .cells
            .iter()
            .zip(&spans)
            .map(|(cell, (_, width))| stack_height(&cell.content, self.cell_inner_width(*width)))
            .fold(Pt::ZERO, Pt::max);
        (content + self.padding.top + self.padding_bottom(row)).max(row.min_height)
    }

    /// Splits one row through its cells' content. Cells that cannot place anything
    /// continue whole in the second part.
    fn split_row(
        &self,
        row: &TableRow,
        widths: &[Pt],
        avail_height: Pt,
    ) -> Option<(TableRow, TableRow)> {
        let budget = avail_height - self.padding.top - self.padding_bottom(row);
        if budget <= Pt::ZERO {
            return None;
        }
        let spans = Self::cell_spans(row, widths);
        let mut head_cells = Vec::with_capacity(row.cells.len());
        let mut tail_cells = Vec::with_capacity(row.cells.len());
        let mut placed_any = false;
        let mut continues = false;
        for (cell, (_, width)) in row.cells.iter().zip(&spans) {
            let (head, tail) = split_stack(&cell.content, self.cell_inner_width(*width), budget);
            placed_any |= !head.is_empty();
            continues |= !tail.is_empty();
            head_cells.push(cell.with_content(head));
            tail_cells.push(cell.with_content(tail));
        }
        if !placed_any || !continues {
            return None;
        }
        let head = TableRow {
            cells: head_cells,
            background: row.background,
            min_height: Pt::ZERO,
            padding_bottom: row.padding_bottom,
        };
        let tail = TableRow {
            cells: tail_cells,
            background: row.background,
            min_height: row.min_height,
            padding_bottom: row.padding_bottom,
        };
        Some((head, tail))
    }

    fn with_rows(&self, rows: Vec<TableRow>, pagination: Pagination) -> Table {
        Table {
            col_widths: self.col_widths.clone(),
            rows,
            grid: self.grid,
            outer_border: self.outer_border,
            padding: self.padding,
            valign: self.valign,
            align: self.align,
            repeat_rows: self.repeat_rows,
            pagination,
        }
    }
}

impl Flowable for Table {
    fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
        let widths = self.resolve_widths(avail_width);
        Size {
            width: widths.iter().copied().sum(),
            height: self
                .rows
                .iter()
                .map(|row| self.row_height(row, &widths))
                .sum(),
        }
    }

    fn split(
        &self,
        avail_width: Pt,
        avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        let widths = self.resolve_widths(avail_width);
        let mut used = Pt::ZERO;
        let mut fit = 0usize;
        for row in &self.rows {
            let height = self.row_height(row, &widths);
            if used + height > avail_height {
                break;
            }
            used += height;
            fit += 1;
        }
        if fit >= self.rows.len() {
            return None;
        }
        let header = self.repeat_rows.min(self.rows.len());
        let mut head_rows = self.rows[..fit].to_vec();
        let mut rest = self.rows[..header].to_vec();
        let mut resume_at = fit;
        if fit >= header {
            if let Some((row_head, row_tail)) =
                self.split_row(&self.rows[fit], &widths, avail_height - used)
            {
                head_rows.push(row_head);
                rest.push(row_tail);
                resume_at = fit + 1;
            }
        }
        if head_rows.len() <= header {
            return None;
        }
        rest.extend(self.rows[resume_at..].iter().cloned());
        let first = self.with_rows(head_rows, Pagination::default());
        let second = self.with_rows(rest, self.pagination);
        Some((Box::new(first), Box::new(second)))
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, _avail_height: Pt) {
        let widths = self.resolve_widths(avail_width);
        let total_width: Pt = widths.iter().copied().sum();
        let slack = (avail_width - total_width).max(Pt::ZERO);
        let x = match self.align {
            TextAlign::Left => x,
            TextAlign::Center => x + slack.mul_ratio(1, 2),
            TextAlign::Right => x + slack,
        };

        let mut cursor_y = y;
        for row in &self.rows {
            let height = self.row_height(row, &widths);
            let spans = Self::cell_spans(row, &widths);
            if let Some(color) = row.background {
                canvas.set_fill_color(color);
                canvas.draw_rect(x, cursor_y, total_width, height);
            }
            for (cell, (dx, width)) in row.cells.iter().zip(&spans) {
                let cell_rect = Rect::new(x + *dx, cursor_y, *width, height);
                if let Some(color) = cell.background {
                    canvas.set_fill_color(color);
                    canvas.draw_rect(cell_rect.x, cell_rect.y, cell_rect.width, cell_rect.height);
                }
                let inner = self.cell_inner_width(*width);
                let content_height = stack_height(&cell.content, inner);
                let free = height - self.padding.top - self.padding_bottom(row) - content_height;
                let offset = match self.valign {
                    VerticalAlign::Top => Pt::ZERO,
                    VerticalAlign::Middle => free.max(Pt::ZERO).mul_ratio(1, 2),
                };
                draw_stack(
                    &cell.content,
                    canvas,
                    cell_rect.x + self.padding.left,
                    cursor_y + self.padding.top + offset,
                    inner,
                );
                if let Some((line_width, color)) = self.grid {
                    canvas.set_line_width(line_width);
                    canvas.set_stroke_color(color);
                    canvas.stroke_rect(cell_rect.x, cell_rect.y, cell_rect.width, cell_rect.height);
                }
                if let Some((line_width, color)) = cell.border {
                    canvas.set_line_width(line_width);
                    canvas.set_stroke_color(color);
                    canvas.stroke_rect(cell_rect.x, cell_rect.y, cell_rect.width, cell_rect.height);
                }
            }
            cursor_y += height;
        }
        if let Some((line_width, color)) = self.outer_border {
            canvas.set_line_width(line_width);
            canvas.set_stroke_color(color);
            canvas.stroke_rect(x, y, total_width, cursor_y - y);
        }
    }

    fn pagination(&self) -> Pagination {
        self.pagination
    }
}
