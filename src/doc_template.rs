use crate::canvas::{Canvas, Document, META_PAGE_TEMPLATE_KEY};
use crate::debug::DebugLogger;
use crate::error::ReportError;
use crate::flowable::Flowable;
use crate::frame::{AddResult, Frame};
use crate::layout::LayoutDirective;
use crate::metrics::{DocumentMetrics, PageMetrics};
use crate::page_template::{DocContext, PageTemplate};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

/// Runs a directive list against a set of page templates. The first template
/// lays out page 1; later pages use whichever template was last requested.
pub struct DocTemplate {
    page_templates: Vec<PageTemplate>,
    story: Vec<LayoutDirective>,
    debug: Option<Arc<DebugLogger>>,
}

struct LayoutState<'a> {
    templates: &'a [PageTemplate],
    debug: Option<&'a DebugLogger>,
    canvas: Canvas,
    metrics: DocumentMetrics,
    page_number: usize,
    template_index: usize,
    pending_template: Option<usize>,
    frames: Vec<Frame>,
    frame_index: usize,
    placed_on_page: bool,
    page_flowables: usize,
    page_start: Instant,
}

impl<'a> LayoutState<'a> {
    fn new(templates: &'a [PageTemplate], debug: Option<&'a DebugLogger>) -> Self {
        let mut state = Self {
            templates,
            debug,
            canvas: Canvas::new(templates[0].page_size),
            metrics: DocumentMetrics::default(),
            page_number: 1,
            template_index: 0,
            pending_template: None,
            frames: Vec::new(),
            frame_index: 0,
            placed_on_page: false,
            page_flowables: 0,
            page_start: Instant::now(),
        };
        state.start_page();
        state
    }

    fn template(&self) -> &'a PageTemplate {
        &self.templates[self.template_index]
    }

    fn start_page(&mut self) {
        let template = self.template();
        self.frames = template.instantiate_frames();
        self.frame_index = 0;
        self.placed_on_page = false;
        if let Some(callback) = template.on_page() {
            callback(
                &mut self.canvas,
                &DocContext::new(self.page_number, &template.name),
            );
        }
        self.canvas
            .meta(META_PAGE_TEMPLATE_KEY, template.name.clone());
    }

    fn finish_page(&mut self) {
        let elapsed = self.page_start.elapsed().as_secs_f64() * 1000.0;
        self.metrics.total_render_ms += elapsed;
        self.metrics.pages.push(PageMetrics {
            page_number: self.page_number,
            template: self.template().name.clone(),
            render_ms: elapsed,
            command_count: self.canvas.current_command_count(),
            flowable_count: self.page_flowables,
        });
        self.canvas.show_page();
        self.page_flowables = 0;
        self.page_start = Instant::now();
    }

    fn log_page_break(&self, reason: &str, flowable: Option<&str>) {
        let Some(logger) = self.debug else {
            return;
        };
        let next = self
            .pending_template
            .unwrap_or(self.template_index);
        logger.log_event(&json!({
            "type": "layout.page_break",
            "reason": reason,
            "from_page": self.page_number,
            "to_page": self.page_number + 1,
            "frame_index": self.frame_index,
            "template": self.templates[next].name,
            "flowable": flowable,
        }));
        logger.increment("layout.page_break", 1);
    }

    fn new_page(&mut self, reason: &str, flowable: Option<&str>) {
        self.log_page_break(reason, flowable);
        self.finish_page();
        self.page_number += 1;
        if let Some(next) = self.pending_template.take() {
            self.template_index = next;
        }
        self.start_page();
    }

    fn page_is_untouched(&self) -> bool {
        !self.placed_on_page && self.frame_index == 0
    }

    fn select_template(&mut self, index: usize) {
        if let Some(logger) = self.debug {
            logger.log_event(&json!({
                "type": "layout.template_switch",
                "page": self.page_number,
                "from": self.template().name,
                "to": self.templates[index].name,
            }));
            logger.increment("layout.template_switch", 1);
        }
        self.pending_template = Some(index);
    }

    fn page_break(&mut self) {
        if !self.page_is_untouched() {
            self.new_page("page_break", None);
            return;
        }
        // Nothing placed yet: re-lay the page on the requested template instead of
        // leaving a blank page behind.
        if let Some(next) = self.pending_template.take() {
            if next != self.template_index {
                self.canvas.reset_current();
                self.template_index = next;
                self.start_page();
            }
        }
    }

    fn column_break(&mut self) {
        if self.frame_index + 1 < self.frames.len() {
            self.frame_index += 1;
        } else {
            self.new_page("column_break", None);
        }
    }

    fn place(&mut self, flowable: Box<dyn Flowable>) -> Result<(), ReportError> {
        let mut current = flowable;
        loop {
            let name = current.debug_name();
            if self.frame_index >= self.frames.len() {
                self.new_page("frame_exhausted", Some(name));
            }
            if self.frames.is_empty() {
                return Err(ReportError::InvalidConfiguration(format!(
                    "page template '{}' has no frames",
                    self.template().name
                )));
            }

            let is_last_frame = self.frame_index + 1 >= self.frames.len();
            let frame_rect = self.frames[self.frame_index].rect();
            let details = if !self.placed_on_page && is_last_frame {
                let size = current.wrap(frame_rect.width, frame_rect.height);
                Some(format!(
                    "{} size={}x{}pt frame={}x{}pt template={}",
                    name,
                    size.width.to_f32(),
                    size.height.to_f32(),
                    frame_rect.width.to_f32(),
                    frame_rect.height.to_f32(),
                    self.template().name,
                ))
            } else {
                None
            };

            let frame = &mut self.frames[self.frame_index];
            match frame.add(current, &mut self.canvas) {
                AddResult::Placed => {
                    self.placed_on_page = true;
                    self.page_flowables += 1;
                    return Ok(());
                }
                AddResult::Split(remaining) => {
                    self.placed_on_page = true;
                    self.page_flowables += 1;
                    if let Some(logger) = self.debug {
                        logger.increment("layout.flowable_split", 1);
                    }
                    current = remaining;
                    self.frame_index += 1;
                }
                AddResult::Overflow(remaining) => {
                    if !self.placed_on_page && is_last_frame {
                        return Err(ReportError::UnplaceableFlowable(
                            details.unwrap_or_else(|| name.to_string()),
                        ));
                    }
                    current = remaining;
                    self.frame_index += 1;
                }
            }
        }
    }

    fn finish(mut self) -> (Document, DocumentMetrics) {
        if !self.canvas.is_current_empty() || self.metrics.pages.is_empty() {
            self.finish_page();
        }
        (self.canvas.finish_without_show(), self.metrics)
    }
}

impl DocTemplate {
    pub fn new(page_templates: Vec<PageTemplate>) -> Self {
        Self {
            page_templates,
            story: Vec::new(),
            debug: None,
        }
    }

    pub(crate) fn with_debug(mut self, debug: Arc<DebugLogger>) -> Self {
        self.debug = Some(debug);
        self
    }

    pub fn add_directives(&mut self, directives: impl IntoIterator<Item = LayoutDirective>) {
        self.story.extend(directives);
    }

    pub fn build(self) -> Result<Document, ReportError> {
        Ok(self.build_with_metrics()?.0)
    }

    pub fn build_with_metrics(self) -> Result<(Document, DocumentMetrics), ReportError> {
        if self.page_templates.is_empty() {
            return Err(ReportError::InvalidConfiguration(
                "no page templates".to_string(),
            ));
        }
        let mut state = LayoutState::new(&self.page_templates, self.debug.as_deref());
        for directive in self.story {
            match directive {
                LayoutDirective::Emit(flowable) => state.place(flowable)?,
                LayoutDirective::NextTemplate(kind) => {
                    let index = self
                        .page_templates
                        .iter()
                        .position(|t| t.name == kind.name())
                        .ok_or_else(|| {
                            ReportError::InvalidConfiguration(format!(
                                "unknown page template '{}'",
                                kind.name()
                            ))
                        })?;
                    state.select_template(index);
                }
                LayoutDirective::PageBreak => state.page_break(),
                LayoutDirective::ColumnBreak => state.column_break(),
            }
        }
        Ok(state.finish())
    }
}
