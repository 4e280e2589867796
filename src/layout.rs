use crate::flowable::Flowable;
use crate::page_template::TemplateKind;

/// One step of the layout program the assembler produces.
#[derive(Clone)]
pub enum LayoutDirective {
    Emit(Box<dyn Flowable>),
    /// Template for the next page started, whatever starts it.
    NextTemplate(TemplateKind),
    PageBreak,
    /// Continue in the next frame of the current page, or on a new page after the last frame.
    ColumnBreak,
}

impl LayoutDirective {
    /// Short label used in traces and directive assertions.
    pub fn label(&self) -> String {
        match self {
            LayoutDirective::Emit(flowable) => {
                let name = flowable.debug_name();
                format!("emit:{}", name.rsplit("::").next().unwrap_or(name))
            }
            LayoutDirective::NextTemplate(kind) => format!("template:{}", kind.name()),
            LayoutDirective::PageBreak => "page_break".to_string(),
            LayoutDirective::ColumnBreak => "column_break".to_string(),
        }
    }
}

impl std::fmt::Debug for LayoutDirective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// Ordered directive list built by the section builders.
#[derive(Clone, Debug, Default)]
pub struct Story {
    directives: Vec<LayoutDirective>,
}

impl Story {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit<F: Flowable + 'static>(&mut self, flowable: F) {
        self.directives.push(LayoutDirective::Emit(Box::new(flowable)));
    }

    pub fn emit_boxed(&mut self, flowable: Box<dyn Flowable>) {
        self.directives.push(LayoutDirective::Emit(flowable));
    }

    pub fn next_template(&mut self, kind: TemplateKind) {
        self.directives.push(LayoutDirective::NextTemplate(kind));
    }

    pub fn break_column(&mut self) {
        self.directives.push(LayoutDirective::ColumnBreak);
    }

    /// Starts a new page on `kind`.
    pub fn break_page(&mut self, kind: TemplateKind) {
        self.next_template(kind);
        self.directives.push(LayoutDirective::PageBreak);
    }

    pub fn extend(&mut self, other: Story) {
        self.directives.extend(other.directives);
    }

    pub fn directives(&self) -> &[LayoutDirective] {
        &self.directives
    }

    pub fn into_directives(self) -> Vec<LayoutDirective> {
        self.directives
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Labels of all directives, in order.
    pub fn kinds(&self) -> Vec<String> {
        self.directives.iter().map(LayoutDirective::label).collect()
    }

    /// Number of emitted blocks whose flowable type name ends with `type_name`.
    pub fn count_emitted(&self, type_name: &str) -> usize {
        self.directives
            .iter()
            .filter(|d| matches!(d, LayoutDirective::Emit(f) if f.debug_name().ends_with(type_name)))
            .count()
    }
}
