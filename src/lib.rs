mod assemble;
mod assets;
mod canvas;
mod chart;
mod debug;
mod doc_template;
mod error;
mod flowable;
mod font;
mod frame;
mod inspect;
mod layout;
mod metrics;
mod narrative;
mod page_template;
mod pdf;
mod record;
mod report;
mod stats;
mod test_result;
mod types;

pub use assemble::{REPORT_TITLE, ReportAssembler, format_report_date};
pub use assets::{AssetKind, AssetPaths, AssetStore, ImageAsset};
pub use canvas::{Canvas, Command, Document, META_PAGE_TEMPLATE_KEY, Page};
pub use chart::{
    CHART_HEIGHT_IN, CHART_WIDTH_IN, ChartLabel, ChartPlan, ChartSegment, plan_proportion_chart,
    render_proportion_chart,
};
pub use doc_template::DocTemplate;
pub use error::ReportError;
pub use flowable::{
    BreakInside, BulletItem, CellPadding, Column, ColumnWidth, Columns, Flowable, ImageFlowable,
    KeepTogether, Pagination, Paragraph, Run, Spacer, Table, TableCell, TableRow, TextAlign,
    TextStyle, VerticalAlign,
};
pub use font::{BaseFont, ChartFont};
pub use frame::{AddResult, Frame};
pub use inspect::{
    PdfInspectError, PdfInspectErrorCode, PdfInspectReport, extract_page_text_runs,
    inspect_pdf_bytes, inspect_pdf_path,
};
pub use layout::{LayoutDirective, Story};
pub use metrics::{DocumentMetrics, PageMetrics};
pub use narrative::{PrincipleNarrative, narrate, rules_for};
pub use page_template::{
    DecorImage, DocContext, FrameSpec, PageDecor, PageTemplate, TemplateKind, report_templates,
};
pub use pdf::PdfOptions;
pub use record::{
    AssessmentRecord, Checklist, DottedId, Implementation, Principle, ProcessCheck,
};
pub use report::{
    CompiledReport, OVERVIEW_CHART_ID, PrincipleReport, compile, principle_chart_id,
};
pub use stats::{OverallStats, PrincipleStats, aggregate};
pub use test_result::{
    EvaluationSummary, RunnerV06, RunnerV1, TestCounts, TestResultAdapter, TestResultSummary,
    detect_adapter, load_referenced, normalize_path, normalize_value,
};
pub use types::{Color, Pt, Rect, Size, palette};

use chrono::NaiveDate;
use debug::DebugLogger;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

const LOGO_RESOURCE: &str = "logo";
const BACKGROUND_RESOURCE: &str = "background";
const DEFAULT_CHART_DPI: u32 = 300;
const MAX_CHART_DPI: u32 = 1200;

/// Compiles assessment records into PDF summary reports. Holds configuration only;
/// every build starts from the record it is given.
pub struct ReportEngine {
    logo_path: PathBuf,
    background_path: PathBuf,
    chart_font: Option<ChartFont>,
    chart_dpi: u32,
    parallel_charts: bool,
    report_date: NaiveDate,
    scratch_dir: Option<PathBuf>,
    debug: Option<Arc<DebugLogger>>,
    pdf_options: PdfOptions,
}

#[derive(Clone, Debug)]
pub struct ReportEngineBuilder {
    assets_dir: Option<PathBuf>,
    logo_path: Option<PathBuf>,
    background_path: Option<PathBuf>,
    chart_font_path: Option<PathBuf>,
    chart_dpi: u32,
    parallel_charts: bool,
    report_date: Option<NaiveDate>,
    scratch_dir: Option<PathBuf>,
    debug_path: Option<PathBuf>,
    title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildSummary {
    pub page_count: usize,
    pub byte_len: usize,
    pub page_templates: Vec<String>,
    /// SHA-256 of each chart's input plan, keyed by image resource id.
    pub chart_fingerprints: BTreeMap<String, String>,
    pub framework_fingerprint: String,
}

#[derive(Debug, Clone)]
pub struct BuiltReport {
    pub bytes: Vec<u8>,
    pub summary: BuildSummary,
}

impl ReportEngine {
    pub fn builder() -> ReportEngineBuilder {
        ReportEngineBuilder::new()
    }

    pub fn report_date(&self) -> NaiveDate {
        self.report_date
    }

    pub fn compile(&self, record: &AssessmentRecord) -> Result<CompiledReport, ReportError> {
        report::compile(record)
    }

    fn emit_debug_summary(&self, context: &str) {
        if let Some(logger) = self.debug.as_deref() {
            logger.emit_summary(context);
            logger.flush();
        }
    }

    fn scratch(&self) -> Result<tempfile::TempDir, ReportError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("govreport-charts-");
        let dir = match &self.scratch_dir {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    fn load_branding(&self) -> Result<(ImageAsset, ImageAsset), ReportError> {
        let logo = ImageAsset::load(LOGO_RESOURCE, AssetKind::Logo, &self.logo_path)?;
        let background = ImageAsset::load(
            BACKGROUND_RESOURCE,
            AssetKind::Background,
            &self.background_path,
        )?;
        Ok((logo, background))
    }

    /// Renders every chart into `dir` and reads it back. All charts finish before
    /// any is returned; the first failure wins.
    fn render_charts(
        &self,
        plans: &[(String, ChartPlan)],
        dir: &Path,
    ) -> Result<Vec<ImageAsset>, ReportError> {
        let started = Instant::now();
        let font = self.chart_font.as_ref();
        let dpi = self.chart_dpi;
        let render_one = |(resource_id, plan): &(String, ChartPlan)| -> Result<ImageAsset, ReportError> {
            let png = render_proportion_chart(plan, font, dpi)?;
            let path = dir.join(format!("{}.png", resource_id));
            std::fs::write(&path, &png)
                .map_err(|err| ReportError::missing_asset(resource_id.as_str(), path.clone(), err))?;
            ImageAsset::load(resource_id.clone(), AssetKind::Chart, &path)
        };
        let results: Vec<Result<ImageAsset, ReportError>> = if self.parallel_charts {
            plans.par_iter().map(render_one).collect()
        } else {
            plans.iter().map(render_one).collect()
        };
        let charts = results.into_iter().collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(
            charts = charts.len(),
            parallel = self.parallel_charts,
            dpi,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "charts rendered"
        );
        Ok(charts)
    }

    /// Full pipeline: statistics, narrative, charts, layout, PDF. Nothing is
    /// written outside the per-build scratch directory.
    pub fn build(&self, record: &AssessmentRecord) -> Result<BuiltReport, ReportError> {
        let started = Instant::now();
        tracing::info!(
            company = %record.company_name,
            checks = record.check_count(),
            technical_test = record.test_result.is_some(),
            "building report"
        );
        if record.test_result.is_none() {
            tracing::info!("no technical test result; overview will say none was uploaded");
        }

        let report = self.compile(record)?;
        let (logo, background) = self.load_branding()?;

        let scratch = self.scratch()?;
        let plans = report.chart_plans();
        let charts = self.render_charts(&plans, scratch.path())?;

        let decor = PageDecor {
            logo: Some(logo.decor()),
            background: Some(background.resource_id.clone()),
            footer_date: format_report_date(self.report_date),
        };
        let mut store = AssetStore::default();
        store.insert(logo);
        store.insert(background);
        for chart in charts {
            store.insert(chart);
        }

        let story = ReportAssembler::new(&report, record, self.report_date).assemble();
        tracing::debug!(directives = story.len(), "story assembled");

        let mut doc_template = DocTemplate::new(report_templates(Size::letter(), decor));
        if let Some(debug) = &self.debug {
            doc_template = doc_template.with_debug(Arc::clone(debug));
        }
        doc_template.add_directives(story.into_directives());
        let (document, metrics) = doc_template.build_with_metrics()?;
        let bytes = pdf::document_to_pdf(
            &document,
            &store,
            &self.pdf_options,
            self.debug.as_deref(),
        )?;
        self.emit_debug_summary("build");
        drop(scratch);

        let summary = BuildSummary {
            page_count: document.pages.len(),
            byte_len: bytes.len(),
            page_templates: document.page_template_names(),
            chart_fingerprints: plans
                .iter()
                .map(|(id, plan)| (id.clone(), plan.fingerprint()))
                .collect(),
            framework_fingerprint: govreport_framework::catalog_fingerprint_sha256(),
        };
        tracing::info!(
            pages = summary.page_count,
            bytes = summary.byte_len,
            flowables = metrics.flowable_count(),
            layout_ms = metrics.total_render_ms,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "report built"
        );
        Ok(BuiltReport { bytes, summary })
    }

    /// Builds and writes the PDF through a temporary sibling, so `path` either
    /// holds the complete report or is left untouched.
    pub fn build_to_path(
        &self,
        record: &AssessmentRecord,
        path: impl AsRef<Path>,
    ) -> Result<BuildSummary, ReportError> {
        let path = path.as_ref();
        let built = self.build(record)?;
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = tempfile::Builder::new()
            .prefix(".govreport-")
            .suffix(".pdf.tmp")
            .tempfile_in(parent)?;
        staged.write_all(&built.bytes)?;
        staged.flush()?;
        staged.persist(path).map_err(|err| ReportError::Io(err.error))?;
        tracing::info!(path = %path.display(), bytes = built.bytes.len(), "report written");
        Ok(built.summary)
    }
}

impl ReportEngineBuilder {
    pub fn new() -> Self {
        Self {
            assets_dir: None,
            logo_path: None,
            background_path: None,
            chart_font_path: None,
            chart_dpi: DEFAULT_CHART_DPI,
            parallel_charts: true,
            report_date: None,
            scratch_dir: None,
            debug_path: None,
            title: REPORT_TITLE.to_string(),
        }
    }

    pub fn assets_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.assets_dir = Some(path.into());
        self
    }

    pub fn logo_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.logo_path = Some(path.into());
        self
    }

    pub fn background_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.background_path = Some(path.into());
        self
    }

    pub fn chart_font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chart_font_path = Some(path.into());
        self
    }

    pub fn chart_dpi(mut self, dpi: u32) -> Self {
        self.chart_dpi = dpi;
        self
    }

    pub fn parallel_charts(mut self, enabled: bool) -> Self {
        self.parallel_charts = enabled;
        self
    }

    pub fn report_date(mut self, date: NaiveDate) -> Self {
        self.report_date = Some(date);
        self
    }

    pub fn scratch_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(path.into());
        self
    }

    pub fn debug_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn build(self) -> Result<ReportEngine, ReportError> {
        if self.chart_dpi == 0 || self.chart_dpi > MAX_CHART_DPI {
            return Err(ReportError::InvalidConfiguration(format!(
                "chart_dpi must be between 1 and {}, got {}",
                MAX_CHART_DPI, self.chart_dpi
            )));
        }
        if self.title.trim().is_empty() {
            return Err(ReportError::InvalidConfiguration(
                "title must not be empty".to_string(),
            ));
        }

        let defaults = self
            .assets_dir
            .as_ref()
            .map(AssetPaths::from_dir)
            .unwrap_or_default();
        let logo_path = self.logo_path.or(defaults.logo).ok_or_else(|| {
            ReportError::InvalidConfiguration("logo path unset; set assets_dir or logo_path".to_string())
        })?;
        let background_path = self.background_path.or(defaults.background).ok_or_else(|| {
            ReportError::InvalidConfiguration(
                "background path unset; set assets_dir or background_path".to_string(),
            )
        })?;

        let chart_font = match self.chart_font_path.or(defaults.chart_font) {
            Some(path) => Some(ChartFont::load(path)?),
            None => ChartFont::probe_system(),
        };
        match &chart_font {
            Some(font) => tracing::debug!(path = %font.path().display(), "chart font loaded"),
            None => tracing::warn!("no chart font found; chart labels will be omitted"),
        }

        let report_date = self
            .report_date
            .unwrap_or_else(|| chrono::Local::now().date_naive());

        let debug = match self.debug_path {
            Some(path) => Some(Arc::new(DebugLogger::new(path)?)),
            None => None,
        };

        Ok(ReportEngine {
            logo_path,
            background_path,
            chart_font,
            chart_dpi: self.chart_dpi,
            parallel_charts: self.parallel_charts,
            report_date,
            scratch_dir: self.scratch_dir,
            debug,
            pdf_options: PdfOptions {
                title: Some(self.title),
                ..PdfOptions::default()
            },
        })
    }
}

impl Default for ReportEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Loads a record and attaches its technical test result. An explicit test file
/// must exist; a path only referenced by the record may be absent, which means no
/// test was uploaded. Relative references resolve against the record's directory.
pub fn load_assessment(
    record_path: impl AsRef<Path>,
    test_result_path: Option<&Path>,
) -> Result<AssessmentRecord, ReportError> {
    let record_path = record_path.as_ref();
    let record = AssessmentRecord::from_path(record_path)?;
    let test_result = match (test_result_path, &record.upload_reference) {
        (Some(path), _) => Some(normalize_path(path)?),
        (None, Some(reference)) => {
            let resolved = if reference.is_relative() {
                record_path
                    .parent()
                    .map(|dir| dir.join(reference))
                    .unwrap_or_else(|| reference.clone())
            } else {
                reference.clone()
            };
            load_referenced(resolved)?
        }
        (None, None) => None,
    };
    Ok(record.with_test_result(test_result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_bad_configuration() {
        let err = ReportEngine::builder()
            .assets_dir("assets")
            .chart_dpi(0)
            .build()
            .err()
            .unwrap();
        assert_eq!(err.code(), "INVALID_CONFIGURATION");

        let err = ReportEngine::builder()
            .assets_dir("assets")
            .title("  ")
            .build()
            .err()
            .unwrap();
        assert_eq!(err.code(), "INVALID_CONFIGURATION");

        let err = ReportEngine::builder().build().err().unwrap();
        assert!(err.to_string().contains("logo path"));
    }

    #[test]
    fn unreadable_chart_font_is_a_missing_asset() {
        let dir = tempfile::tempdir().unwrap();
        let font = dir.path().join("chart.ttf");
        std::fs::write(&font, b"not a font").unwrap();
        let err = ReportEngine::builder()
            .assets_dir(dir.path())
            .chart_font_path(&font)
            .build()
            .err()
            .unwrap();
        assert_eq!(err.code(), "MISSING_ASSET");
    }

    #[test]
    fn explicit_paths_override_assets_dir() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let engine = ReportEngine::builder()
            .assets_dir("/brand")
            .logo_path("/elsewhere/logo.jpg")
            .report_date(date)
            .build()
            .unwrap();
        assert_eq!(engine.logo_path, PathBuf::from("/elsewhere/logo.jpg"));
        assert_eq!(engine.background_path, PathBuf::from("/brand/background.png"));
        assert_eq!(engine.report_date(), date);
        assert_eq!(engine.pdf_options.title.as_deref(), Some(REPORT_TITLE));
    }

    #[test]
    fn referenced_test_result_may_be_absent() {
        let dir = tempfile::tempdir().unwrap();
        let record = dir.path().join("record.json");
        std::fs::write(
            &record,
            r#"{"company_name": "Acme", "process_checks": {}, "upload_results": {"file_path": "gone.json"}}"#,
        )
        .unwrap();
        let loaded = load_assessment(&record, None).unwrap();
        assert!(loaded.test_result.is_none());

        let err = load_assessment(&record, Some(&dir.path().join("gone.json"))).unwrap_err();
        assert_eq!(err.code(), "IO_ERROR");
    }
}
