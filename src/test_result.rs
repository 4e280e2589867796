use crate::error::ReportError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCounts {
    pub success: u32,
    pub fail: u32,
    pub skip: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub test_name: String,
    /// Display text; may span several lines.
    pub score_or_grade: String,
}

/// Runner output reduced to what the report shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResultSummary {
    pub status: String,
    pub total_tests: TestCounts,
    pub evaluation_summaries: Vec<EvaluationSummary>,
}

pub trait TestResultAdapter: Sync {
    fn schema_name(&self) -> &'static str;
    fn matches(&self, data: &Value) -> bool;
    fn extract_status(&self, data: &Value) -> String;
    fn extract_counts(&self, data: &Value) -> TestCounts;
    fn extract_summaries(&self, data: &Value) -> Vec<EvaluationSummary>;

    fn normalize(&self, data: &Value) -> TestResultSummary {
        TestResultSummary {
            status: self.extract_status(data),
            total_tests: self.extract_counts(data),
            evaluation_summaries: self.extract_summaries(data),
        }
    }
}

/// `run_metadata` + `run_results[]` layout.
pub struct RunnerV1;

/// `metadata.status` + `results.cookbooks[].recipes[]` layout.
pub struct RunnerV06;

const ADAPTERS: [&dyn TestResultAdapter; 2] = [&RunnerV1, &RunnerV06];

fn run_results(data: &Value) -> &[Value] {
    data.get("run_results")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn has_summary(summary: Option<&Value>) -> bool {
    match summary {
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn v1_score(summary: &Value) -> String {
    match summary {
        Value::Object(map) if map.len() == 1 => {
            let Some((key, value)) = map.iter().next() else {
                return String::new();
            };
            let heading = capitalize(&key.replace('_', " "));
            let body = match value {
                Value::Object(inner) => inner
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, display_value(v)))
                    .collect::<Vec<_>>()
                    .join("\n"),
                other => display_value(other),
            };
            format!("{}\n{}", heading, body)
        }
        Value::Null => "N/A".to_string(),
        other => display_value(other),
    }
}

fn format_grade_value(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{:.1}", rounded)
    } else {
        format!("{}", rounded)
    }
}

impl TestResultAdapter for RunnerV1 {
    fn schema_name(&self) -> &'static str {
        "runner-v1"
    }

    fn matches(&self, data: &Value) -> bool {
        let Some(meta) = data.get("run_metadata").and_then(Value::as_object) else {
            return false;
        };
        if !meta.get("run_id").is_some_and(Value::is_string)
            || !meta.get("test_id").is_some_and(Value::is_string)
        {
            return false;
        }
        let Some(results) = data.get("run_results").and_then(Value::as_array) else {
            return false;
        };
        results.iter().all(|entry| {
            let named = entry
                .pointer("/metadata/test_name")
                .is_some_and(Value::is_string);
            let summarized = entry
                .pointer("/results/evaluation_summary")
                .is_some_and(Value::is_object);
            named && summarized
        })
    }

    fn extract_status(&self, data: &Value) -> String {
        if run_results(data).is_empty() {
            "incomplete".to_string()
        } else {
            "completed".to_string()
        }
    }

    fn extract_counts(&self, data: &Value) -> TestCounts {
        let mut counts = TestCounts::default();
        for entry in run_results(data) {
            if has_summary(entry.pointer("/results/evaluation_summary")) {
                counts.success += 1;
            } else {
                counts.fail += 1;
            }
        }
        counts
    }

    fn extract_summaries(&self, data: &Value) -> Vec<EvaluationSummary> {
        run_results(data)
            .iter()
            .map(|entry| EvaluationSummary {
                test_name: entry
                    .pointer("/metadata/test_name")
                    .and_then(Value::as_str)
                    .unwrap_or("Unnamed Test")
                    .to_string(),
                score_or_grade: v1_score(
                    entry
                        .pointer("/results/evaluation_summary")
                        .unwrap_or(&Value::Null),
                ),
            })
            .collect()
    }
}

impl RunnerV06 {
    fn recipes<'a>(&self, data: &'a Value) -> impl Iterator<Item = &'a Value> {
        data.pointer("/results/cookbooks")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|cookbook| cookbook.get("recipes").and_then(Value::as_array))
            .flatten()
    }

    /// Visits recipes in order, skipping ids that already produced a summary.
    fn scan(&self, data: &Value) -> (TestCounts, Vec<EvaluationSummary>) {
        let mut counts = TestCounts::default();
        let mut summaries = Vec::new();
        let mut seen = BTreeSet::new();
        for recipe in self.recipes(data) {
            let name = recipe
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or("Unnamed Recipe");
            if seen.contains(name) {
                continue;
            }
            let first = recipe
                .get("evaluation_summary")
                .and_then(Value::as_array)
                .and_then(|items| items.first());
            let Some(first) = first else {
                counts.fail += 1;
                continue;
            };
            counts.success += 1;
            let avg = first
                .get("avg_grade_value")
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            let grade = first
                .get("grade")
                .map(display_value)
                .unwrap_or_else(|| "N/A".to_string());
            summaries.push(EvaluationSummary {
                test_name: name.to_string(),
                score_or_grade: format!(
                    "average grade value : {}, grade : {}",
                    format_grade_value(avg),
                    grade
                ),
            });
            seen.insert(name.to_string());
        }
        (counts, summaries)
    }
}

impl TestResultAdapter for RunnerV06 {
    fn schema_name(&self) -> &'static str {
        "runner-v0.6"
    }

    fn matches(&self, data: &Value) -> bool {
        let status_ok = data
            .pointer("/metadata/status")
            .is_some_and(Value::is_string);
        let Some(cookbooks) = data.pointer("/results/cookbooks").and_then(Value::as_array) else {
            return false;
        };
        status_ok
            && cookbooks.iter().all(|cookbook| {
                cookbook.get("id").is_some_and(Value::is_string)
                    && cookbook
                        .get("recipes")
                        .and_then(Value::as_array)
                        .is_some_and(|recipes| {
                            recipes
                                .iter()
                                .all(|r| r.get("id").is_some_and(Value::is_string))
                        })
            })
    }

    fn extract_status(&self, data: &Value) -> String {
        data.pointer("/metadata/status")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string()
    }

    fn extract_counts(&self, data: &Value) -> TestCounts {
        self.scan(data).0
    }

    fn extract_summaries(&self, data: &Value) -> Vec<EvaluationSummary> {
        self.scan(data).1
    }
}

/// Adapter for `data`, trying the newer layout first.
pub fn detect_adapter(data: &Value) -> Option<&'static dyn TestResultAdapter> {
    ADAPTERS.into_iter().find(|adapter| adapter.matches(data))
}

pub fn normalize_value(data: &Value) -> Result<TestResultSummary, ReportError> {
    let adapter = detect_adapter(data).ok_or_else(|| {
        ReportError::SchemaMismatch("data does not match any known schema".to_string())
    })?;
    tracing::debug!(schema = adapter.schema_name(), "technical test schema detected");
    Ok(adapter.normalize(data))
}

/// Reads and normalizes an artifact. A missing file is an `Io` error.
pub fn normalize_path(path: impl AsRef<Path>) -> Result<TestResultSummary, ReportError> {
    let data = std::fs::read_to_string(path.as_ref())?;
    let value: Value = serde_json::from_str(&data).map_err(|err| {
        ReportError::SchemaMismatch(format!("test result is not valid JSON: {}", err))
    })?;
    normalize_value(&value)
}

/// Like [`normalize_path`], but a missing file means no test was uploaded.
pub fn load_referenced(path: impl AsRef<Path>) -> Result<Option<TestResultSummary>, ReportError> {
    let path = path.as_ref();
    match normalize_path(path) {
        Ok(summary) => Ok(Some(summary)),
        Err(ReportError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "referenced test result not found; no technical test");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
