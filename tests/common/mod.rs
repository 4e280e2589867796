#![allow(dead_code)]

use chrono::NaiveDate;
use govreport::{DottedId, Principle, ReportEngine};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub fn report_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

fn write_png(path: &Path, width: u32, height: u32, rgba: [u8; 4]) {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

/// Writes logo.png and background.png into `dir` and returns it.
pub fn write_assets(dir: &Path) -> PathBuf {
    write_png(&dir.join("logo.png"), 120, 24, [30, 82, 136, 255]);
    write_png(&dir.join("background.png"), 51, 66, [245, 245, 245, 255]);
    dir.to_path_buf()
}

pub fn engine(assets: &Path) -> ReportEngine {
    ReportEngine::builder()
        .assets_dir(assets)
        .report_date(report_date())
        .chart_dpi(72)
        .build()
        .unwrap()
}

/// Process checks keyed by process id; groups are derived from the first two segments.
#[derive(Clone, Debug)]
pub struct RecordFixture {
    checks: BTreeMap<DottedId, Value>,
    upload_reference: Option<String>,
}

fn check_json(process_id: &str, implementation: Option<&str>, elaboration: &str) -> Value {
    let number: u8 = process_id
        .split('.')
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap();
    let principle = Principle::from_number(number).unwrap();
    json!({
        "principle_key": principle.key(),
        "implementation": implementation,
        "elaboration": elaboration,
        "evidence": format!("Evidence for {}", process_id),
        "nature_of_evidence": "Internal documentation",
        "process_to_achieve_outcomes": format!("Carry out process {}", process_id),
        "outcomes": format!("Outcome of group {}", principle.number()),
    })
}

impl RecordFixture {
    /// Two outcome groups per principle, every check answered Yes.
    pub fn all_yes() -> Self {
        let mut fixture = Self {
            checks: BTreeMap::new(),
            upload_reference: None,
        };
        for principle in Principle::ALL {
            let n = principle.number();
            for id in [format!("{n}.1.1"), format!("{n}.1.2"), format!("{n}.2.1")] {
                fixture = fixture.answer(&id, Some("Yes"), "");
            }
        }
        fixture
    }

    pub fn answer(mut self, process_id: &str, implementation: Option<&str>, elaboration: &str) -> Self {
        self.checks.insert(
            DottedId::parse(process_id).unwrap(),
            check_json(process_id, implementation, elaboration),
        );
        self
    }

    pub fn without_principle(mut self, principle: Principle) -> Self {
        self.checks
            .retain(|id, _| id.parts().first().copied() != Some(u32::from(principle.number())));
        self
    }

    pub fn upload_reference(mut self, path: &str) -> Self {
        self.upload_reference = Some(path.to_string());
        self
    }

    pub fn process_ids(&self) -> Vec<String> {
        self.checks.keys().map(|id| id.as_str().to_string()).collect()
    }

    pub fn to_json(&self) -> Value {
        let mut groups: BTreeMap<DottedId, Map<String, Value>> = BTreeMap::new();
        for (id, check) in &self.checks {
            groups
                .entry(id.prefix(2))
                .or_default()
                .insert(id.as_str().to_string(), check.clone());
        }
        let process_checks: Map<String, Value> = groups
            .into_iter()
            .map(|(group, checks)| (group.as_str().to_string(), Value::Object(checks)))
            .collect();
        let mut record = json!({
            "company_name": "Acme Analytics Pte Ltd",
            "app_name": "Claims assistant",
            "app_description": "Drafts responses to insurance claim queries",
            "process_checks": process_checks,
        });
        if let Some(reference) = &self.upload_reference {
            record["upload_results"] = json!({ "file_path": reference });
        }
        record
    }

    pub fn write(&self, dir: &Path) -> PathBuf {
        write_json(&dir.join("record.json"), &self.to_json())
    }
}

pub fn write_json(path: &Path, value: &Value) -> PathBuf {
    std::fs::write(path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
    path.to_path_buf()
}

pub fn v1_test_result() -> Value {
    json!({
        "run_metadata": {"run_id": "run-1", "test_id": "t-1", "start_time": "s",
                         "end_time": "e", "duration": 2.0},
        "run_results": [
            {"metadata": {"test_name": "toxicity"},
             "results": {"evaluation_summary": {"toxicity_rate": {"rate": 0.02}}}},
            {"metadata": {"test_name": "prompt_injection"},
             "results": {"evaluation_summary": {"attack_success": {"rate": 0.1}}}},
            {"metadata": {"test_name": "hallucination"},
             "results": {"evaluation_summary": {}}}
        ]
    })
}

/// Every string shown on every page, joined by newlines.
pub fn pdf_text(bytes: &[u8]) -> String {
    govreport::extract_page_text_runs(bytes)
        .unwrap()
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn pdf_runs(bytes: &[u8]) -> Vec<String> {
    govreport::extract_page_text_runs(bytes)
        .unwrap()
        .into_iter()
        .flatten()
        .collect()
}
