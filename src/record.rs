use crate::error::ReportError;
use crate::test_result::TestResultSummary;
use govreport_framework::{PRINCIPLES, PrincipleDef};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_COMPANY_NAME: &str = "Unknown Company";
pub const DEFAULT_APP_NAME: &str = "Unknown Application";
pub const DEFAULT_APP_DESCRIPTION: &str = "No description available.";

/// Dot-separated numeric identifier ("3.10.1"). Orders by numeric parts, so
/// "3.2" sorts before "3.10".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DottedId {
    raw: String,
    parts: Vec<u32>,
}

impl DottedId {
    pub fn parse(raw: &str) -> Result<Self, ReportError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ReportError::InvalidRecord("empty dotted id".to_string()));
        }
        let mut parts = Vec::new();
        for segment in trimmed.split('.') {
            let value = segment.parse::<u32>().map_err(|_| {
                ReportError::InvalidRecord(format!("malformed dotted id '{}'", raw))
            })?;
            parts.push(value);
        }
        Ok(Self {
            raw: trimmed.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn parts(&self) -> &[u32] {
        &self.parts
    }

    /// The first `depth` segments. "3.10.2".prefix(2) is "3.10".
    pub fn prefix(&self, depth: usize) -> DottedId {
        let parts: Vec<u32> = self.parts.iter().copied().take(depth).collect();
        let raw = parts
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(".");
        DottedId { raw, parts }
    }
}

impl Ord for DottedId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parts
            .cmp(&other.parts)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for DottedId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for DottedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Implementation {
    Yes,
    No,
    #[serde(rename = "N/A")]
    NotApplicable,
    Unanswered,
}

impl Implementation {
    /// Case-insensitive. Blank or missing values are `Unanswered`.
    pub fn parse(raw: Option<&str>) -> Result<Self, ReportError> {
        let Some(raw) = raw else {
            return Ok(Implementation::Unanswered);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "" => Ok(Implementation::Unanswered),
            "yes" => Ok(Implementation::Yes),
            "no" => Ok(Implementation::No),
            "n/a" | "na" | "not applicable" => Ok(Implementation::NotApplicable),
            _ => Err(ReportError::InvalidRecord(format!(
                "implementation must be Yes, No or N/A, got '{}'",
                raw
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Implementation::Yes => "Yes",
            Implementation::No => "No",
            Implementation::NotApplicable => "N/A",
            Implementation::Unanswered => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Principle {
    Transparency,
    Explainability,
    Reproducibility,
    Safety,
    Security,
    Robustness,
    Fairness,
    DataGovernance,
    Accountability,
    HumanAgency,
    InclusiveGrowth,
}

impl Principle {
    pub const ALL: [Principle; 11] = [
        Principle::Transparency,
        Principle::Explainability,
        Principle::Reproducibility,
        Principle::Safety,
        Principle::Security,
        Principle::Robustness,
        Principle::Fairness,
        Principle::DataGovernance,
        Principle::Accountability,
        Principle::HumanAgency,
        Principle::InclusiveGrowth,
    ];

    pub fn number(self) -> u8 {
        match self {
            Principle::Transparency => 1,
            Principle::Explainability => 2,
            Principle::Reproducibility => 3,
            Principle::Safety => 4,
            Principle::Security => 5,
            Principle::Robustness => 6,
            Principle::Fairness => 7,
            Principle::DataGovernance => 8,
            Principle::Accountability => 9,
            Principle::HumanAgency => 10,
            Principle::InclusiveGrowth => 11,
        }
    }

    pub fn from_number(number: u8) -> Option<Principle> {
        Principle::ALL.into_iter().find(|p| p.number() == number)
    }

    /// Matches the canonical `"<number>. <Name>"` key after trimming.
    pub fn from_key(key: &str) -> Option<Principle> {
        govreport_framework::principle_by_key(key).and_then(|def| Self::from_number(def.number))
    }

    pub fn def(self) -> &'static PrincipleDef {
        &PRINCIPLES[usize::from(self.number() - 1)]
    }

    pub fn key(self) -> &'static str {
        self.def().key
    }
}

impl fmt::Display for Principle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessCheck {
    pub process_id: DottedId,
    pub outcome_id: DottedId,
    pub principle: Principle,
    pub implementation: Implementation,
    pub elaboration: Option<String>,
    pub evidence: String,
    pub nature_of_evidence: String,
    pub process_to_achieve_outcomes: String,
    pub outcomes: String,
}

impl ProcessCheck {
    /// Outcome group used by the appendix: the first two segments of the process id.
    pub fn outcome_group(&self) -> DottedId {
        self.process_id.prefix(2)
    }

    /// Trimmed elaboration, `None` when blank.
    pub fn elaboration_text(&self) -> Option<&str> {
        self.elaboration
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

pub type Checklist = BTreeMap<DottedId, BTreeMap<DottedId, ProcessCheck>>;

#[derive(Debug, Clone)]
pub struct AssessmentRecord {
    pub company_name: String,
    pub app_name: String,
    pub app_description: String,
    pub process_checks: Checklist,
    pub test_result: Option<TestResultSummary>,
    /// Test artifact path the record was saved with, if any.
    pub upload_reference: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    company_name: Option<String>,
    app_name: Option<String>,
    app_description: Option<String>,
    #[serde(default)]
    process_checks: BTreeMap<String, BTreeMap<String, RawProcessCheck>>,
    upload_results: Option<RawUploadResults>,
}

#[derive(Debug, Deserialize)]
struct RawUploadResults {
    file_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawProcessCheck {
    principle_key: Option<String>,
    implementation: Option<String>,
    elaboration: Option<String>,
    evidence: Option<String>,
    nature_of_evidence: Option<String>,
    process_to_achieve_outcomes: Option<String>,
    outcomes: Option<String>,
    outcome_id: Option<String>,
}

fn non_blank(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl AssessmentRecord {
    pub fn from_json_str(raw: &str) -> Result<Self, ReportError> {
        let raw: RawRecord = serde_json::from_str(raw)?;
        Self::from_raw(raw)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&data)
    }

    fn from_raw(raw: RawRecord) -> Result<Self, ReportError> {
        let mut process_checks: Checklist = BTreeMap::new();
        for (outer_id, checks) in raw.process_checks {
            let outer = DottedId::parse(&outer_id)?;
            for (process_id, check) in checks {
                let process_id = DottedId::parse(&process_id)?;
                let key = check.principle_key.as_deref().unwrap_or("");
                let principle = Principle::from_key(key).ok_or_else(|| {
                    ReportError::InvalidRecord(format!(
                        "process check {} has unknown principle key '{}'",
                        process_id, key
                    ))
                })?;
                let implementation = Implementation::parse(check.implementation.as_deref())
                    .map_err(|err| match err {
                        ReportError::InvalidRecord(message) => {
                            ReportError::InvalidRecord(format!("{}: {}", process_id, message))
                        }
                        other => other,
                    })?;
                let outcome_id = match check.outcome_id.as_deref() {
                    Some(id) if !id.trim().is_empty() => DottedId::parse(id)?,
                    _ => outer.clone(),
                };
                let parsed = ProcessCheck {
                    process_id: process_id.clone(),
                    outcome_id,
                    principle,
                    implementation,
                    elaboration: check.elaboration,
                    evidence: check.evidence.unwrap_or_default(),
                    nature_of_evidence: check.nature_of_evidence.unwrap_or_default(),
                    process_to_achieve_outcomes: check
                        .process_to_achieve_outcomes
                        .unwrap_or_default(),
                    outcomes: check.outcomes.unwrap_or_default(),
                };
                process_checks
                    .entry(outer.clone())
                    .or_default()
                    .insert(process_id, parsed);
            }
        }

        let upload_reference = raw
            .upload_results
            .and_then(|u| u.file_path)
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            company_name: non_blank(raw.company_name, DEFAULT_COMPANY_NAME),
            app_name: non_blank(raw.app_name, DEFAULT_APP_NAME),
            app_description: non_blank(raw.app_description, DEFAULT_APP_DESCRIPTION),
            process_checks,
            test_result: None,
            upload_reference,
        })
    }

    pub fn with_test_result(mut self, test_result: Option<TestResultSummary>) -> Self {
        self.test_result = test_result;
        self
    }

    /// Every check, outcome by outcome.
    pub fn checks(&self) -> impl Iterator<Item = &ProcessCheck> {
        self.process_checks.values().flat_map(|group| group.values())
    }

    pub fn check_count(&self) -> usize {
        self.process_checks.values().map(|group| group.len()).sum()
    }

    /// Checks of one principle in ascending process id order.
    pub fn checks_for(&self, principle: Principle) -> Vec<&ProcessCheck> {
        let mut checks: Vec<&ProcessCheck> = self
            .checks()
            .filter(|check| check.principle == principle)
            .collect();
        checks.sort_by(|a, b| a.process_id.cmp(&b.process_id));
        checks
    }
}
