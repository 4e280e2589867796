use crate::chart::{ChartLabel, ChartPlan, plan_proportion_chart};
use crate::error::ReportError;
use crate::narrative::{PrincipleNarrative, narrate};
use crate::record::{AssessmentRecord, Principle};
use crate::stats::{OverallStats, PrincipleStats, aggregate};
use serde::Serialize;

pub const OVERVIEW_CHART_ID: &str = "chart_overview";
pub const OVERVIEW_CHART_TITLE: &str = "Process Checks";

pub fn principle_chart_id(principle: Principle) -> String {
    format!("chart_principle_{:02}", principle.number())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrincipleReport {
    pub principle: Principle,
    pub stats: PrincipleStats,
    pub narrative: PrincipleNarrative,
}

impl PrincipleReport {
    /// Recommendation and outcomes are shown only when something was No or N/A.
    pub fn has_gaps(&self) -> bool {
        self.stats.no > 0 || self.stats.na > 0
    }

    pub fn chart_plan(&self) -> ChartPlan {
        plan_proportion_chart(
            &[
                (ChartLabel::Yes, self.stats.yes),
                (ChartLabel::No, self.stats.no),
                (ChartLabel::NotApplicable, self.stats.na),
            ],
            self.principle.def().chart_title,
        )
    }
}

/// Layout-free content of a report: statistics and narrative for every principle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledReport {
    pub overall: OverallStats,
    pub principles: Vec<PrincipleReport>,
}

impl CompiledReport {
    pub fn principle(&self, principle: Principle) -> Option<&PrincipleReport> {
        self.principles.iter().find(|p| p.principle == principle)
    }

    pub fn overview_chart_plan(&self) -> ChartPlan {
        plan_proportion_chart(
            &[
                (ChartLabel::Yes, self.overall.yes),
                (ChartLabel::No, self.overall.no),
                (ChartLabel::NotApplicable, self.overall.na),
            ],
            OVERVIEW_CHART_TITLE,
        )
    }

    /// Overview chart first, then one per principle, keyed by image resource id.
    pub fn chart_plans(&self) -> Vec<(String, ChartPlan)> {
        let mut plans = vec![(OVERVIEW_CHART_ID.to_string(), self.overview_chart_plan())];
        plans.extend(
            self.principles
                .iter()
                .map(|p| (principle_chart_id(p.principle), p.chart_plan())),
        );
        plans
    }
}

/// Aggregates and narrates every principle in canonical order. A principle with
/// no Yes/No/N-A answer is an error rather than a vacuous "all yes".
pub fn compile(record: &AssessmentRecord) -> Result<CompiledReport, ReportError> {
    let (overall, per_principle) = aggregate(record);
    let mut principles = Vec::with_capacity(Principle::ALL.len());
    for principle in Principle::ALL {
        let stats = per_principle.get(&principle).copied().unwrap_or_default();
        if stats.answered() == 0 {
            return Err(ReportError::IncompletePrincipleData {
                principle: principle.key().to_string(),
                checks: stats.checks as usize,
            });
        }
        let checks = record.checks_for(principle);
        let narrative = narrate(principle, &checks);
        tracing::debug!(
            principle = principle.key(),
            yes = stats.yes,
            no = stats.no,
            na = stats.na,
            all_yes = stats.all_yes,
            "principle compiled"
        );
        principles.push(PrincipleReport {
            principle,
            stats,
            narrative,
        });
    }
    Ok(CompiledReport {
        overall,
        principles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value, json};

    fn record(answer: impl Fn(u8, u8) -> Option<&'static str>) -> AssessmentRecord {
        let mut checks = Map::new();
        for principle in Principle::ALL {
            let n = principle.number();
            let mut group = Map::new();
            for item in 1..=2u8 {
                group.insert(
                    format!("{}.1.{}", n, item),
                    json!({
                        "principle_key": principle.key(),
                        "implementation": answer(n, item),
                        "process_to_achieve_outcomes": format!("Do {}.{}", n, item),
                        "outcomes": "Outcome",
                    }),
                );
            }
            checks.insert(format!("{}.1", n), Value::Object(group));
        }
        let raw = json!({"company_name": "Acme", "process_checks": checks});
        AssessmentRecord::from_json_str(&raw.to_string()).unwrap()
    }

    #[test]
    fn all_yes_record_compiles_every_principle() {
        let report = compile(&record(|_, _| Some("Yes"))).unwrap();
        assert_eq!(report.principles.len(), 11);
        assert_eq!(report.overall.yes, 22);
        assert!(report.principles.iter().all(|p| p.stats.all_yes && !p.has_gaps()));
        assert_eq!(report.overview_chart_plan().segments.len(), 1);
        let plans = report.chart_plans();
        assert_eq!(plans.len(), 12);
        assert_eq!(plans[4].0, "chart_principle_04");
    }

    #[test]
    fn unanswered_principle_is_incomplete_data() {
        let err = compile(&record(|n, _| if n == 7 { None } else { Some("Yes") })).unwrap_err();
        match err {
            ReportError::IncompletePrincipleData { principle, checks } => {
                assert_eq!(principle, "7. Fairness");
                assert_eq!(checks, 2);
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn compilation_is_repeatable() {
        let rec = record(|n, item| if n == 4 && item == 2 { Some("No") } else { Some("Yes") });
        let first = compile(&rec).unwrap();
        let second = compile(&rec).unwrap();
        assert_eq!(first, second);
        let fingerprints = |r: &CompiledReport| {
            r.chart_plans()
                .into_iter()
                .map(|(_, plan)| plan.fingerprint())
                .collect::<Vec<_>>()
        };
        assert_eq!(fingerprints(&first), fingerprints(&second));
        assert!(first.principle(Principle::Safety).unwrap().has_gaps());
    }
}
