use crate::record::{AssessmentRecord, Implementation, Principle};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OverallStats {
    pub yes: u32,
    pub no: u32,
    pub na: u32,
    pub unanswered: u32,
    /// Every process check, answered or not.
    pub total: u32,
}

impl OverallStats {
    pub fn answered(&self) -> u32 {
        self.yes + self.no + self.na
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PrincipleStats {
    pub yes: u32,
    pub no: u32,
    pub na: u32,
    pub all_yes: bool,
    /// Process checks that reference the principle, including unanswered ones.
    pub checks: u32,
}

impl PrincipleStats {
    pub fn answered(&self) -> u32 {
        self.yes + self.no + self.na
    }

    fn count(&mut self, implementation: Implementation) {
        self.checks += 1;
        match implementation {
            Implementation::Yes => self.yes += 1,
            Implementation::No => self.no += 1,
            Implementation::NotApplicable => self.na += 1,
            Implementation::Unanswered => {}
        }
    }

    fn settle(&mut self) {
        self.all_yes = self.yes > 0 && self.no == 0 && self.na == 0;
    }
}

/// Counts every check once into the overall totals and into its principle's bucket.
/// All 11 principles are present in the map, even those with no checks.
pub fn aggregate(record: &AssessmentRecord) -> (OverallStats, BTreeMap<Principle, PrincipleStats>) {
    let mut overall = OverallStats::default();
    let mut per_principle: BTreeMap<Principle, PrincipleStats> = Principle::ALL
        .iter()
        .map(|p| (*p, PrincipleStats::default()))
        .collect();

    for check in record.checks() {
        overall.total += 1;
        match check.implementation {
            Implementation::Yes => overall.yes += 1,
            Implementation::No => overall.no += 1,
            Implementation::NotApplicable => overall.na += 1,
            Implementation::Unanswered => overall.unanswered += 1,
        }
        per_principle
            .entry(check.principle)
            .or_default()
            .count(check.implementation);
    }

    for stats in per_principle.values_mut() {
        stats.settle();
    }
    (overall, per_principle)
}
