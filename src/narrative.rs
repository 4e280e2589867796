use crate::record::{Implementation, Principle, ProcessCheck};
use govreport_framework::{ALL_YES_DESCRIPTION, NOT_ALL_YES_DESCRIPTION, RULE_TABLES, RuleTable};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrincipleNarrative {
    pub description: String,
    pub what_it_means: Vec<String>,
    pub recommendation: String,
    pub process_to_achieve_outcomes: Vec<String>,
    /// `None` when no non-Yes check carried an elaboration.
    pub justifications: Option<Vec<String>>,
}

impl PrincipleNarrative {
    pub fn is_all_yes(&self) -> bool {
        self.description == ALL_YES_DESCRIPTION
    }
}

/// Rule table of a principle. Exhaustive so a new principle cannot ship without one.
pub fn rules_for(principle: Principle) -> &'static RuleTable {
    match principle {
        Principle::Transparency => &RULE_TABLES[0],
        Principle::Explainability => &RULE_TABLES[1],
        Principle::Reproducibility => &RULE_TABLES[2],
        Principle::Safety => &RULE_TABLES[3],
        Principle::Security => &RULE_TABLES[4],
        Principle::Robustness => &RULE_TABLES[5],
        Principle::Fairness => &RULE_TABLES[6],
        Principle::DataGovernance => &RULE_TABLES[7],
        Principle::Accountability => &RULE_TABLES[8],
        Principle::HumanAgency => &RULE_TABLES[9],
        Principle::InclusiveGrowth => &RULE_TABLES[10],
    }
}

/// Selects the narrative for one principle. Checks belonging to other principles are ignored;
/// the rest are scanned in ascending process id order. Unanswered counts as non-Yes here.
pub fn narrate(principle: Principle, checks: &[&ProcessCheck]) -> PrincipleNarrative {
    let table = rules_for(principle);

    let mut ordered: Vec<&ProcessCheck> = checks
        .iter()
        .copied()
        .filter(|check| check.principle == principle)
        .collect();
    ordered.sort_by(|a, b| a.process_id.cmp(&b.process_id));

    let mut all_yes = true;
    let mut outcomes = Vec::new();
    let mut justifications = Vec::new();
    let mut triggered = vec![false; table.supplements.len()];

    for check in ordered {
        if check.implementation == Implementation::Yes {
            continue;
        }
        all_yes = false;
        outcomes.push(check.process_to_achieve_outcomes.clone());
        if let Some(text) = check.elaboration_text() {
            justifications.push(text.to_string());
        }
        for (idx, supplement) in table.supplements.iter().enumerate() {
            if supplement.is_triggered_by(check.process_id.as_str()) {
                triggered[idx] = true;
            }
        }
    }

    if all_yes {
        return PrincipleNarrative {
            description: ALL_YES_DESCRIPTION.to_string(),
            what_it_means: to_owned(table.all_yes_wim),
            recommendation: String::new(),
            process_to_achieve_outcomes: Vec::new(),
            justifications: None,
        };
    }

    let mut what_it_means = to_owned(table.not_all_yes_wim);
    what_it_means.extend(
        table
            .supplements
            .iter()
            .zip(&triggered)
            .filter(|(_, hit)| **hit)
            .map(|(supplement, _)| supplement.text.to_string()),
    );

    PrincipleNarrative {
        description: NOT_ALL_YES_DESCRIPTION.to_string(),
        what_it_means,
        recommendation: table.recommendation.to_string(),
        process_to_achieve_outcomes: outcomes,
        justifications: if justifications.is_empty() {
            None
        } else {
            Some(justifications)
        },
    }
}

fn to_owned(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|t| t.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::DottedId;

    fn check(pid: &str, principle: Principle, implementation: Implementation) -> ProcessCheck {
        let process_id = DottedId::parse(pid).unwrap();
        ProcessCheck {
            outcome_id: process_id.prefix(2),
            process_id,
            principle,
            implementation,
            elaboration: None,
            evidence: String::new(),
            nature_of_evidence: String::new(),
            process_to_achieve_outcomes: format!("pursue {}", pid),
            outcomes: String::new(),
        }
    }

    fn with_elaboration(mut check: ProcessCheck, text: &str) -> ProcessCheck {
        check.elaboration = Some(text.to_string());
        check
    }

    #[test]
    fn every_principle_dispatches_to_its_own_table() {
        for principle in Principle::ALL {
            assert_eq!(rules_for(principle).principle, principle.number());
        }
    }

    #[test]
    fn all_yes_uses_fixed_texts_and_empty_recommendation() {
        let a = check("1.1.1", Principle::Transparency, Implementation::Yes);
        let b = with_elaboration(
            check("1.1.2", Principle::Transparency, Implementation::Yes),
            "volunteered",
        );
        let narrative = narrate(Principle::Transparency, &[&a, &b]);
        assert!(narrative.is_all_yes());
        assert_eq!(narrative.recommendation, "");
        assert!(narrative.process_to_achieve_outcomes.is_empty());
        assert_eq!(narrative.justifications, None);
        assert_eq!(
            narrative.what_it_means,
            to_owned(rules_for(Principle::Transparency).all_yes_wim)
        );
    }

    #[test]
    fn safety_supplement_is_appended_once_with_justification() {
        let no = with_elaboration(
            check("4.9.1", Principle::Safety, Implementation::No),
            "pending review",
        );
        let na = check("4.9.2", Principle::Safety, Implementation::NotApplicable);
        let yes = check("4.1.1", Principle::Safety, Implementation::Yes);
        let narrative = narrate(Principle::Safety, &[&no, &na, &yes]);

        let table = rules_for(Principle::Safety);
        assert_eq!(narrative.description, NOT_ALL_YES_DESCRIPTION);
        assert_eq!(narrative.what_it_means[0], table.not_all_yes_wim[0]);
        let content_safety = table.supplements[0].text;
        assert_eq!(
            narrative
                .what_it_means
                .iter()
                .filter(|t| t.as_str() == content_safety)
                .count(),
            1
        );
        assert_eq!(
            narrative.what_it_means.len(),
            table.not_all_yes_wim.len() + 1
        );
        assert_eq!(narrative.justifications, Some(vec!["pending review".to_string()]));
        assert_eq!(narrative.recommendation, table.recommendation);
    }

    #[test]
    fn supplements_follow_table_order_not_scan_order() {
        let late = check("3.10.1", Principle::Reproducibility, Implementation::No);
        let early = check("3.2.1", Principle::Reproducibility, Implementation::No);
        let table = rules_for(Principle::Reproducibility);
        let forward = narrate(Principle::Reproducibility, &[&early, &late]);
        let reverse = narrate(Principle::Reproducibility, &[&late, &early]);
        assert_eq!(forward, reverse);
        let n = forward.what_it_means.len();
        assert_eq!(forward.what_it_means[n - 2], table.supplements[0].text);
        assert_eq!(forward.what_it_means[n - 1], table.supplements[1].text);
        assert_eq!(
            forward.process_to_achieve_outcomes,
            vec!["pursue 3.2.1".to_string(), "pursue 3.10.1".to_string()]
        );
    }

    #[test]
    fn blank_elaborations_leave_justifications_null() {
        let no = with_elaboration(
            check("5.1.1", Principle::Security, Implementation::No),
            "   ",
        );
        let unanswered = check("5.1.2", Principle::Security, Implementation::Unanswered);
        let narrative = narrate(Principle::Security, &[&no, &unanswered]);
        assert!(!narrative.is_all_yes());
        assert_eq!(narrative.justifications, None);
        assert_eq!(narrative.process_to_achieve_outcomes.len(), 2);
    }

    #[test]
    fn other_principles_are_ignored() {
        let foreign = check("4.9.1", Principle::Safety, Implementation::No);
        let own = check("1.1.1", Principle::Transparency, Implementation::Yes);
        let narrative = narrate(Principle::Transparency, &[&foreign, &own]);
        assert!(narrative.is_all_yes());
    }
}
