use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

pub const CATALOG_ID: &str = "govreport.framework_catalog";
pub const CATALOG_VERSION: &str = "1";

pub const ALL_YES_DESCRIPTION: &str = "Company indicated that it was able to produce documentary evidence for all the items required under this principle.";

pub const NOT_ALL_YES_DESCRIPTION: &str = "Company indicated that it did not implement all the processes under this principle, or the processes were not applicable to the AI system tested:";

/// One of the 11 governance principles, as the checklist references it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrincipleDef {
    pub number: u8,
    /// Exact `principle_key` value carried by every process check.
    pub key: &'static str,
    pub short_name: &'static str,
    pub display_name: &'static str,
    /// Centre label of the principle chart; `\n` separates lines.
    pub chart_title: &'static str,
    /// Label used in the scope list of the introduction.
    pub scope_label: &'static str,
}

/// A paragraph appended to "what it means" when any process id in `triggers`
/// is answered with something other than Yes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupplementDef {
    pub id: &'static str,
    pub triggers: &'static [&'static str],
    pub text: &'static str,
}

impl SupplementDef {
    pub fn is_triggered_by(&self, process_id: &str) -> bool {
        self.triggers.iter().any(|id| *id == process_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleTable {
    pub principle: u8,
    pub all_yes_wim: &'static [&'static str],
    pub not_all_yes_wim: &'static [&'static str],
    pub recommendation: &'static str,
    /// Appended in this order, never in answer order.
    pub supplements: &'static [SupplementDef],
}

pub const PRINCIPLES: [PrincipleDef; 11] = [
    PrincipleDef { number: 1, key: "1. Transparency", short_name: "transparency", display_name: "Transparency", chart_title: "Transparency", scope_label: "Transparency" },
    PrincipleDef { number: 2, key: "2. Explainability", short_name: "explainability", display_name: "Explainability", chart_title: "Explainability", scope_label: "Explainability" },
    PrincipleDef { number: 3, key: "3. Reproducibility", short_name: "reproducibility", display_name: "Reproducibility", chart_title: "Reproducibility", scope_label: "Repeatability / Reproducibility" },
    PrincipleDef { number: 4, key: "4. Safety", short_name: "safety", display_name: "Safety", chart_title: "Safety", scope_label: "Safety" },
    PrincipleDef { number: 5, key: "5. Security", short_name: "security", display_name: "Security", chart_title: "Security", scope_label: "Security" },
    PrincipleDef { number: 6, key: "6. Robustness", short_name: "robustness", display_name: "Robustness", chart_title: "Robustness", scope_label: "Robustness" },
    PrincipleDef { number: 7, key: "7. Fairness", short_name: "fairness", display_name: "Fairness", chart_title: "Fairness", scope_label: "Fairness" },
    PrincipleDef { number: 8, key: "8. Data Governance", short_name: "data governance", display_name: "Data governance", chart_title: "Data Governance", scope_label: "Data Governance" },
    PrincipleDef { number: 9, key: "9. Accountability", short_name: "accountability", display_name: "Accountability", chart_title: "Accountability", scope_label: "Accountability" },
    PrincipleDef { number: 10, key: "10. Human agency", short_name: "human agency", display_name: "Human agency & oversight", chart_title: "Human Agency &\nOversight", scope_label: "Human Agency and Oversight" },
    PrincipleDef { number: 11, key: "11. Inclusive growth", short_name: "inc growth", display_name: "Inclusive growth, societal and environmental well-being", chart_title: "Inclusive Growth,\nSocietal And\nEnvironmental\nWell-being", scope_label: "Inclusive Growth, Societal and Environmental Well-being" },
];

const REPRODUCIBILITY_SUPPLEMENTS: [SupplementDef; 2] = [
    SupplementDef {
        id: "traceability",
        triggers: &["3.1.1", "3.2.1", "3.3.1", "3.4.1"],
        text: "This may affect the company’s ability to respond to internal queries, audits, or customer complaints — especially in high-stakes or regulated domains. Having foundational traceability practices in place can help future-proof the organisation’s AI operations for certification, due diligence, or regulatory alignment.",
    },
    SupplementDef {
        id: "reproducibility",
        triggers: &["3.5.1", "3.6.1", "3.7.1", "3.8.1", "3.9.1", "3.10.1", "3.11.1", "3.12.1"],
        text: "Without reproducibility, it may be difficult to identify, debug issues, or transition AI systems across teams or environments.",
    },
];

const SAFETY_SUPPLEMENTS: [SupplementDef; 2] = [
    SupplementDef {
        id: "content-safety",
        triggers: &["4.8.1", "4.9.1", "4.9.2"],
        text: "In the absence of strong content safety and validation processes, there is a risk that the AI system may output misleading, harmful, or non-compliant content. This would be a cause for concern especially for public-facing applications.",
    },
    SupplementDef {
        id: "tevv",
        triggers: &["4.10.1", "4.10.2"],
        text: "The lack of Test, Evaluation, Verification, and Validation (TEVV practices) can also weaken internal and external confidence in the system’s reliability.",
    },
];

pub const RULE_TABLES: [RuleTable; 11] = [
    RuleTable {
        principle: 1,
        all_yes_wim: &["Company has put in place communication mechanisms in a manner appropriate to the use case at hand and accessible to the audience, to enable those using and/or affected by the AI system to understand how their data is collected and used, and the intended use and limitations of the AI system."],
        not_all_yes_wim: &["Without implementing all the measures and practices specified under this principle, there may be a risk that the desired outcomes of this principle would not be fully achieved."],
        recommendation: "Company should periodically review the justifications for not implementing certain measures and practices specified under this principle to ensure that they are still valid and applicable given the current circumstances.\n\nCompany can also consider consulting the users interacting with or individuals affected by the AI system to find out if the current level of information provided to them is adequate, and if not, can consider implementing the processes in the testing framework",
        supplements: &[],
    },
    RuleTable {
        principle: 2,
        all_yes_wim: &["Company has demonstrated a preference for developing AI systems that can better explain their output (e.g., using foundation models with open weights) or that are interpretable by default (e.g., modelling with decision trees)."],
        not_all_yes_wim: &[
            "When it can be established that the performance of different models under consideration are similar, by not choosing the more explainable models for deployment, Company runs the risk of not being able to help its stakeholders understand how the AI system produces its output.",
            "The ability to offer reasonable explanations for AI-generated output can improve stakeholder trust and acceptance.",
        ],
        recommendation: "Company should consider the prevailing regulatory requirements relevant to this principle, its own internal policies and the intended use of the AI model and determine if such risk is acceptable. When building or procuring AI systems, adopt a principle of “explainability by design” — default to interpretable models where performance trade-offs are acceptable.",
        supplements: &[],
    },
    RuleTable {
        principle: 3,
        all_yes_wim: &["Company has put in place measures and processes to enable the AI system to consistently perform its required functions under stated conditions for a specific period of time, and is also able to trace back and identify errors from logging."],
        not_all_yes_wim: &["Company may not be able to demonstrate consistency of the AI system’s behavior under stated conditions, and/or identify issues and problems in order to address them."],
        recommendation: "Company should consider the prevailing regulatory requirements relevant to this principle, its own internal policies and the intended use of the AI system and determine if such risk is acceptable. Logging is a foundational practice that supports the development, maintenance, and improvement of both generative and traditional AI systems. It ensures these systems are reliable, secure, and continuously evolving to meet user needs.",
        supplements: &REPRODUCIBILITY_SUPPLEMENTS,
    },
    RuleTable {
        principle: 4,
        all_yes_wim: &["Company has conducted assessments on the materiality and risk of harm on its stakeholders, identified and mitigated known risks. Company has also assessed that the residual risks of AI system is acceptable."],
        not_all_yes_wim: &[
            "Without implementing all the processes, the AI system may carry risk of harm to end users or individuals, which could have been mitigated. This could reduce the overall trust in the AI system.",
            "Without a structured approach to assessing and monitoring risk, Company may not be aware of potential system failure points, safety harm, or unacceptable performance deviations.",
        ],
        recommendation: "Company should periodically review the justifications for not implementing certain measures and practices specified under this principle to ensure that they are still valid and applicable given the current circumstances.",
        supplements: &SAFETY_SUPPLEMENTS,
    },
    RuleTable {
        principle: 5,
        all_yes_wim: &["Company is able to provide certain level of assurance that the security of AI system is maintained, i.e. the protection of AI systems, their data, and the associated infrastructure from unauthorised access, disclosure, modification, destruction, or disruption."],
        not_all_yes_wim: &["Without implementing all the processes, Company’s AI system may be vulnerable to exploitation by malicious actors, resulting in the compromise of its AI system’s confidentiality, integrity and availability. This, in turn, could cause damage and harm to both the end users and the owner of the AI system, including privacy violations, fraud, reputational damage, and potential regulatory challenges."],
        recommendation: "Security is essential in building stakeholder trust in the AI system. Company should periodically review the justifications for not implementing certain measures and processes under this principle to see if they are still valid. Security threats are fast evolving. It is further recommended that company should regularly assess security risks and take appropriate actions to continually stay up-to-date.",
        supplements: &[],
    },
    RuleTable {
        principle: 6,
        all_yes_wim: &["Company is able to demonstrate that the AI system under test is resilient against attacks and attempts at manipulation by third party malicious actors, and can still function without producing undesirable output despite unexpected input."],
        not_all_yes_wim: &[
            "Without implementing all the processes, Company may not be able to identify factors that lead to AI system’s low level of accuracy, including detecting and mitigating adversarial attacks on the AI system. This may result in damaging consequences to Company’s stakeholders.",
            "In the absence of ensuring robustness, systems may become vulnerable to silent failures or targeted manipulation. System may be degraded over time, which can accumulate into reliability or trust issues.",
        ],
        recommendation: "Robustness is essential for ensuring that both generative and traditional AI systems are reliable and capable of adapting to changing conditions and requirements. It plays a key role in building user trust, maintaining performance, and ensuring the ethical and safe operation of AI applications. Company should periodically review the justifications for not implementing certain measures and processes under this principle to see if they are still valid.",
        supplements: &[],
    },
    RuleTable {
        principle: 7,
        all_yes_wim: &["Company has put in place measures and processes to enable it to monitor, review and identify causes of model bias and address them accordingly."],
        not_all_yes_wim: &[
            "Without implementing all the processes, Company runs the risk of not being able to monitor and identify potential causes of bias and address them throughout the AI system’s lifecycle.",
            "Without systematic fairness testing or representative data checks, the AI system may inadvertently underperform for certain user groups. This may result in discriminatory outcomes for individuals affected by the AI system. The absence of defined fairness criteria and sensitive features can make it difficult to align with emerging AI governance requirements (e.g., non-discrimination clauses, algorithmic accountability laws). This could also reduce overall trust in the system.",
        ],
        recommendation: "Fairness is essential for ensuring that both generative and traditional AI systems are ethical, trustworthy, and effective in serving diverse user groups. It plays a key role in mitigating bias, complying with regulations, and promoting positive social impact. Company should periodically review the justifications for not implementing certain measures and processes under this principle to see if they are still valid.",
        supplements: &[],
    },
    RuleTable {
        principle: 8,
        all_yes_wim: &["Company has put in place measures and processes to govern the use of data in AI systems throughout the data lifecycle, including putting in place good governance practices for data quality, lineage, and to comply with relevant regulatory requirements or industry standards."],
        not_all_yes_wim: &[
            "Without implementing all the processes, Company runs the risk of potential data quality issues affecting accuracy of the AI system, bias issues relating to unintended discrimination, data security risks. Without clear lineage and sustained quality controls, it becomes harder to ensure that data used for AI remains appropriate, accurate, and compliant over time.",
            "Gaps in oversight over third-party data usage may introduce avoidable risks, such as unauthorised use of proprietary data, or inconsistent application of internal data standards across teams and vendors.\nThis may result in unauthorized access, use or disclosure and/or compliance issues with data protection regulations and laws.",
        ],
        recommendation: "Company should review the reasons for not implementing certain processes and assess if these reasons are still valid. Company should review its data governance policy and explore putting in place relevant standards, guidelines and best practices.",
        supplements: &[],
    },
    RuleTable {
        principle: 9,
        all_yes_wim: &["Company has put in place an organisational structure and internal governance mechanism to ensure clear roles and responsibilities for the use of AI. This allows the Company to quickly establish accountability when something goes wrong, identify the problem, and address it in a timely manner."],
        not_all_yes_wim: &[
            "The current organisational structure and internal governance mechanism may not provide sufficient accountability and oversight of AI system.",
            "Without clear internal roles, system inventories, and phase-out policies, there is a risk that AI systems continue to operate without active oversight — or that handoffs between teams and vendors create gaps in accountability.",
            "A lack of auditability, especially for third-party or opaque systems, makes it difficult to investigate issues or demonstrate governance to stakeholders.",
            "This may have negative impact on the identification and mitigation of risks associated with this AI system. This may also complicate remediation when issues arise.",
        ],
        recommendation: "Company should review the current organizational structure and internal governance mechanism to ensure clear accountability for those involved in Company’s AI development and deployment. It will be important for Company to clarify roles across the AI supply chain, ensuring all relevant parties are aware of their responsibilities.",
        supplements: &[],
    },
    RuleTable {
        principle: 10,
        all_yes_wim: &["Company has put in place appropriate oversight and control measures so that human can intervene should AI system fail to achieve its intended goal and result in a negative outcome. This enables human to retain the ability to improve and override the operation of AI system."],
        not_all_yes_wim: &[
            "Company may not have put in place adequate oversight and control measures for human to intervene should AI system fail to achieve its intended goal and result in a negative outcome.",
            "Without structured review processes, training, or accessible system documentation, decision-makers may struggle to identify red flags or weigh the downstream impact of deployment.",
            "Systems with feedback loop or learning capabilities may also evolve beyond their original intent. Without regular evaluations or system-specific guardrails, risks may go undetected.\nThis may result in increase in risk of harm to end users of or individuals affected by the AI system.",
        ],
        recommendation: "Company should review the current oversight and control that spans development and deployment stages to ensure that human is able to improve the operation of AI system or override it in a timely manner when system fails.",
        supplements: &[],
    },
    RuleTable {
        principle: 11,
        all_yes_wim: &["Company has considered the broader implications of the AI system, i.e., its impact on society and environment, beyond its functional and commercial objectives."],
        not_all_yes_wim: &["Company may not be able to fully demonstrate that it has considered the broader implications of the AI system, i.e., its impact on society and environment, beyond its functional and commercial objectives. Company may overlook ways to design systems that deliver long-term public value — such as accessibility improvements, sustainability gains, or socially aligned features."],
        recommendation: "Stakeholders (e.g., regulators, partners, and consumers) increasingly scrutinise the social and environmental impact of AI. Company should review the reasons for not implementing certain processes and assess if these reasons are still valid. Company can consider assessing the potential societal and environmental benefits or harms — even if qualitative — during project scoping or approval stages",
        supplements: &[],
    },
];

static CATALOG_FINGERPRINT: OnceLock<String> = OnceLock::new();

fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

pub fn principle_defs() -> &'static [PrincipleDef] {
    &PRINCIPLES
}

pub fn principle_def(number: u8) -> Option<&'static PrincipleDef> {
    PRINCIPLES.iter().find(|p| p.number == number)
}

/// Looks a principle up by its checklist key. Surrounding whitespace is ignored.
pub fn principle_by_key(key: &str) -> Option<&'static PrincipleDef> {
    let key = key.trim();
    PRINCIPLES.iter().find(|p| p.key == key)
}

pub fn rule_table(number: u8) -> Option<&'static RuleTable> {
    RULE_TABLES.iter().find(|t| t.principle == number)
}

/// The whole catalog as JSON. Field order is fixed so the fingerprint is stable.
pub fn catalog_json() -> Value {
    let principles: Vec<Value> = PRINCIPLES
        .iter()
        .map(|p| {
            let table = rule_table(p.number);
            json!({
                "number": p.number,
                "key": p.key,
                "display_name": p.display_name,
                "chart_title": p.chart_title,
                "all_yes_wim": table.map(|t| t.all_yes_wim.to_vec()).unwrap_or_default(),
                "not_all_yes_wim": table.map(|t| t.not_all_yes_wim.to_vec()).unwrap_or_default(),
                "recommendation": table.map(|t| t.recommendation).unwrap_or_default(),
                "supplements": table
                    .map(|t| {
                        t.supplements
                            .iter()
                            .map(|s| json!({ "id": s.id, "triggers": s.triggers, "text": s.text }))
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default(),
            })
        })
        .collect();
    json!({
        "catalog": CATALOG_ID,
        "version": CATALOG_VERSION,
        "all_yes_description": ALL_YES_DESCRIPTION,
        "not_all_yes_description": NOT_ALL_YES_DESCRIPTION,
        "principles": principles,
    })
}

pub fn catalog_fingerprint_sha256() -> String {
    CATALOG_FINGERPRINT
        .get_or_init(|| hex_sha256(catalog_json().to_string().as_bytes()))
        .clone()
}
