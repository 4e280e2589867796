use crate::chart::{CHART_HEIGHT_IN, CHART_WIDTH_IN};
use crate::flowable::{
    BulletItem, CellPadding, Column, ColumnWidth, Columns, Flowable, ImageFlowable, KeepTogether,
    Pagination, Paragraph, Run, Spacer, Table, TableCell, TableRow, TextAlign, TextStyle,
    VerticalAlign,
};
use crate::font::BaseFont;
use crate::layout::Story;
use crate::page_template::TemplateKind;
use crate::record::{AssessmentRecord, DottedId, Principle, ProcessCheck};
use crate::report::{CompiledReport, OVERVIEW_CHART_ID, PrincipleReport, principle_chart_id};
use crate::test_result::TestResultSummary;
use crate::types::{Color, Pt, palette};
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub const REPORT_TITLE: &str = "Summary Report";
const COVER_SUBTITLE: &str = "AI Verification Assessment";

const AIM_HEADING: &str = "Aim of AI Verify Testing Framework for Generative AI";
const AIM_BODY: &str = "AI Verify aims to help organisations validate the performance of their AI systems against a set of internationally recognised principles and document that their AI systems have been developed and deployed with processes designed to achieve the desired outcomes of these principles.";
const USES_LEAD: &str = "Companies can use this report to:";
const USES: [&str; 2] = [
    "Identify potential gaps and take appropriate actions to address them, where applicable.",
    "Demonstrate their implementation of responsible AI practices and build trust with their stakeholders.",
];
const AUTHENTICITY_NOTE: &str = "Please note that only reports generated by AI Verify-Project Moonshot toolkit, in accordance with the AI Verify Testing Framework, and without any modification, are considered AI Verify reports.";
const SCOPE_BODY: &str = "This summary report provides an overview of how the AI system performs vis-à-vis the AI Verify Testing Framework for Generative AI. The Framework covers 11 AI governance principles: ";
const ALIGNMENT_HEADING: &str = "Alignment with other international frameworks";
const ALIGNMENT_BODY: &str = "By completing the AI Verify testing framework for Generative AI, which is mapped to Hiroshima Process International Code of Conduct for Organizations Developing Advanced AI Systems (CoC) and US National Institute of Standards and Technology’s (NIST) Artificial Intelligence Risk Management Framework Profile (AI RMF): Generative Artificial Intelligence, the Company has assessed its responsible AI practices against these frameworks as well. AI Verify processes that are mapped to these frameworks will have respective labels e.g. “Hiroshima Process CoC” or “US NIST AI RMF” next to them.";
const NO_TEST_UPLOADED: &str = "No technical test uploaded.";
const NO_JUSTIFICATION: &str = "The company did not provide any justification.";
const TECH_INTRO: &str = "The Company has conducted the following tests:";
const TECH_MEANING: &str = "The tests conducted can provide valuable insights into the AI application’s performance and safety. Each test is accompanied by a score, with the interpretation varying: in some cases, higher scores indicate better performance or reliability, while in others, lower scores are preferable (e.g., fewer adverse outcomes or successful prompt injections).";
const TECH_RECOMMENDATION: &str = "The test results highlight areas for improvement. High performance or low risk scores suggest the AI system is performing well or safe in those areas, while lower performance or higher risk scores indicate potential risks that could impact business operations or expose the Company to safety issues. Company would need to assess if the test score is acceptable according to Company’s risk tolerance level.";
const ANNEX_TITLE: &str = "Annex A";

/// Long form used on the cover and in the running footer.
pub fn format_report_date(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}

struct Styles {
    body: TextStyle,
    header: TextStyle,
    subheader: TextStyle,
    title: TextStyle,
    company: TextStyle,
    date: TextStyle,
    section_title: TextStyle,
    principle_title: TextStyle,
    stat_box: TextStyle,
    test_name: TextStyle,
    tech_intro: TextStyle,
    tech_heading: TextStyle,
    tech_body: TextStyle,
    table_header: TextStyle,
    table_text: TextStyle,
    annex_principle: TextStyle,
    annex_group: TextStyle,
    annex_cell: TextStyle,
}

impl Styles {
    fn report() -> Self {
        let regular = |size: f32, leading: f32| {
            TextStyle::new(BaseFont::Helvetica, size, leading, palette::DARK_GRAY)
        };
        let bold = |size: f32, leading: f32, color: Color| {
            TextStyle::new(BaseFont::HelveticaBold, size, leading, color)
        };
        Self {
            body: regular(9.0, 12.0).with_space_after(6.0),
            header: bold(10.0, 13.0, palette::PRIMARY).with_space_after(4.0),
            subheader: bold(9.0, 12.0, palette::SECONDARY).with_space_after(4.0),
            title: bold(32.0, 56.0, palette::PRIMARY).with_space_after(24.0),
            company: bold(14.0, 16.8, palette::DARK_GRAY).with_space_after(10.0),
            date: regular(12.0, 14.4).with_space_after(16.0),
            section_title: bold(16.0, 20.0, palette::PRIMARY).with_space_after(16.0),
            principle_title: bold(22.0, 30.0, palette::PRIMARY).with_space_after(18.0),
            stat_box: bold(11.0, 14.0, palette::DARK_GRAY),
            test_name: regular(12.0, 15.0).with_space_after(2.0),
            tech_intro: regular(12.0, 15.0).with_space_after(14.0),
            tech_heading: bold(13.0, 18.0, palette::PRIMARY).with_space_after(4.0),
            tech_body: regular(11.0, 15.0).with_space_after(10.0),
            table_header: bold(11.0, 13.2, palette::WHITESMOKE),
            table_text: regular(11.0, 13.2),
            annex_principle: bold(14.0, 17.0, palette::PRIMARY),
            annex_group: bold(12.0, 14.4, palette::DARK_GRAY).with_space_after(6.0),
            annex_cell: TextStyle::new(BaseFont::Helvetica, 10.0, 12.0, Color::BLACK),
        }
    }
}

fn bullet(body: Paragraph, label: &str, indent: f32) -> BulletItem {
    let label_style = TextStyle {
        space_after: Pt::ZERO,
        ..*body.style()
    };
    BulletItem::new(
        Paragraph::new(label, label_style),
        Box::new(body),
        Pt::from_f32(indent),
    )
}

fn chart_image(resource_id: impl Into<String>) -> ImageFlowable {
    ImageFlowable::new_pt(
        Pt::from_inches(CHART_WIDTH_IN),
        Pt::from_inches(CHART_HEIGHT_IN),
        resource_id,
    )
}

/// Builds report pages as a directive program. Layout itself happens later.
pub struct ReportAssembler<'a> {
    report: &'a CompiledReport,
    record: &'a AssessmentRecord,
    report_date: NaiveDate,
    styles: Styles,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(report: &'a CompiledReport, record: &'a AssessmentRecord, report_date: NaiveDate) -> Self {
        Self {
            report,
            record,
            report_date,
            styles: Styles::report(),
        }
    }

    /// Cover, introduction, overview, one section per principle (plus the
    /// technical test page after Safety when a test result exists), then Annex A.
    pub fn assemble(&self) -> Story {
        let mut story = self.cover();
        story.extend(self.introduction());
        story.extend(self.overview());
        for principle in &self.report.principles {
            story.extend(self.principle_section(principle));
            if principle.principle == Principle::Safety {
                if let Some(result) = &self.record.test_result {
                    story.extend(self.technical_test_page(result));
                }
            }
        }
        story.extend(self.annex());
        tracing::debug!(directives = story.len(), "report assembled");
        story
    }

    pub fn cover(&self) -> Story {
        let s = &self.styles;
        let mut story = Story::new();
        story.emit(Spacer::new_pt(Pt::from_inches(2.5)));
        story.emit(Paragraph::new(REPORT_TITLE, s.title));
        story.emit(Paragraph::new(self.record.company_name.clone(), s.company));
        story.emit(Paragraph::new(format_report_date(self.report_date), s.date));
        story.emit(Spacer::new_pt(Pt::from_inches(0.5)));
        story.emit(Paragraph::new(COVER_SUBTITLE, s.subheader));
        story
    }

    pub fn introduction(&self) -> Story {
        let s = &self.styles;
        let mut story = Story::new();
        story.break_page(TemplateKind::Introduction);
        story.emit(Paragraph::new("Introduction", s.title));
        story.emit(Paragraph::new(AIM_HEADING, s.header));
        story.emit(Paragraph::new(AIM_BODY, s.body));
        story.emit(Spacer::new(12.0));
        story.emit(Paragraph::new(USES_LEAD, s.body));
        for use_case in USES {
            story.emit(bullet(Paragraph::new(use_case, s.body), "•", 12.0));
        }
        story.emit(Spacer::new(6.0));
        story.emit(Paragraph::new(AUTHENTICITY_NOTE, s.header));
        story.emit(Spacer::new(12.0));

        story.emit(Paragraph::new("Details of Use Case", s.header));
        story.emit(Paragraph::new(
            format!(
                "Name of application tested: {}\nPurpose of the use case/application: {}",
                self.record.app_name, self.record.app_description
            ),
            s.body,
        ));
        story.emit(Spacer::new(12.0));

        story.emit(Paragraph::new("Scope of Checks and Technical Tests", s.header));
        story.emit(Paragraph::new(SCOPE_BODY, s.body));
        for principle in Principle::ALL {
            story.emit(bullet(
                Paragraph::new(principle.def().scope_label, s.body),
                &format!("{}.", principle.number()),
                18.0,
            ));
        }
        story
    }

    fn completion_text(&self) -> Vec<Box<dyn Flowable>> {
        let s = &self.styles;
        let overall = &self.report.overall;
        let mut items: Vec<Box<dyn Flowable>> = vec![Box::new(Paragraph::new(
            format!(
                "The company has completed the process checklist of {} process checks, of which:",
                overall.answered()
            ),
            s.body,
        ))];
        let lines = [
            (
                overall.yes,
                " are indicated as \"Yes\", meaning that the Company has documentary evidence for the implementation.",
            ),
            (
                overall.no,
                " are indicated as \"No\", meaning that the Company has not implemented them.",
            ),
            (
                overall.na,
                " are indicated as \"Not Applicable\", meaning that the Company has not implemented them because these processes are not applicable to the AI system being tested.",
            ),
        ];
        for (count, tail) in lines {
            let text = Paragraph::rich(
                vec![
                    Run::bold(format!("{} process checks", count)),
                    Run::plain(tail),
                ],
                s.body,
            );
            items.push(Box::new(bullet(text, "•", 12.0)));
        }
        items
    }

    pub fn overview(&self) -> Story {
        let s = &self.styles;
        let mut story = Story::new();
        story.break_page(TemplateKind::Introduction);

        let columns = Columns::new(
            vec![
                Column {
                    width: Pt::from_inches(3.5),
                    valign: VerticalAlign::Middle,
                    content: vec![Box::new(chart_image(OVERVIEW_CHART_ID))],
                },
                Column {
                    width: Pt::from_inches(3.5),
                    valign: VerticalAlign::Middle,
                    content: self.completion_text(),
                },
            ],
            Pt::from_f32(6.0),
        );
        story.emit(KeepTogether::new(vec![
            Box::new(Paragraph::new("Overall Completion Status", s.section_title)),
            Box::new(columns),
            Box::new(Spacer::new(12.0)),
        ]));
        story.emit(KeepTogether::new(vec![
            Box::new(Paragraph::new(ALIGNMENT_HEADING, s.header)),
            Box::new(Paragraph::new(ALIGNMENT_BODY, s.body)),
            Box::new(Spacer::new(8.0)),
        ]));

        story.emit(Paragraph::new("Technical Test", s.header));
        match &self.record.test_result {
            None => story.emit(Paragraph::new(
                NO_TEST_UPLOADED,
                s.body.with_font(BaseFont::HelveticaBold),
            )),
            Some(result) => {
                story.emit(self.test_counts_table(result));
                story.emit(Spacer::new(12.0));
                story.emit(Paragraph::new("Name of Tests Successfully Run:", s.subheader));
                for summary in &result.evaluation_summaries {
                    story.emit(bullet(
                        Paragraph::new(summary.test_name.clone(), s.test_name),
                        "•",
                        18.0,
                    ));
                }
            }
        }
        story
    }

    fn test_counts_table(&self, result: &TestResultSummary) -> Table {
        let counts = result.total_tests;
        let boxes = [
            (
                "Test Successfully Run",
                counts.success,
                2.0,
                palette::SUCCESS_FILL,
                palette::SUCCESS_BORDER,
            ),
            (
                "Test Failed to Complete",
                counts.fail,
                2.1,
                palette::FAILED_FILL,
                palette::FAILED_BORDER,
            ),
            (
                "Test Skipped",
                counts.skip,
                2.0,
                palette::SKIPPED_FILL,
                palette::SKIPPED_BORDER,
            ),
        ];
        let widths = boxes
            .iter()
            .map(|b| ColumnWidth::Fixed(Pt::from_inches(b.2)))
            .collect();
        let cells = boxes
            .iter()
            .map(|&(label, count, _, fill, border)| {
                let text = Paragraph::rich(
                    vec![
                        Run::plain("• ").colored(border),
                        Run::plain(format!("{}: {}", label, count)),
                    ],
                    self.styles.stat_box,
                )
                .with_align(TextAlign::Center);
                TableCell::paragraph(text)
                    .with_background(fill)
                    .with_border(1.5, border)
            })
            .collect();
        Table::new(widths, vec![TableRow::new(cells)])
            .with_padding(CellPadding::new(8.0, 6.0))
            .with_valign(VerticalAlign::Middle)
            .with_align(TextAlign::Center)
    }

    fn principle_title(&self, principle: Principle) -> Paragraph {
        Paragraph::new(
            format!(
                "{}. {}",
                principle.number(),
                principle.def().display_name.to_uppercase()
            ),
            self.styles.principle_title,
        )
    }

    /// Left frame: title, chart and (unless all Yes) the meaning and recommendation.
    /// Right frame: description, outcomes to address and justifications.
    pub fn principle_section(&self, entry: &PrincipleReport) -> Story {
        let s = &self.styles;
        let narrative = &entry.narrative;
        let mut story = Story::new();
        story.break_page(TemplateKind::PrincipleFirst);
        story.emit(self.principle_title(entry.principle));
        story.emit(Spacer::new_pt(Pt::from_inches(0.2)));
        story.emit(chart_image(principle_chart_id(entry.principle)));

        let mut right: Vec<Box<dyn Flowable>> = Vec::new();
        if entry.stats.all_yes {
            right.push(Box::new(Paragraph::new(narrative.description.clone(), s.header)));
            right.push(Box::new(Spacer::new(12.0)));
            right.push(Box::new(Paragraph::new("What It Means:", s.header)));
            for line in &narrative.what_it_means {
                right.push(Box::new(Paragraph::new(line.clone(), s.body)));
            }
        } else {
            story.emit(Spacer::new(12.0));
            story.emit(Paragraph::new("What It Means:", s.header));
            for line in &narrative.what_it_means {
                story.emit(Paragraph::new(line.clone(), s.body));
            }
            if entry.has_gaps() {
                story.emit(Spacer::new(6.0));
                story.emit(Paragraph::new("Recommendation:", s.header));
                story.emit(Paragraph::new(narrative.recommendation.clone(), s.body));
            }

            right.push(Box::new(Paragraph::new(narrative.description.clone(), s.header)));
            right.push(Box::new(Spacer::new(6.0)));
            if entry.has_gaps() {
                let outcomes = narrative
                    .process_to_achieve_outcomes
                    .iter()
                    .flat_map(|text| text.split('\n'))
                    .map(str::trim)
                    .filter(|line| !line.is_empty());
                for line in outcomes {
                    right.push(Box::new(bullet(Paragraph::new(line, s.body), "•", 12.0)));
                }
                right.push(Box::new(Spacer::new(6.0)));
            }
            right.push(Box::new(Paragraph::new("Justifications:", s.header)));
            match &narrative.justifications {
                Some(justifications) => {
                    for text in justifications {
                        right.push(Box::new(bullet(
                            Paragraph::new(text.clone(), s.body),
                            "•",
                            12.0,
                        )));
                    }
                }
                None => right.push(Box::new(Paragraph::new(
                    NO_JUSTIFICATION,
                    s.body.with_color(palette::NOTICE_RED),
                ))),
            }
        }

        story.next_template(TemplateKind::PrincipleContinuation);
        story.break_column();
        for item in right {
            story.emit_boxed(item);
        }
        story
    }

    fn test_results_table(&self, result: &TestResultSummary) -> Table {
        let s = &self.styles;
        let cell = |text: &str, style: TextStyle| {
            TableCell::paragraph(Paragraph::new(text, style).with_align(TextAlign::Center))
        };
        let mut rows = vec![
            TableRow::new(vec![
                cell("Test Name", s.table_header),
                cell("Score", s.table_header),
            ])
            .with_background(palette::PRIMARY),
        ];
        rows.extend(result.evaluation_summaries.iter().map(|summary| {
            TableRow::new(vec![
                cell(&summary.test_name, s.table_text),
                cell(&summary.score_or_grade, s.table_text),
            ])
        }));
        Table::new(
            vec![
                ColumnWidth::Fixed(Pt::from_inches(3.0)),
                ColumnWidth::Fixed(Pt::from_inches(3.5)),
            ],
            rows,
        )
        .with_outer_border(1.0, Color::BLACK)
        .with_grid(0.5, palette::GRID)
        .with_padding(CellPadding::new(8.0, 8.0))
        .with_valign(VerticalAlign::Middle)
        .with_align(TextAlign::Center)
        .with_repeat_rows(1)
    }

    pub fn technical_test_page(&self, result: &TestResultSummary) -> Story {
        let s = &self.styles;
        let mut story = Story::new();
        story.break_page(TemplateKind::Introduction);
        story.emit(Paragraph::new(
            "Technical Test",
            s.section_title.with_space_after(8.0),
        ));
        story.emit(Paragraph::new(TECH_INTRO, s.tech_intro));
        story.emit(Spacer::new(8.0));
        story.emit(self.test_results_table(result));
        story.emit(Spacer::new(18.0));
        story.emit(Paragraph::new("What It Means:", s.tech_heading));
        story.emit(Paragraph::new(TECH_MEANING, s.tech_body));
        story.emit(Spacer::new(10.0));
        story.emit(Paragraph::new("Recommendation:", s.tech_heading));
        story.emit(Paragraph::new(TECH_RECOMMENDATION, s.tech_body));
        story.emit(Spacer::new(8.0));
        story
    }

    /// One bordered block per process check; kept whole on a page when it fits.
    fn check_block(&self, check: &ProcessCheck) -> Table {
        let style = self.styles.annex_cell;
        let labelled = |label: String, value: &str| {
            Paragraph::rich(vec![Run::bold(label), Run::plain(format!("\n{}", value))], style)
        };
        let implemented = Paragraph::rich(
            vec![
                Run::bold("Implemented"),
                Run::plain(format!("\n{}\n\n", check.implementation.as_str())),
                Run::bold("Nature of Evidence"),
                Run::plain(format!("\n{}", check.nature_of_evidence)),
            ],
            style,
        );
        let details = TableRow::new(vec![
            TableCell::paragraph(labelled(
                format!("{} Process", check.process_id),
                &check.process_to_achieve_outcomes,
            )),
            TableCell::paragraph(labelled("Evidence".to_string(), &check.evidence)),
            TableCell::paragraph(implemented),
        ])
        .with_background(palette::WHITESMOKE)
        .with_padding_bottom(12.0);
        let elaboration = TableRow::new(vec![
            TableCell::paragraph(labelled(
                "Elaboration".to_string(),
                check.elaboration_text().unwrap_or(""),
            ))
            .with_span(3),
        ])
        .with_min_height(50.0);

        Table::new(
            vec![
                ColumnWidth::Fraction(0.4),
                ColumnWidth::Fraction(0.4),
                ColumnWidth::Fraction(0.2),
            ],
            vec![details, elaboration],
        )
        .with_grid(1.0, Color::BLACK)
        .with_outer_border(1.0, Color::BLACK)
        .with_pagination(Pagination::avoid())
    }

    pub fn annex(&self) -> Story {
        let s = &self.styles;
        let mut story = Story::new();
        story.break_page(TemplateKind::Introduction);
        story.emit(Spacer::new_pt(Pt::from_inches(4.0)));
        story.emit(Paragraph::new(ANNEX_TITLE, s.title).with_align(TextAlign::Center));

        for principle in Principle::ALL {
            story.break_page(TemplateKind::Introduction);
            story.emit(Paragraph::new(principle.key(), s.annex_principle));
            story.emit(Spacer::new(6.0));

            let mut groups: BTreeMap<DottedId, Vec<&ProcessCheck>> = BTreeMap::new();
            for check in self.record.checks_for(principle) {
                groups.entry(check.outcome_group()).or_default().push(check);
            }
            for (group, checks) in groups {
                let outcomes = checks.first().map(|c| c.outcomes.as_str()).unwrap_or("");
                story.emit(Paragraph::new(format!("{} - {}", group, outcomes), s.annex_group));
                for check in checks {
                    story.emit(self.check_block(check));
                    story.emit(Spacer::new(12.0));
                }
            }
        }
        story
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc_template::DocTemplate;
    use crate::page_template::{PageDecor, report_templates};
    use crate::report::compile;
    use crate::test_result::{EvaluationSummary, TestCounts};
    use crate::types::Size;
    use serde_json::{Map, Value, json};

    fn record(answer: impl Fn(u8, u8) -> &'static str) -> AssessmentRecord {
        AssessmentRecord::from_json_str(&record_json(answer).to_string()).unwrap()
    }

    fn record_json(answer: impl Fn(u8, u8) -> &'static str) -> Value {
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
                        "elaboration": if item == 2 { "Reason given" } else { "" },
                        "evidence": "Internal policy",
                        "nature_of_evidence": "Document",
                        "process_to_achieve_outcomes": format!("Process {}.{}", n, item),
                        "outcomes": format!("Outcome {}", n),
                    }),
                );
            }
            checks.insert(format!("{}.1", n), Value::Object(group));
        }
        json!({
            "company_name": "Acme Pte Ltd",
            "app_name": "Helpdesk bot",
            "app_description": "Answers customer questions",
            "process_checks": checks,
        })
    }

    fn test_result() -> TestResultSummary {
        TestResultSummary {
            status: "completed".to_string(),
            total_tests: TestCounts {
                success: 2,
                fail: 1,
                skip: 0,
            },
            evaluation_summaries: vec![
                EvaluationSummary {
                    test_name: "Toxicity".to_string(),
                    score_or_grade: "Grade: A".to_string(),
                },
                EvaluationSummary {
                    test_name: "Prompt injection".to_string(),
                    score_or_grade: "Score: 12.5".to_string(),
                },
            ],
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn count(kinds: &[String], label: &str) -> usize {
        kinds.iter().filter(|k| k.as_str() == label).count()
    }

    #[test]
    fn section_order_without_test_result() {
        let rec = record(|_, _| "Yes");
        let report = compile(&rec).unwrap();
        let story = ReportAssembler::new(&report, &rec, date()).assemble();
        let kinds = story.kinds();
        assert_eq!(kinds[0], "emit:Spacer");
        assert_eq!(count(&kinds, "template:principle_first"), 11);
        assert_eq!(count(&kinds, "template:principle_continuation"), 11);
        assert_eq!(count(&kinds, "column_break"), 11);
        // introduction, overview, annex cover and one annex page per principle
        assert_eq!(count(&kinds, "template:introduction"), 14);
        assert_eq!(story.count_emitted("Table"), rec.check_count());
    }

    #[test]
    fn technical_test_page_follows_safety() {
        let rec = record(|_, _| "Yes").with_test_result(Some(test_result()));
        let report = compile(&rec).unwrap();
        let assembler = ReportAssembler::new(&report, &rec, date());
        let kinds = assembler.assemble().kinds();
        assert_eq!(count(&kinds, "template:introduction"), 15);

        let principle_pages: Vec<usize> = kinds
            .iter()
            .enumerate()
            .filter(|(_, k)| k.as_str() == "template:principle_first")
            .map(|(i, _)| i)
            .collect();
        let between = &kinds[principle_pages[3]..principle_pages[4]];
        assert_eq!(count(between, "template:introduction"), 1);

        // counts table, results table, then one block per check
        let story = assembler.assemble();
        assert_eq!(story.count_emitted("Table"), rec.check_count() + 2);
    }

    #[test]
    fn all_yes_section_moves_meaning_to_right_column() {
        let rec = record(|_, _| "Yes");
        let report = compile(&rec).unwrap();
        let assembler = ReportAssembler::new(&report, &rec, date());
        let kinds = assembler.principle_section(&report.principles[0]).kinds();
        assert_eq!(
            &kinds[..7],
            &[
                "template:principle_first",
                "page_break",
                "emit:Paragraph",
                "emit:Spacer",
                "emit:ImageFlowable",
                "template:principle_continuation",
                "column_break",
            ]
        );
    }

    #[test]
    fn gaps_add_recommendation_and_outcome_bullets() {
        let rec = record(|n, item| if n == 1 && item == 2 { "No" } else { "Yes" });
        let report = compile(&rec).unwrap();
        let assembler = ReportAssembler::new(&report, &rec, date());
        let kinds = assembler.principle_section(&report.principles[0]).kinds();
        let column_break = kinds.iter().position(|k| k == "column_break").unwrap();
        let left = &kinds[..column_break];
        let right = &kinds[column_break..];
        // title, meaning heading, recommendation heading and text at least
        assert!(count(left, "emit:Paragraph") >= 4);
        // one outcome bullet and one justification bullet
        assert_eq!(count(right, "emit:BulletItem"), 2);
    }

    fn lay_out(rec: &AssessmentRecord) -> crate::canvas::Document {
        let report = compile(rec).unwrap();
        let story = ReportAssembler::new(&report, rec, date()).assemble();
        let decor = PageDecor {
            logo: None,
            background: None,
            footer_date: format_report_date(date()),
        };
        let mut doc = DocTemplate::new(report_templates(Size::letter(), decor));
        doc.add_directives(story.into_directives());
        doc.build().unwrap()
    }

    #[test]
    fn lays_out_cover_then_sections() {
        let rec = record(|_, _| "Yes");
        let doc = lay_out(&rec);
        let names = doc.page_template_names();
        assert_eq!(names[0], "cover");
        assert_eq!(names[1], "introduction");
        assert_eq!(names.iter().filter(|n| *n == "principle_first").count(), 11);

        let cover: Vec<&str> = doc.pages[0].text_runs().collect();
        assert!(cover.iter().any(|t| t.contains("Summary")));
        assert!(cover.iter().any(|t| t.contains("01,")));

        let all_text: String = doc
            .pages
            .iter()
            .flat_map(|p| p.text_runs())
            .collect::<Vec<_>>()
            .join(" ");
        assert!(all_text.contains("uploaded."));
        assert!(all_text.contains("Annex"));
    }

    #[test]
    fn missing_justification_prints_notice() {
        let rec = record(|n, item| if n == 2 && item == 1 { "No" } else { "Yes" });
        let doc = lay_out(&rec);
        let all_text: String = doc
            .pages
            .iter()
            .flat_map(|p| p.text_runs())
            .collect::<Vec<_>>()
            .join(" ");
        assert!(all_text.contains("justification."));
    }

    #[test]
    fn elaboration_taller_than_a_page_flows_across_pages_inside_frames() {
        let words: Vec<String> = (0..1500).map(|i| format!("zq{}", i)).collect();
        let mut raw = record_json(|_, _| "Yes");
        raw["process_checks"]["5.1"]["5.1.1"]["implementation"] = json!("No");
        raw["process_checks"]["5.1"]["5.1.1"]["elaboration"] = json!(words.join(" "));
        let rec = AssessmentRecord::from_json_str(&raw.to_string()).unwrap();
        let doc = lay_out(&rec);

        let templates = report_templates(
            Size::letter(),
            PageDecor {
                logo: None,
                background: None,
                footer_date: String::new(),
            },
        );
        let mut seen = std::collections::BTreeSet::new();
        for page in &doc.pages {
            let name = page
                .meta_value(crate::canvas::META_PAGE_TEMPLATE_KEY)
                .unwrap()
                .to_string();
            let frames: Vec<_> = templates
                .iter()
                .find(|t| t.name == name)
                .unwrap()
                .instantiate_frames()
                .iter()
                .map(|f| f.rect())
                .collect();
            for cmd in &page.commands {
                let crate::canvas::Command::DrawString { x, y, text } = cmd else {
                    continue;
                };
                if !text.starts_with("zq") {
                    continue;
                }
                assert!(
                    frames.iter().any(|r| r.x <= *x
                        && r.y <= *y
                        && *y + Pt::from_f32(10.0) <= r.bottom()),
                    "line {:?} at y={} outside the frames of {}",
                    text,
                    y.to_f32(),
                    name
                );
                seen.extend(text.split_whitespace().map(str::to_string));
            }
        }
        assert_eq!(seen.len(), words.len());
    }
}
