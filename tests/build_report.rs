mod common;

use common::{RecordFixture, engine, pdf_runs, pdf_text, v1_test_result, write_assets, write_json};
use govreport::{
    AssessmentRecord, ChartLabel, Principle, ReportEngine, ReportError, inspect_pdf_bytes,
    load_assessment, rules_for,
};

fn load(fixture: &RecordFixture, dir: &std::path::Path) -> AssessmentRecord {
    load_assessment(fixture.write(dir), None).unwrap()
}

fn principle_first_pages(templates: &[String]) -> Vec<usize> {
    templates
        .iter()
        .enumerate()
        .filter(|(_, name)| name.as_str() == "principle_first")
        .map(|(idx, _)| idx)
        .collect()
}

#[test]
fn all_yes_record_renders_every_principle_and_appendix_entry() {
    let dir = tempfile::tempdir().unwrap();
    let assets = write_assets(dir.path());
    let fixture = RecordFixture::all_yes();
    let record = load(&fixture, dir.path());
    let engine = engine(&assets);

    let compiled = engine.compile(&record).unwrap();
    let overview = compiled.overview_chart_plan();
    assert_eq!(overview.segments.len(), 1);
    assert_eq!(overview.segments[0].label, ChartLabel::Yes);
    assert!(compiled.principles.iter().all(|p| p.stats.all_yes));
    assert!(compiled.principles.iter().all(|p| p.narrative.is_all_yes()));

    let built = engine.build(&record).unwrap();
    let inspected = inspect_pdf_bytes(&built.bytes).unwrap();
    assert_eq!(inspected.page_count, built.summary.page_count);
    assert_eq!(inspected.title.as_deref(), Some("Summary Report"));
    assert_eq!(built.summary.page_templates[0], "cover");
    assert_eq!(principle_first_pages(&built.summary.page_templates).len(), 11);
    assert_eq!(built.summary.chart_fingerprints.len(), 12);

    let runs = pdf_runs(&built.bytes);
    for process_id in fixture.process_ids() {
        let heading = format!("{} Process", process_id);
        assert_eq!(
            runs.iter().filter(|run| **run == heading).count(),
            1,
            "one appendix block for {}",
            process_id
        );
    }
    assert!(runs.iter().any(|run| run == "Annex A"));
}

#[test]
fn safety_gap_triggers_supplement_once_with_justification() {
    let dir = tempfile::tempdir().unwrap();
    let assets = write_assets(dir.path());
    let fixture = RecordFixture::all_yes()
        .answer("4.8.1", Some("No"), "pending review")
        .answer("4.9.1", Some("No"), "");
    let record = load(&fixture, dir.path());
    let engine = engine(&assets);

    let compiled = engine.compile(&record).unwrap();
    let safety = compiled.principle(Principle::Safety).unwrap();
    let table = rules_for(Principle::Safety);
    let supplement = table.supplements[0].text;
    assert!(!safety.stats.all_yes);
    assert_eq!(
        &safety.narrative.what_it_means[..table.not_all_yes_wim.len()],
        table
            .not_all_yes_wim
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .as_slice()
    );
    assert_eq!(
        safety
            .narrative
            .what_it_means
            .iter()
            .filter(|t| t.as_str() == supplement)
            .count(),
        1
    );
    assert_eq!(
        safety.narrative.justifications,
        Some(vec!["pending review".to_string()])
    );
    assert_eq!(safety.narrative.process_to_achieve_outcomes.len(), 2);

    let built = engine.build(&record).unwrap();
    let runs = pdf_runs(&built.bytes);
    assert!(runs.iter().any(|run| run == "pending review"));
    assert!(runs.iter().any(|run| run == "Recommendation:"));
}

#[test]
fn missing_test_result_omits_the_technical_test_page() {
    let dir = tempfile::tempdir().unwrap();
    let assets = write_assets(dir.path());
    let fixture = RecordFixture::all_yes().upload_reference("not-uploaded.json");
    let record = load(&fixture, dir.path());
    assert!(record.test_result.is_none());

    let built = engine(&assets).build(&record).unwrap();
    let runs = pdf_runs(&built.bytes);
    assert!(runs.iter().any(|run| run == "No technical test uploaded."));
    assert!(!runs
        .iter()
        .any(|run| run == "The Company has conducted the following tests:"));

    let templates = &built.summary.page_templates;
    let firsts = principle_first_pages(templates);
    assert!(templates[firsts[3]..firsts[4]]
        .iter()
        .all(|name| name != "introduction"));
}

#[test]
fn test_result_adds_summary_and_detail_page_after_safety() {
    let dir = tempfile::tempdir().unwrap();
    let assets = write_assets(dir.path());
    write_json(&dir.path().join("results.json"), &v1_test_result());
    let fixture = RecordFixture::all_yes().upload_reference("results.json");
    let record = load(&fixture, dir.path());
    let summary = record.test_result.as_ref().unwrap();
    assert_eq!(summary.total_tests.success, 2);
    assert_eq!(summary.total_tests.fail, 1);

    let built = engine(&assets).build(&record).unwrap();
    let text = pdf_text(&built.bytes);
    assert!(text.contains("The Company has conducted the following tests:"));
    assert!(text.contains("prompt_injection"));
    assert!(!text.contains("No technical test uploaded."));

    let templates = &built.summary.page_templates;
    let firsts = principle_first_pages(templates);
    assert!(templates[firsts[3]..firsts[4]]
        .iter()
        .any(|name| name == "introduction"));
    assert!(templates[firsts[2]..firsts[3]]
        .iter()
        .all(|name| name != "introduction"));
}

#[test]
fn unknown_test_result_schema_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let bad = write_json(
        &dir.path().join("results.json"),
        &serde_json::json!({"format": "something else", "rows": []}),
    );
    let fixture = RecordFixture::all_yes();
    let record_path = fixture.write(dir.path());

    let err = load_assessment(&record_path, Some(&bad)).unwrap_err();
    assert!(matches!(err, ReportError::SchemaMismatch(_)));

    let referenced = RecordFixture::all_yes().upload_reference("results.json");
    let err = load_assessment(referenced.write(dir.path()), None).unwrap_err();
    assert_eq!(err.code(), "SCHEMA_MISMATCH");
}

#[test]
fn rebuilding_an_unchanged_record_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let assets = write_assets(dir.path());
    let fixture = RecordFixture::all_yes()
        .answer("3.2.1", Some("N/A"), "not relevant")
        .answer("7.1.2", None, "");
    let record = load(&fixture, dir.path());
    let engine = engine(&assets);

    assert_eq!(engine.compile(&record).unwrap(), engine.compile(&record).unwrap());
    let first = engine.build(&record).unwrap();
    let second = engine.build(&record).unwrap();
    assert_eq!(first.summary, second.summary);
    assert_eq!(first.bytes, second.bytes);

    let serial = ReportEngine::builder()
        .assets_dir(&assets)
        .report_date(common::report_date())
        .chart_dpi(72)
        .parallel_charts(false)
        .build()
        .unwrap()
        .build(&record)
        .unwrap();
    assert_eq!(serial.summary.chart_fingerprints, first.summary.chart_fingerprints);
}

#[test]
fn principle_without_answers_is_rejected_and_nothing_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let assets = write_assets(dir.path());
    let fixture = RecordFixture::all_yes()
        .without_principle(Principle::Fairness)
        .answer("7.1.1", None, "");
    let record = load(&fixture, dir.path());
    let out = dir.path().join("report.pdf");

    let err = engine(&assets).build_to_path(&record, &out).unwrap_err();
    match err {
        ReportError::IncompletePrincipleData { principle, checks } => {
            assert_eq!(principle, "7. Fairness");
            assert_eq!(checks, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!out.exists());
}

#[test]
fn unreadable_logo_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let assets = write_assets(dir.path());
    std::fs::write(assets.join("logo.png"), b"not an image").unwrap();
    let record = load(&RecordFixture::all_yes(), dir.path());
    let out = dir.path().join("report.pdf");

    let err = engine(&assets).build_to_path(&record, &out).unwrap_err();
    assert_eq!(err.code(), "MISSING_ASSET");
    assert!(!out.exists());
}

#[test]
fn writes_report_and_layout_trace() {
    let dir = tempfile::tempdir().unwrap();
    let assets = write_assets(dir.path());
    let record = load(&RecordFixture::all_yes(), dir.path());
    let out = dir.path().join("out").join("report.pdf");
    std::fs::create_dir_all(out.parent().unwrap()).unwrap();
    let trace = dir.path().join("layout.jsonl");

    let engine = ReportEngine::builder()
        .assets_dir(&assets)
        .report_date(common::report_date())
        .chart_dpi(72)
        .scratch_dir(dir.path())
        .debug_path(&trace)
        .build()
        .unwrap();
    let summary = engine.build_to_path(&record, &out).unwrap();

    let bytes = std::fs::read(&out).unwrap();
    assert_eq!(bytes.len(), summary.byte_len);
    assert_eq!(inspect_pdf_bytes(&bytes).unwrap().page_count, summary.page_count);

    let lines: Vec<serde_json::Value> = std::fs::read_to_string(&trace)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert!(lines.iter().any(|l| l["type"] == "layout.page_break"));
    assert!(lines.iter().any(|l| l["type"] == "layout.template_switch"));
    assert_eq!(lines.last().unwrap()["type"], "debug.summary");

    // scratch directories are removed with the build
    let leftovers = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("govreport-charts-"))
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn appendix_groups_follow_numeric_outcome_order() {
    let dir = tempfile::tempdir().unwrap();
    let assets = write_assets(dir.path());
    let fixture = RecordFixture::all_yes().answer("3.10.1", Some("Yes"), "");
    let record = load(&fixture, dir.path());

    let built = engine(&assets).build(&record).unwrap();
    let runs = pdf_runs(&built.bytes);
    let heading = |group: &str| {
        let text = format!("{} - Outcome of group 3", group);
        runs.iter()
            .position(|run| *run == text)
            .unwrap_or_else(|| panic!("missing heading {}", text))
    };
    assert!(heading("3.1") < heading("3.2"));
    assert!(heading("3.2") < heading("3.10"));
}

#[test]
fn elaboration_longer_than_a_page_is_carried_over_whole() {
    let dir = tempfile::tempdir().unwrap();
    let assets = write_assets(dir.path());
    let words: Vec<String> = (0..1500).map(|i| format!("w{}x", i)).collect();
    let fixture = RecordFixture::all_yes().answer("5.1.1", Some("No"), &words.join(" "));
    let record = load(&fixture, dir.path());

    let built = engine(&assets).build(&record).unwrap();
    let shown: std::collections::BTreeSet<String> = pdf_runs(&built.bytes)
        .iter()
        .flat_map(|run| run.split_whitespace().map(str::to_string))
        .collect();
    for word in &words {
        assert!(shown.contains(word), "{} missing from the report", word);
    }
}
