//! Integration test: config defaults, end-to-end preparation run, schema
//! mismatch abort, bundle round trip through the scorer.

use flowprep::{
    config::PipelineConfig,
    ingest::{self, AttackCategorySource},
    schema::Schema,
    scoring::{FieldValue, FlowRecord, Scorer},
    stages::repair,
    ArtifactBundle, Pipeline, PipelineError, ScoreError,
};
use std::io::Write;
use std::path::{Path, PathBuf};

const FEATURES: &[&str] = &[
    "srcip", "proto", "service", "dur", "sbytes", "dbytes", "sttl", "attack_cat", "Label",
];

fn write_definitions(dir: &Path, names: &[&str]) -> PathBuf {
    let path = dir.join("NUSW-NB15_features.csv");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "No.,Name,Type ,Description").unwrap();
    for (i, name) in names.iter().enumerate() {
        writeln!(f, "{},{},x,-", i + 1, name).unwrap();
    }
    path
}

/// One raw row, one field per feature definition (the raw `Label` last):
/// attacks every third row, separable by protocol and ttl.
fn row(file: usize, r: usize) -> Vec<String> {
    let attack = r % 3 == 0;
    let category = match (file, r) {
        (1, 3) => "Backdoor",
        _ if !attack => "",
        _ if r == 0 => "Exploits",
        _ if r == 6 => "DoS",
        _ => "Generic",
    };
    let (sbytes, dbytes, sttl) = if attack {
        (5000 + 100 * r + file, 50 + r, 254)
    } else {
        (200 + 10 * r + file, 1000 + 7 * r * r, 31)
    };
    vec![
        format!("10.0.{}.{}", file, r),
        if attack { "udp" } else { "tcp" }.to_string(),
        if r % 2 == 0 { "-" } else { "http" }.to_string(),
        format!("{:.2}", 0.1 * (r + 1) as f64 + 0.01 * file as f64),
        sbytes.to_string(),
        dbytes.to_string(),
        sttl.to_string(),
        category.to_string(),
        u8::from(attack).to_string(),
    ]
}

/// 3 files x 10 rows. File 2 ends with exact copies of file 0 rows 1 and 2;
/// file 1 row 5 carries an uncastable duration.
fn scenario_rows() -> Vec<Vec<Vec<String>>> {
    let mut files: Vec<Vec<Vec<String>>> = (0..3)
        .map(|f| (0..10).map(|r| row(f, r)).collect())
        .collect();
    files[2][8] = files[0][1].clone();
    files[2][9] = files[0][2].clone();
    files[1][5][3] = "abc".to_string();
    files
}

fn write_raw_files(dir: &Path) -> Vec<Vec<Vec<String>>> {
    let files = scenario_rows();
    for (i, rows) in files.iter().enumerate() {
        let path = dir.join(format!("UNSW-NB15_{}.csv", i + 1));
        let mut w = csv::WriterBuilder::new().has_headers(false).from_path(path).unwrap();
        for r in rows {
            w.write_record(r).unwrap();
        }
        w.flush().unwrap();
    }
    files
}

fn scenario_config(dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.inputs.raw_dir = Some(dir.to_path_buf());
    config.inputs.feature_definitions = write_definitions(dir, FEATURES);
    config.output.table_path = dir.join("out").join("UNSW_NB15_Cleaned.csv");
    config.output.bundle_path = dir.join("out").join("ids_bundle.json");
    config.output.report_path = Some(dir.join("out").join("report.json"));
    config.forest.n_trees = 25;
    config
}

#[test]
fn config_load_default() {
    let c = PipelineConfig::load(Path::new("nonexistent.json")).unwrap();
    assert_eq!(c.correlation.threshold, 0.9);
    assert_eq!(c.rebalance.oversample_ratio, 0.5);
    assert_eq!(c.rebalance.undersample_ratio, 0.8);
    assert_eq!(c.outliers.clip_columns.len(), 32);
    assert_eq!(c.selection.denylist.len(), 16);
    assert_eq!(c.training.decision_threshold, 0.5);
}

#[test]
fn config_invalid_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flowprep.json");
    std::fs::write(&path, r#"{"rebalance": {"oversample_ratio": 2.0}}"#).unwrap();
    assert!(matches!(PipelineConfig::load(&path), Err(PipelineError::Config(_))));
    std::fs::write(&path, "not json").unwrap();
    assert!(matches!(PipelineConfig::load(&path), Err(PipelineError::Config(_))));
}

#[test]
fn end_to_end_preparation() {
    let dir = tempfile::tempdir().unwrap();
    write_raw_files(dir.path());
    let config = scenario_config(dir.path());
    let output = Pipeline::new(config.clone()).run().unwrap();

    // 2 cross-file duplicates removed
    assert_eq!(output.report.rows_ingested, 30);
    assert_eq!(output.report.duplicates_removed, 2);
    assert!(output.table.n_rows() <= 28);
    assert_eq!(output.report.coercion_failures.get("dur"), Some(&1));

    // label sum == rows whose category is not Normal (file 2 row 9 was overwritten)
    let mut reader = csv::Reader::from_path(&config.output.table_path).unwrap();
    let headers = reader.headers().unwrap().clone();
    let label_idx = headers.iter().position(|h| h == "label").unwrap();
    assert_eq!(headers.iter().last(), Some("attack_cat_label"));
    assert!(!headers.iter().any(|h| h == "srcip" || h == "Label" || h == "attack_cat"));
    let mut rows = 0;
    let mut positives = 0.0;
    for record in reader.records() {
        let record = record.unwrap();
        positives += record[label_idx].parse::<f64>().unwrap();
        rows += 1;
    }
    assert_eq!(rows, 28);
    assert_eq!(positives, 11.0);
    assert_eq!(output.report.class_counts.positives, 11);

    // Backdoor merged into Backdoors
    let classes = output.bundle.attack_encoder.classes();
    assert!(classes.iter().any(|c| c == "Backdoors"));
    assert!(!classes.iter().any(|c| c == "Backdoor"));
    assert!(classes.iter().any(|c| c == "Normal"));

    assert!(output.bundle.feature_order.iter().any(|f| f == "proto"));
    assert!(config.output.report_path.as_ref().unwrap().exists());
}

#[test]
fn uncastable_value_takes_column_median() {
    let dir = tempfile::tempdir().unwrap();
    let files = write_raw_files(dir.path());
    let config = scenario_config(dir.path());

    let raw_files = ingest::discover_raw_files(&config.inputs).unwrap();
    let defs = ingest::read_feature_definitions(&config.inputs.feature_definitions).unwrap();
    let schema = Schema::declare(&ingest::canonical_columns(&defs, &config.schema), &config.schema).unwrap();
    let raw = ingest::load_raw(&raw_files, &schema).unwrap();
    let source = AttackCategorySource::read(&raw_files, &schema, "attack_cat").unwrap();
    let repaired = repair::repair(&raw, &source, "attack_cat").unwrap();

    let mut present: Vec<f64> = files
        .iter()
        .flatten()
        .filter_map(|r| r[3].parse::<f64>().ok())
        .collect();
    present.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_eq!(present.len(), 29);
    let median = present[14];

    let dur = repaired.table.column("dur").unwrap().as_numeric().unwrap();
    // file 1 row 5 sits at position 15 of the concatenation
    assert_eq!(dur[15], Some(median));
    assert_eq!(repaired.imputed.get("dur"), Some(&median));

    let cats = repaired.table.column("attack_cat").unwrap().as_text().unwrap();
    assert_eq!(cats[13], "Backdoors");
    assert_eq!(cats[1], "Normal");
}

#[test]
fn schema_mismatch_aborts_before_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = scenario_config(dir.path());
    assert_eq!(FEATURES.len(), 9);
    // 11-column raw file against 9 declared names (9 or 10 fields accepted)
    let path = dir.path().join("UNSW-NB15_1.csv");
    std::fs::write(&path, "a,tcp,-,0.1,1,2,3,4,,0,0\nb,udp,-,0.2,1,2,3,4,DoS,1,1\n").unwrap();

    let err = Pipeline::new(config.clone()).run().unwrap_err();
    assert!(matches!(err, PipelineError::Schema(_)), "got {err}");
    assert!(!config.output.table_path.exists());
    assert!(!config.output.bundle_path.exists());
}

#[test]
fn raw_rows_without_trailing_label_field() {
    let dir = tempfile::tempdir().unwrap();
    let files = write_raw_files(dir.path());
    assert!(files.iter().flatten().all(|r| r.len() == FEATURES.len()));
    let config = scenario_config(dir.path());
    let output = Pipeline::new(config).prepare().unwrap();
    assert_eq!(output.report.rows_ingested, 30);
    assert_eq!(output.report.class_counts.positives, 11);
    assert!(output.report.identifier_columns_dropped.iter().any(|c| c == "Label"));
}

#[test]
fn invalid_utf8_cell_is_imputed_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let files = scenario_rows();
    for (i, rows) in files.iter().enumerate() {
        let mut bytes = Vec::new();
        for (r, fields) in rows.iter().enumerate() {
            for (c, field) in fields.iter().enumerate() {
                if c > 0 {
                    bytes.push(b',');
                }
                if (i, r, c) == (0, 4, 3) {
                    bytes.extend_from_slice(b"0.\xff0");
                } else {
                    bytes.extend_from_slice(field.as_bytes());
                }
            }
            bytes.push(b'\n');
        }
        std::fs::write(dir.path().join(format!("UNSW-NB15_{}.csv", i + 1)), bytes).unwrap();
    }
    let config = scenario_config(dir.path());
    let output = Pipeline::new(config).prepare().unwrap();

    assert_eq!(output.report.rows_ingested, 30);
    assert_eq!(output.report.coercion_failures.get("dur"), Some(&2));
    assert!(output.report.imputed_medians.contains_key("dur"));
    // identifiers are dropped, never coerced or imputed
    for id in ["srcip", "Label"] {
        assert!(!output.report.coercion_failures.contains_key(id), "{id}");
        assert!(!output.report.imputed_medians.contains_key(id), "{id}");
    }
}

#[test]
fn failed_output_write_leaves_no_bundle() {
    let dir = tempfile::tempdir().unwrap();
    write_raw_files(dir.path());
    let mut config = scenario_config(dir.path());
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();
    config.output.table_path = blocker.join("UNSW_NB15_Cleaned.csv");

    assert!(Pipeline::new(config.clone()).run().is_err());
    assert!(!config.output.bundle_path.exists());
    assert!(!flowprep::artifacts::checksum_path(&config.output.bundle_path).exists());
    assert!(!config.output.report_path.as_ref().unwrap().exists());
    let out_dir = config.output.bundle_path.parent().unwrap();
    let leftovers = std::fs::read_dir(out_dir).map(|d| d.count()).unwrap_or(0);
    assert_eq!(leftovers, 0);
}

#[test]
fn bundle_round_trip_through_scorer() {
    let dir = tempfile::tempdir().unwrap();
    write_raw_files(dir.path());
    let config = scenario_config(dir.path());
    let output = Pipeline::new(config.clone()).run().unwrap();

    let loaded = ArtifactBundle::load(&config.output.bundle_path).unwrap();
    assert_eq!(loaded.feature_order, output.bundle.feature_order);
    assert_eq!(loaded.run_id, output.bundle.run_id);

    let scorer = Scorer::load(&config.output.bundle_path);
    assert!(scorer.is_ready());
    let health = scorer.health();
    assert_eq!(health.status, "ok");
    assert_eq!(health.features.as_deref(), Some(output.bundle.feature_order.as_slice()));

    let record = FlowRecord::default()
        .with("proto", FieldValue::Text("udp".into()))
        .with("service", FieldValue::Text("-".into()))
        .with("dur", FieldValue::Number(0.4))
        .with("sbytes", FieldValue::Number(5300.0))
        .with("dbytes", FieldValue::Text("53".into()))
        .with("sttl", FieldValue::Number(254.0));
    let p = scorer.score(&record).unwrap();
    assert!((0.0..=1.0).contains(&p.probability));
    assert_eq!(p.prediction, u8::from(p.probability >= p.threshold));

    let unseen = record.clone().with("proto", FieldValue::Text("icmp".into()));
    assert!(matches!(scorer.score(&unseen), Err(ScoreError::Encoding { .. })));
}

#[test]
fn tampered_bundle_leaves_scorer_not_ready() {
    let dir = tempfile::tempdir().unwrap();
    write_raw_files(dir.path());
    let config = scenario_config(dir.path());
    Pipeline::new(config.clone()).run().unwrap();

    let path = &config.output.bundle_path;
    let mut bytes = std::fs::read(path).unwrap();
    bytes.extend_from_slice(b"\n");
    std::fs::write(path, bytes).unwrap();

    let scorer = Scorer::load(path);
    assert!(!scorer.is_ready());
    let health = scorer.health();
    assert!(!health.model_loaded);
    assert!(health.error.unwrap().contains("checksum"));
    assert!(matches!(
        scorer.score(&FlowRecord::default()),
        Err(ScoreError::Unavailable { .. })
    ));
}
