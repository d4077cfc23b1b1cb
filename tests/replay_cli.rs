use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

struct Recording {
    _tmp: TempDir,
    file: PathBuf,
}

impl Recording {
    fn new(lines: &[&str]) -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        fs::write(tmp.path().join("quadro.jpg"), b"fake-jpeg").expect("write image fixture");
        let file = tmp.path().join("turns.jsonl");
        fs::write(&file, lines.join("\n")).expect("write recording");
        Self { _tmp: tmp, file }
    }

    fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("segretario");
        cmd.env_remove("DVR_CONFIG").env_remove("DVR_CONFIG_DIR").env("RUST_LOG", "warn");
        cmd
    }
}

const SCAVO: &str = r#"{"transcript": "Area A, scavo manuale dei manovali", "response": {"workplaces": [{"locationName": "Area A"}], "workerGroups": [{"name": "Manovali", "tasks": "Scavo"}], "activities": [{"name": "Scavo manuale", "workplace": "Area A", "assets": [], "workerGroups": ["Manovali"], "nonConformities": [{"description": "Bordo scavo non protetto", "riskLevel": "Alto", "violatedNorm": "Art. 118 D.Lgs. 81/2008"}]}]}}"#;

#[test]
fn flat_replay_renders_markdown_with_both_observations() {
    let rec = Recording::new(&[SCAVO, SCAVO]);
    rec.cmd()
        .arg("replay")
        .arg(&rec.file)
        .assert()
        .success()
        .stdout(contains("# Report Sopralluogo DVR"))
        .stdout(contains("- Area A\n").count(1))
        .stdout(contains("### Attività: Scavo manuale").count(2))
        .stdout(contains("- [ ] **[Alto]** Bordo scavo non protetto (Rif: Art. 118 D.Lgs. 81/2008)").count(2));
}

#[test]
fn malformed_turn_is_reported_and_skipped() {
    let bad = r#"{"transcript": "gru", "response": {"assets": [{"name": "Gru"}]}}"#;
    let rec = Recording::new(&[SCAVO, bad]);
    rec.cmd()
        .arg("replay")
        .arg(&rec.file)
        .assert()
        .success()
        .stderr(contains("line 2: turn dropped: malformed extraction"))
        .stdout(contains("Gru").not())
        .stdout(contains("### Attività: Scavo manuale"));
}

#[test]
fn conversational_replay_attaches_photo_and_exports_text() {
    let turn = r#"{"transcript": "Quadro elettrico aperto", "image": "quadro.jpg", "response": {"conversationalResponse": "Rilievo registrato.", "report": [{"title": "Quadro elettrico", "findings": [{"id": "1", "description": "Sportello aperto", "hazard": "Contatto elettrico", "riskLevel": 9, "regulation": "D.Lgs. 81/08, Titolo III", "recommendation": "Chiudere il quadro", "photo": {"analysis": "cavo scoperto"}}]}]}}"#;
    let rec = Recording::new(&[turn]);
    rec.cmd()
        .args(["--format", "text", "replay", "--schema", "conversational"])
        .arg(&rec.file)
        .assert()
        .success()
        .stdout(contains("SEZIONE: QUADRO ELETTRICO"))
        .stdout(contains("Livello di Rischio: 9/10 (Alto)"))
        .stdout(contains("Analisi Foto: cavo scoperto"));
}

#[test]
fn missing_image_aborts_turn_before_extraction() {
    let turn = r#"{"transcript": "Area A", "image": "assente.jpg", "response": {"workplaces": [{"locationName": "Area A"}]}}"#;
    let rec = Recording::new(&[turn]);
    rec.cmd()
        .arg("replay")
        .arg(&rec.file)
        .assert()
        .success()
        .stderr(contains("image encoding failed"))
        .stdout(contains("## 1. Luoghi di Lavoro\nNessuno"));
}

#[test]
fn session_without_config_explains_how_to_configure() {
    let tmp = TempDir::new().expect("create temp dir");
    cargo_bin_cmd!("segretario")
        .env("DVR_CONFIG_DIR", tmp.path())
        .env_remove("DVR_CONFIG")
        .arg("session")
        .assert()
        .failure()
        .stderr(contains("config not found"));
}
