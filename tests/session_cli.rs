use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct SessionDir {
    tmp: TempDir,
    config: PathBuf,
}

impl SessionDir {
    fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let config = tmp.path().join("config.yaml");
        // nothing is dictated, so the endpoint is never contacted
        fs::write(&config, "extraction:\n  endpoint: \"http://127.0.0.1:9/extract\"\n").expect("write config");
        Self { tmp, config }
    }

    fn out_dir(&self) -> PathBuf {
        self.tmp.path().join("out")
    }
}

fn written_reports(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .map(|rd| rd.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default()
}

#[test]
fn quit_command_writes_report_on_exit() {
    let dir = SessionDir::new();
    cargo_bin_cmd!("segretario")
        .env("RUST_LOG", "warn")
        .arg("--config")
        .arg(&dir.config)
        .arg("session")
        .arg("--output-dir")
        .arg(dir.out_dir())
        .write_stdin("/report\n/quit\n")
        .assert()
        .success()
        .stdout(contains("# Report Sopralluogo DVR"));

    let reports = written_reports(&dir.out_dir());
    assert_eq!(reports.len(), 1);
    assert!(fs::read_to_string(&reports[0]).unwrap().contains("Nessuna non conformità rilevata."));
}

#[cfg(unix)]
#[test]
fn interrupt_at_prompt_ends_session_and_writes_report() {
    use std::io::{BufRead, BufReader};
    use std::process::{Command, Stdio};
    use std::time::{Duration, Instant};

    let dir = SessionDir::new();
    let mut child = Command::new(env!("CARGO_BIN_EXE_segretario"))
        .env("RUST_LOG", "warn")
        .arg("--config")
        .arg(&dir.config)
        .arg("session")
        .arg("--output-dir")
        .arg(dir.out_dir())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn session");

    // the greeting is printed right before the prompt starts listening
    let mut stdout = BufReader::new(child.stdout.take().expect("stdout piped"));
    let mut greeting = String::new();
    stdout.read_line(&mut greeting).expect("read greeting");
    assert!(greeting.starts_with("Buongiorno"));
    std::thread::sleep(Duration::from_millis(300));

    let status = Command::new("kill")
        .arg("-INT")
        .arg(child.id().to_string())
        .status()
        .expect("send SIGINT");
    assert!(status.success());

    let deadline = Instant::now() + Duration::from_secs(10);
    let exit = loop {
        if let Some(exit) = child.try_wait().expect("poll session") {
            break exit;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("session ignored SIGINT at the prompt");
        }
        std::thread::sleep(Duration::from_millis(50));
    };

    // stdin is still open: only the interrupt could have ended the loop
    drop(child.stdin.take());
    assert!(exit.success());
    assert_eq!(written_reports(&dir.out_dir()).len(), 1);
}
