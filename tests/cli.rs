use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn pagesplit() -> Command {
    let mut cmd = Command::cargo_bin("pagesplit").unwrap();
    cmd.env_remove("PAGESPLIT_CONVERTER").env_remove("RUST_LOG");
    cmd
}

#[test]
fn generate_config_writes_sample() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("pagesplit.toml");

    pagesplit()
        .arg("--generate-config")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated sample configuration file"));

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[storage]"));
    assert!(content.contains("[extract.images.sizes]"));
}

#[test]
fn missing_document_is_usage_error() {
    pagesplit().arg("--force").assert().failure().code(2);
}

#[test]
fn invalid_size_is_rejected() {
    pagesplit()
        .args(["w9.pdf", "--size", "large"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("LABEL=GEOMETRY"));
}

#[test]
fn missing_converter_exits_with_unavailable() {
    let temp_dir = TempDir::new().unwrap();
    let document = temp_dir.path().join("w9.pdf");
    fs::write(&document, b"%PDF-1.4").unwrap();

    pagesplit()
        .current_dir(temp_dir.path())
        .arg(&document)
        .args(["--store-dir", "uploads", "--quiet"])
        .args(["--program", "pagesplit-no-such-converter"])
        .assert()
        .failure()
        .code(3);
}

#[test]
fn missing_document_file_fails() {
    let temp_dir = TempDir::new().unwrap();

    pagesplit()
        .current_dir(temp_dir.path())
        .args(["absent.pdf", "--store-dir", "uploads", "--quiet"])
        .assert()
        .failure()
        .code(1);
}

#[cfg(unix)]
mod with_fake_docsplit {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    const FAKE_DOCSPLIT: &str = r#"#!/bin/sh
mode="$1"
shift
while [ $# -gt 0 ]; do
  case "$1" in
    --output) out="$2"; shift ;;
    --size|--format) shift ;;
    *) input="$1" ;;
  esac
  shift
done
name=$(basename "$input")
name="${name%.*}"
mkdir -p "$out"
if [ "$mode" = "text" ]; then
  printf 'Form W-9' > "$out/$name.txt"
else
  for page in 1 2 3; do
    printf 'png' > "$out/${name}_$page.png"
  done
fi
"#;

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let temp_dir = TempDir::new().unwrap();

        let script = temp_dir.path().join("fake-docsplit");
        fs::write(&script, FAKE_DOCSPLIT).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let document = temp_dir.path().join("w9.pdf");
        fs::write(&document, b"%PDF-1.4").unwrap();

        (temp_dir, script, document)
    }

    fn run_json(dir: &Path, script: &Path, args: &[&str]) -> serde_json::Value {
        let output = pagesplit()
            .current_dir(dir)
            .env("PAGESPLIT_CONVERTER", script)
            .args(["--store-dir", "uploads", "--output-format", "json"])
            .args(args)
            .output()
            .unwrap();

        assert!(
            output.status.success(),
            "stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        // The report is the last document on stdout, after the progress messages.
        serde_json::Deserializer::from_slice(&output.stdout)
            .into_iter::<serde_json::Value>()
            .filter_map(|value| value.ok())
            .last()
            .unwrap()
    }

    #[test]
    fn json_report_lists_pages_per_size() {
        let (temp_dir, script, document) = setup();
        let document = document.to_string_lossy().to_string();

        let report = run_json(
            temp_dir.path(),
            &script,
            &[&document, "-s", "large=300x", "-s", "medium=500x", "--text=tail"],
        );

        let images = report["images"].as_object().unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images["large"].as_array().unwrap().len(), 3);
        assert_eq!(report["text"], "Form W-9");

        let uploads = temp_dir.path().join("uploads").join("w9");
        assert!(uploads.join("large").join("w9_1.png").is_file());
        assert!(uploads.join("text").join("w9.txt").is_file());
    }

    #[test]
    fn retrieve_reuses_stored_output() {
        let (temp_dir, script, document) = setup();
        let document = document.to_string_lossy().to_string();

        run_json(temp_dir.path(), &script, &[&document, "-s", "large=300x"]);

        // Output already exists, so the converter is never spawned.
        pagesplit()
            .current_dir(temp_dir.path())
            .args(["w9.pdf", "--retrieve", "--store-dir", "uploads"])
            .args(["-s", "large=300x", "--output-format", "plain"])
            .args(["--program", "pagesplit-no-such-converter"])
            .assert()
            .success()
            .stdout(predicate::str::contains("large"));
    }

    #[test]
    fn failing_converter_exits_with_conversion_code() {
        let (temp_dir, _script, document) = setup();
        let broken = temp_dir.path().join("broken-docsplit");
        fs::write(&broken, "#!/bin/sh\necho 'Error: unsupported file' >&2\nexit 1\n").unwrap();
        fs::set_permissions(&broken, fs::Permissions::from_mode(0o755)).unwrap();

        pagesplit()
            .current_dir(temp_dir.path())
            .arg(&document)
            .args(["--store-dir", "uploads"])
            .arg("--program")
            .arg(&broken)
            .assert()
            .failure()
            .code(4)
            .stderr(predicate::str::contains("unsupported file"));
    }
}
