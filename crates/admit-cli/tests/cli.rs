use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const TRANSCRIPT: &str = "Student: John Smith\nEmail: john.smith@email.com\nGPA: 3.85\nSAT Score: 1450\n";

const SIGNUP_FORM: &str = r#"<html><body>
<form id="signup">
  <input id="firstName" name="first">
  <input name="lastName">
  <label for="mail">Email Address</label><input id="mail" type="email">
  <input name="phoneNumber" type="tel">
  <input id="pw" type="password">
  <input type="submit" value="Create account">
</form>
</body></html>"#;

/// A command isolated from the user's configuration directory.
fn admit(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("admit").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.join("config"))
        .env("HOME", home)
        .current_dir(home);
    cmd
}

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn extract_transcript_to_json() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "transcript.txt", TRANSCRIPT);

    admit(dir.path())
        .arg("extract")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""first_name": "John""#))
        .stdout(predicate::str::contains(r#""last_name": "Smith""#))
        .stdout(predicate::str::contains(r#""email": "john.smith@email.com""#))
        .stdout(predicate::str::contains(r#""gpa": 3.85"#))
        .stdout(predicate::str::contains(r#""sat_score": 1450"#));
}

#[test]
fn extract_drops_unusable_gpa() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "transcript.txt", "Student: Jane Doe\nGPA: N/A\n");

    admit(dir.path())
        .args(["extract", "--format", "text"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Jane"))
        .stdout(predicate::str::contains("gpa").not());
}

#[test]
fn extract_writes_output_file() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "transcript.txt", TRANSCRIPT);
    let output = dir.path().join("profile.csv");

    admit(dir.path())
        .args(["extract", "--format", "csv", "--output"])
        .arg(&output)
        .arg(&input)
        .assert()
        .success();

    let csv = fs::read_to_string(&output).unwrap();
    assert!(csv.starts_with("field,value,rule,source,matched"));
    assert!(csv.contains("email,john.smith@email.com"));
}

#[test]
fn extract_empty_text_gives_empty_profile() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "empty.txt", "");

    admit(dir.path())
        .arg("extract")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("{}"));
}

#[test]
fn extract_missing_input_fails() {
    let dir = TempDir::new().unwrap();

    admit(dir.path())
        .args(["extract", "nowhere.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn batch_writes_summary() {
    let dir = TempDir::new().unwrap();
    write(&dir, "a.txt", TRANSCRIPT);
    write(&dir, "b.txt", "Student: Jane Doe\nEmail: jane@school.org\n");
    let out = dir.path().join("out");
    let pattern = dir.path().join("*.txt");

    admit(dir.path())
        .arg("batch")
        .arg(pattern.to_str().unwrap())
        .arg("--output-dir")
        .arg(&out)
        .arg("--summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 successful, 0 failed"));

    assert!(out.join("a.json").exists());
    assert!(out.join("b.json").exists());
    let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
    assert!(summary.contains("a.txt,success"));
    assert!(summary.contains("jane@school.org"));
}

#[test]
fn resolve_reports_strategies() {
    let dir = TempDir::new().unwrap();
    let form = write(&dir, "signup.html", SIGNUP_FORM);

    admit(dir.path())
        .arg("resolve")
        .arg(&form)
        .args(["-f", "first_name", "-f", "phone", "-f", "middle_name"])
        .args(["-s", "first_name=#firstName", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""strategy": "explicit""#))
        .stdout(predicate::str::contains(r#""strategy": "attribute""#))
        .stdout(predicate::str::contains(r#""status": "not_found""#));
}

#[test]
fn resolve_rejects_invalid_selector() {
    let dir = TempDir::new().unwrap();
    let form = write(&dir, "signup.html", SIGNUP_FORM);

    admit(dir.path())
        .arg("resolve")
        .arg(&form)
        .args(["-s", "email=[[["])
        .assert()
        .failure();
}

#[test]
fn plan_from_values() {
    let dir = TempDir::new().unwrap();
    let form = write(&dir, "signup.html", SIGNUP_FORM);
    let values = write(
        &dir,
        "values.json",
        r#"{"first_name": "John", "last_name": "Smith", "email": "john@x.org", "phone": null}"#,
    );

    admit(dir.path())
        .arg("plan")
        .arg(&form)
        .arg("--values")
        .arg(&values)
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains(r##""selector": "#firstName""##))
        .stdout(predicate::str::contains(r#""value": "john@x.org""#));
}

#[test]
fn plan_output_masks_password() {
    let dir = TempDir::new().unwrap();
    let form = write(&dir, "signup.html", SIGNUP_FORM);
    let values = write(&dir, "values.json", r#"{"email": "john@x.org"}"#);

    for json in [true, false] {
        let mut cmd = admit(dir.path());
        cmd.arg("plan")
            .arg(&form)
            .arg("--values")
            .arg(&values)
            .args(["--password-env", "ADMIT_TEST_PASSWORD"])
            .env("ADMIT_TEST_PASSWORD", "hunter2-secret");
        if json {
            cmd.arg("--json");
        }
        cmd.assert()
            .success()
            .stdout(predicate::str::contains("hunter2-secret").not())
            .stdout(predicate::str::contains("********"))
            .stdout(predicate::str::contains("#pw"));
    }
}

#[test]
fn plan_require_complete_fails_on_gaps() {
    let dir = TempDir::new().unwrap();
    let form = write(&dir, "signup.html", SIGNUP_FORM);
    let values = write(&dir, "values.json", r#"{"first_name": "John"}"#);

    admit(dir.path())
        .arg("plan")
        .arg(&form)
        .arg("--values")
        .arg(&values)
        .args(["-s", "first_name=#firstName", "-s", "gpa=#gpa"])
        .arg("--require-complete")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Plan is incomplete"));
}

#[test]
fn university_template_then_check() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");

    admit(dir.path())
        .args(["university", "template", "--output"])
        .arg(&path)
        .assert()
        .success();
    assert!(path.exists());

    admit(dir.path())
        .args(["university", "template", "--output"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    admit(dir.path())
        .args(["university", "check"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("University Name"));
}

#[test]
fn university_check_reports_bad_mapping() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "broken.json",
        r##"{"name": "Broken", "url": "https://b.edu", "field_mapping": {"shoe_size": "#s"}}"##,
    );

    admit(dir.path())
        .args(["university", "check"])
        .arg(&path)
        .assert()
        .failure();
}

#[test]
fn config_path_and_init() {
    let dir = TempDir::new().unwrap();

    admit(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not created"));

    admit(dir.path()).args(["config", "init"]).assert().success();

    admit(dir.path())
        .args(["config", "get", "pdf.min_text_length"])
        .assert()
        .success()
        .stdout(predicate::str::contains("20"));

    admit(dir.path())
        .args(["config", "set", "pdf.min_text_length", "5"])
        .assert()
        .success();

    admit(dir.path())
        .args(["config", "get", "pdf.min_text_length"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5"));
}
