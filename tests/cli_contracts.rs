use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn run_fleetstore(root: &Path, args: &[&str]) -> Value {
    let output = Command::new(env!("CARGO_BIN_EXE_fleetstore"))
        .arg("--root")
        .arg(root)
        .args(args)
        .output()
        .expect("failed to execute fleetstore");
    assert!(
        output.status.success(),
        "fleetstore {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    let envelope: Value = serde_json::from_slice(&output.stdout).expect("stdout is one JSON envelope");
    assert_eq!(envelope["status"], "ok");
    assert!(envelope["event_id"].as_str().is_some_and(|id| id.len() == 26));
    envelope
}

#[test]
fn init_reports_root_and_capacity() {
    let tmp = TempDir::new().expect("tempdir");
    let out = run_fleetstore(tmp.path(), &["init"]);
    assert_eq!(out["cmd"], "init");
    assert_eq!(out["max_query_report_rows"], 1000);
    assert!(tmp.path().join("fleet.db").exists());
}

#[test]
fn results_flow_respects_configured_cap() {
    let tmp = TempDir::new().expect("tempdir");
    fs::write(tmp.path().join("fleetstore.toml"), "max_query_report_rows = 2\n").unwrap();

    let host = run_fleetstore(tmp.path(), &["host", "enroll", "--hostname", "web-1"]);
    let host_id = host["host"]["id"].as_i64().expect("host id");
    let query = run_fleetstore(tmp.path(), &["query", "add", "--name", "procs", "--sql", "SELECT 1"]);
    let query_id = query["id"].as_i64().expect("query id");

    let rows_file = tmp.path().join("rows.jsonl");
    let lines: Vec<String> = vec![
        format!(r#"{{"query_id":{query_id},"host_id":{host_id},"last_fetched":1,"data":{{"pid":1}}}}"#),
        format!(r#"{{"query_id":{query_id},"host_id":{host_id},"last_fetched":1,"data":null}}"#),
        format!(r#"{{"query_id":{query_id},"host_id":{host_id},"last_fetched":1,"data":{{"pid":2}}}}"#),
        format!(r#"{{"query_id":{query_id},"host_id":{host_id},"last_fetched":1,"data":{{"pid":3}}}}"#),
    ];
    fs::write(&rows_file, lines.join("\n")).unwrap();

    let saved = run_fleetstore(tmp.path(), &["results", "save", "--file", rows_file.to_str().unwrap()]);
    assert_eq!(saved["report"]["inserted"], 3);
    assert_eq!(saved["report"]["dropped"], 1);

    let q = query_id.to_string();
    let count = run_fleetstore(tmp.path(), &["results", "count", "--query", &q]);
    assert_eq!(count["count"], 2);

    let rows = run_fleetstore(tmp.path(), &["results", "rows", "--query", &q]);
    let data: Vec<&Value> = rows["rows"].as_array().unwrap().iter().map(|r| &r["data"]).collect();
    assert_eq!(data, vec![&serde_json::json!({"pid": 1}), &serde_json::json!({"pid": 2})]);

    let h = host_id.to_string();
    let per_host = run_fleetstore(tmp.path(), &["results", "rows", "--query", &q, "--host", &h]);
    assert_eq!(per_host["rows"].as_array().unwrap().len(), 3);
}

#[test]
fn labels_flow_records_and_lists_membership() {
    let tmp = TempDir::new().expect("tempdir");
    let host = run_fleetstore(tmp.path(), &["host", "enroll", "--hostname", "db-1", "--platform", "ubuntu"]);
    let host_id = host["host"]["id"].as_i64().unwrap().to_string();

    let specs = tmp.path().join("labels.json");
    fs::write(
        &specs,
        r#"[{"name":"linux","query":"SELECT 1","platform":"ubuntu"},
            {"name":"dbs","label_membership_type":"manual","hosts":["db-1"]}]"#,
    )
    .unwrap();
    let applied = run_fleetstore(tmp.path(), &["labels", "apply", "--file", specs.to_str().unwrap()]);
    assert_eq!(applied["applied"], 2);

    let exported = run_fleetstore(tmp.path(), &["labels", "specs", "--name", "linux"]);
    assert_eq!(exported["specs"][0]["platform"], "ubuntu");

    let queries = run_fleetstore(tmp.path(), &["labels", "queries", "--host", &host_id]);
    let query_ids: Vec<String> = queries["queries"].as_object().unwrap().keys().cloned().collect();
    assert_eq!(query_ids.len(), 1);

    let matches = tmp.path().join("matches.json");
    fs::write(&matches, format!(r#"{{"{}": true}}"#, query_ids[0])).unwrap();
    let recorded = run_fleetstore(
        tmp.path(),
        &["labels", "record", "--host", &host_id, "--file", matches.to_str().unwrap(), "--at", "42"],
    );
    assert_eq!(recorded["plan"]["updated_at"], 42);

    let labels = run_fleetstore(tmp.path(), &["labels", "for-host", "--host", &host_id]);
    let names: Vec<&str> = labels["labels"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["linux", "dbs"]);

    let shown = run_fleetstore(tmp.path(), &["host", "show", "--id", &host_id]);
    assert_eq!(shown["host"]["label_updated_at"], 42);

    run_fleetstore(tmp.path(), &["host", "delete", "--id", &host_id]);
    let cleaned = run_fleetstore(tmp.path(), &["labels", "cleanup"]);
    assert_eq!(cleaned["removed"], 2);
}

#[test]
fn failures_exit_nonzero_with_message_on_stderr() {
    let tmp = TempDir::new().expect("tempdir");
    let output = Command::new(env!("CARGO_BIN_EXE_fleetstore"))
        .arg("--root")
        .arg(tmp.path())
        .args(["host", "show", "--id", "77"])
        .output()
        .expect("failed to execute fleetstore");
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("host 77"));
}
