use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Connection, SqliteConnection};
use tempfile::TempDir;

const FORMAT: &str = r#"{
    "column_types": { "age": "int", "active": "bool" },
    "column_mapping": {
        "name": "§SPLIT§ §first_name§last_name",
        "age": "age",
        "active": "active",
        "gender": "gender",
        "note": "§DISCARD"
    },
    "target_frame_columns": {
        "first_name": "str",
        "last_name": "str",
        "age": "int",
        "active": "bool",
        "gender": "gender"
    }
}"#;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sources")).unwrap();
        fs::write(dir.path().join("format.json"), FORMAT).unwrap();
        fs::write(
            dir.path().join("sources/members.csv"),
            "name;age;active;gender;note\n\
             Leon Becker;34;yes;male;first\n\
             Anna Roth;abc;no;female;second\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("sources/more.xml"),
            "<data><row><name>Mia Klein</name><age>39</age><active>1</active>\
             <gender>F</gender></row></data>",
        )
        .unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn command(&self, output: &Path) -> Command {
        let mut cmd = Command::cargo_bin("recast").unwrap();
        cmd.arg(self.path("sources"))
            .arg("--config")
            .arg(self.path("format.json"))
            .arg("--output")
            .arg(output);
        cmd
    }
}

#[test]
fn skip_policy_writes_csv() {
    let fixture = Fixture::new();
    let output = fixture.path("out.csv");

    fixture
        .command(&output)
        .args(["--policy", "skip"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Source data rows"))
        .stdout(predicate::str::contains("33.33%"));

    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "first_name;last_name;age;active;gender\n\
         Leon;Becker;34;1;M\n\
         Mia;Klein;39;1;F\n"
    );
}

#[test]
fn null_policy_keeps_row() {
    let fixture = Fixture::new();
    let output = fixture.path("out.json");

    fixture
        .command(&output)
        .args(["--policy", "null"])
        .assert()
        .success();

    let records: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[1]["first_name"], "Anna");
    assert_eq!(records[1]["age"], serde_json::Value::Null);
    assert_eq!(records[1]["active"], "0");
    assert_eq!(records[1]["gender"], "F");
}

#[test]
fn fail_policy_aborts() {
    let fixture = Fixture::new();
    let output = fixture.path("out.csv");

    fixture
        .command(&output)
        .args(["--policy", "fail"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("column 'age'"))
        .stderr(predicate::str::contains("'abc'"));

    assert!(!output.exists());
}

#[test]
fn interactive_replacement_from_stdin() {
    let fixture = Fixture::new();
    let output = fixture.path("out.csv");

    fixture
        .command(&output)
        .write_stdin("x\ne\n27\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[r]emove the row or [e]nter a new value"))
        .stdout(predicate::str::contains("Invalid choice"));

    let written = fs::read_to_string(&output).unwrap();
    assert!(written.contains("Anna;Roth;27;0;F\n"));
}

#[test]
fn interactive_with_closed_stdin_fails() {
    let fixture = Fixture::new();
    let output = fixture.path("out.csv");

    fixture
        .command(&output)
        .write_stdin("")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Operator channel closed"));
}

#[test]
fn sqlite_output_with_table_name() {
    let fixture = Fixture::new();
    let output = fixture.path("members.out");

    fixture
        .command(&output)
        .args(["--policy", "skip", "--format", "sqlite", "--table-name", "members"])
        .assert()
        .success();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let rows: Vec<(String, String, i64, i64, String)> = runtime.block_on(async {
        let options = SqliteConnectOptions::new().filename(&output);
        let mut conn = SqliteConnection::connect_with(&options).await.unwrap();
        sqlx::query_as(
            "SELECT first_name, last_name, age, active, gender FROM members ORDER BY rowid",
        )
        .fetch_all(&mut conn)
        .await
        .unwrap()
    });

    assert_eq!(
        rows,
        vec![
            ("Leon".into(), "Becker".into(), 34, 1, "M".into()),
            ("Mia".into(), "Klein".into(), 39, 1, "F".into()),
        ]
    );
}

#[test]
fn stats_file_is_written() {
    let fixture = Fixture::new();
    let output = fixture.path("out.xml");
    let stats = fixture.path("stats.txt");

    fixture
        .command(&output)
        .args(["--policy", "skip", "--stats-file"])
        .arg(&stats)
        .assert()
        .success();

    let text = fs::read_to_string(&stats).unwrap();
    assert!(text.contains("Target data rows"));
    assert!(fs::read_to_string(&output).unwrap().contains("<first_name>Mia</first_name>"));
}

#[test]
fn undeclared_target_is_rejected() {
    let fixture = Fixture::new();
    fs::write(
        fixture.path("format.json"),
        r#"{
            "column_types": {},
            "column_mapping": { "name": "full_name" },
            "target_frame_columns": { "first_name": "str" }
        }"#,
    )
    .unwrap();

    fixture
        .command(&fixture.path("out.csv"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("full_name"));
}

#[test]
fn missing_source_dir_fails() {
    let fixture = Fixture::new();
    Command::cargo_bin("recast")
        .unwrap()
        .arg(fixture.path("nowhere"))
        .arg("--config")
        .arg(fixture.path("format.json"))
        .arg("--output")
        .arg(fixture.path("out.csv"))
        .args(["--policy", "skip"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Cannot read source directory"));
}
