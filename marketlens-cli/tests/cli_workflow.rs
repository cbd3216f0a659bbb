//! End-to-end tests for the `marketlens` binary.
//!
//! Each test runs the built binary against a fixture and a config file in a
//! temporary directory, so nothing is read from or written to the home
//! directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{json, Value};
use tempfile::TempDir;

/// Miles per degree of latitude on the sphere used for distances.
const MILES_PER_DEGREE: f64 = 69.0933;

const CENTER_LAT: f64 = 38.6592;
const CENTER_LON: f64 = -90.358;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let workspace = Self { dir };
        workspace.write_config("");
        workspace.write_fixture();
        workspace
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn config_path(&self) -> PathBuf {
        self.path().join("config.ini")
    }

    fn fixture_path(&self) -> PathBuf {
        self.path().join("fixture.json")
    }

    /// Writes a config whose log file stays inside the workspace.
    fn write_config(&self, extra: &str) {
        let log_file = self.path().join("logs").join("marketlens.log");
        let content = format!("[logging]\nfile = {}\n{}", log_file.display(), extra);
        fs::write(self.config_path(), content).unwrap();
    }

    /// Five organizations due north of the center at 2, 5, 9, 11 and 15 miles.
    fn write_fixture(&self) {
        let organization = |id: &str, name: &str, org_type: &str, miles: f64| {
            json!({
                "id": id,
                "name": name,
                "type": org_type,
                "coordinate": {
                    "latitude": CENTER_LAT + miles / MILES_PER_DEGREE,
                    "longitude": CENTER_LON,
                },
            })
        };

        let fixture = json!({
            "organizations": [
                organization("org-15", "Prairie Regional", "hospital", 15.0),
                organization("org-5", "Riverside Clinic", "clinic", 5.0),
                organization("org-11", "Hillcrest Nursing", "skilled nursing", 11.0),
                organization("org-2", "Mercy General", "hospital", 2.0),
                organization("org-9", "Oak Street Clinic", "clinic", 9.0),
            ],
            "identifiers": {
                "org-2": ["NPI-1000000002"],
                "org-9": ["NPI-1000000009", "CCN-260009"],
            },
            "tags": [
                { "scope": { "kind": "session", "id": "cli" }, "entity_id": "org-9", "tag": "competitor" },
            ],
        });

        fs::write(
            self.fixture_path(),
            serde_json::to_string_pretty(&fixture).unwrap(),
        )
        .unwrap();
    }

    fn run(&self, args: &[&str]) -> Output {
        let config = self.config_path();
        Command::new(env!("CARGO_BIN_EXE_marketlens"))
            .arg("--config")
            .arg(&config)
            .args(args)
            .env("RUST_LOG", "warn")
            .output()
            .expect("Failed to execute CLI command")
    }

    fn resolve(&self, extra: &[&str]) -> Output {
        let fixture = self.fixture_path();
        let lat = CENTER_LAT.to_string();
        let lon = CENTER_LON.to_string();
        let mut args = vec![
            "resolve",
            "--lat",
            &lat,
            "--lon",
            &lon,
            "--fixture",
            fixture.to_str().unwrap(),
        ];
        args.extend_from_slice(extra);
        self.run(&args)
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Assert a command succeeded.
fn assert_success(output: &Output, context: &str) {
    if !output.status.success() {
        panic!(
            "{} failed:\nstdout: {}\nstderr: {}",
            context,
            stdout(output),
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

#[test]
fn test_resolve_lists_organizations_within_radius_nearest_first() {
    let ws = Workspace::new();

    let output = ws.resolve(&["--radius", "10"]);
    assert_success(&output, "resolve");

    let text = stdout(&output);
    assert!(text.contains("Organizations: 3"), "{}", text);
    assert!(text.contains("Competitors: 1"), "{}", text);
    assert!(text.contains("With identifiers: 2"), "{}", text);

    let org2 = text.find("org-2 ").unwrap();
    let org5 = text.find("org-5 ").unwrap();
    let org9 = text.find("org-9 ").unwrap();
    assert!(org2 < org5 && org5 < org9, "{}", text);
    assert!(!text.contains("org-11"));
    assert!(!text.contains("org-15"));
}

#[test]
fn test_resolve_uses_configured_default_radius() {
    let ws = Workspace::new();
    ws.write_config("[market]\ndefault_radius_miles = 12\n");

    let output = ws.resolve(&[]);
    assert_success(&output, "resolve");

    let text = stdout(&output);
    assert!(text.contains("Organizations: 4"), "{}", text);
    assert!(text.contains("org-11"));
}

#[test]
fn test_resolve_filters_by_type() {
    let ws = Workspace::new();

    let output = ws.resolve(&["--radius", "20", "--type", "clinic"]);
    assert_success(&output, "resolve --type");

    let text = stdout(&output);
    assert!(text.contains("org-5 "));
    assert!(text.contains("org-9 "));
    assert!(!text.contains("org-2 "));
    assert!(text.contains("Showing 2 of 5"), "{}", text);
}

#[test]
fn test_resolve_applies_tags_in_scope() {
    let ws = Workspace::new();

    let output = ws.resolve(&[
        "--radius",
        "10",
        "--set-tag",
        "org-5=partner",
        "--set-tag",
        "org-9=none",
    ]);
    assert_success(&output, "resolve --set-tag");

    let text = stdout(&output);
    assert!(text.contains("Partners: 1"), "{}", text);
    assert!(text.contains("Competitors: 0"), "{}", text);
}

#[test]
fn test_resolve_other_scope_does_not_see_session_tags() {
    let ws = Workspace::new();

    let output = ws.resolve(&["--radius", "10", "--scope", "market:m-1"]);
    assert_success(&output, "resolve --scope");

    assert!(stdout(&output).contains("Competitors: 0"));
}

#[test]
fn test_resolve_json_output() {
    let ws = Workspace::new();

    let output = ws.resolve(&["--radius", "10", "--format", "json"]);
    assert_success(&output, "resolve --format json");

    let view: Value = serde_json::from_slice(&output.stdout).unwrap();
    let ids: Vec<&str> = view["entities"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["organization"]["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["org-2", "org-5", "org-9"]);
    assert_eq!(view["radius_miles"], json!(10.0));
}

#[test]
fn test_resolve_geojson_output_excludes_anchor() {
    let ws = Workspace::new();

    let output = ws.resolve(&["--radius", "10", "--anchor", "org-2", "--format", "geojson"]);
    assert_success(&output, "resolve --format geojson");

    let layers: Value = serde_json::from_slice(&output.stdout).unwrap();
    let radius = &layers["radius"]["features"][0]["geometry"];
    assert_eq!(radius["type"], "Polygon");
    assert_eq!(radius["coordinates"][0].as_array().unwrap().len(), 65);

    let points = layers["entities"]["features"].as_array().unwrap();
    assert_eq!(points.len(), 2);
    assert!(points.iter().all(|f| f["id"] != "org-2"));
}

#[test]
fn test_resolve_rejects_radius_above_maximum() {
    let ws = Workspace::new();

    let output = ws.resolve(&["--radius", "150"]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("radius"), "{}", stderr);
}

#[test]
fn test_resolve_reports_missing_fixture() {
    let ws = Workspace::new();
    fs::remove_file(ws.fixture_path()).unwrap();

    let output = ws.resolve(&["--radius", "10"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to load fixture"));
}

#[test]
fn test_resolve_reports_invalid_config() {
    let ws = Workspace::new();
    ws.write_config("[map]\npolygon_points = 2\n");

    let output = ws.resolve(&["--radius", "10"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("polygon_points"));
}

#[test]
fn test_config_init_then_show() {
    let ws = Workspace::new();
    fs::remove_file(ws.config_path()).unwrap();

    let output = ws.run(&["config", "init"]);
    assert_success(&output, "config init");
    assert!(stdout(&output).contains("Created"));
    assert!(ws.config_path().exists());

    let output = ws.run(&["config", "init"]);
    assert_success(&output, "config init (again)");
    assert!(stdout(&output).contains("already exists"));

    let output = ws.run(&["config", "show"]);
    assert_success(&output, "config show");
    let text = stdout(&output);
    assert!(text.contains("[market]"));
    assert!(text.contains("max_radius_miles = 100"));
}

#[test]
fn test_config_path_prints_override() {
    let ws = Workspace::new();

    let output = ws.run(&["config", "path"]);
    assert_success(&output, "config path");

    assert_eq!(
        stdout(&output).trim(),
        ws.config_path().display().to_string()
    );
}
