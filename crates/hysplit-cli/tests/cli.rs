use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const TRAJECTORY_TEMPLATE: &str = "24 01 01 00
1
42.5 -73.8 250.0
6
0
10000.0
1
/home/xcite/hysplit/met/
hysplit.hrrr.20231231.06z-20240101.00z.sml
./
tdump
";

const CONCENTRATION_TEMPLATE: &str = "24 01 01 00
1
42.5 -73.8 250.0
6
0
10000.0
1
/home/xcite/hysplit/met/
hysplit.hrrr.20231231.06z-20240101.00z.sml
1
PM25
1.0
1.0
00 00 00 00 00
1
0.0 0.0
0.05 0.05
30.0 30.0
./
cdump
2
0 100
00 00 00 00 00
00 00 00 00 00
00 01 00
1
0.006 0.0064 0.8 1.0
0.0 0.0 0.0 0.0 0.0
0.0 0.0 0.0
0.0
0.0
";

#[test]
fn bind_prints_a_control_bound_to_the_release() {
    let temp = TempDir::new().expect("tempdir should be created");
    let template = temp.path().join("CONTROL_single_traj");
    write_file(&template, TRAJECTORY_TEMPLATE);

    let output = run_cli(&[
        "bind",
        "--template",
        path_arg(&template),
        "--kind",
        "single",
        "--lat",
        "40.766",
        "--lon",
        "-111.848",
        "--height",
        "500",
        "--records",
        "12",
        "--time",
        "2024-03-01 12",
        "--direction",
        "bwd",
    ]);

    assert!(
        output.status.success(),
        "bind should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines = stdout.lines().collect::<Vec<_>>();
    assert_eq!(lines[0], "24 03 01 12");
    assert_eq!(lines[2], "40.766 -111.848 500.0");
    assert_eq!(lines[3], "-12");
    assert_eq!(lines.last().copied(), Some("tdump"));
}

#[test]
fn bind_reports_missing_template_as_io_failure() {
    let temp = TempDir::new().expect("tempdir should be created");
    let output = run_cli(&[
        "bind",
        "--template",
        path_arg(&temp.path().join("missing")),
        "--lat",
        "40.0",
        "--lon",
        "-111.0",
        "--records",
        "6",
        "--time",
        "2024-01-01 00",
    ]);

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: [IO.CONTROL_READ]"), "stderr: {stderr}");
    assert!(stderr.contains("FATAL EXIT CODE: 3"), "stderr: {stderr}");
}

#[test]
fn malformed_release_time_is_a_usage_error() {
    let output = run_cli(&[
        "bind",
        "--template",
        "CONTROL",
        "--lat",
        "40.0",
        "--lon",
        "-111.0",
        "--records",
        "6",
        "--time",
        "2024-01-01",
    ]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("INPUT.CLI_USAGE"));
}

#[test]
fn help_exits_zero() {
    let output = run_cli(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("postprocess"));
    assert!(stdout.contains("contours"));
}

#[test]
fn metadata_prints_the_stored_document() {
    let temp = TempDir::new().expect("tempdir should be created");
    let store = temp.path().join("store");
    write_file(
        &store.join("42_fwd").join("metadata.json"),
        r#"{"release_time":"2024-01-01 00:00:00","times":["2024-01-01T00:00:00Z"]}"#,
    );

    let output = run_cli(&["metadata", "--id", "42_fwd", "--store-dir", path_arg(&store)]);

    assert!(output.status.success());
    let parsed: Value =
        serde_json::from_slice(&output.stdout).expect("metadata output should be JSON");
    assert_eq!(parsed["release_time"], "2024-01-01 00:00:00");
}

#[test]
fn metadata_for_unknown_simulation_is_an_input_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let output = run_cli(&[
        "metadata",
        "--id",
        "nope_fwd",
        "--store-dir",
        path_arg(temp.path()),
    ]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("INPUT.METADATA_MISSING"));
}

#[test]
fn contours_prints_the_stored_topology() {
    let temp = TempDir::new().expect("tempdir should be created");
    let store = temp.path().join("store");
    write_file(
        &store.join("42_bwd").join("contours").join("height1_time3.json"),
        r#"{"type":"Topology","objects":{}}"#,
    );

    let output = run_cli(&[
        "contours",
        "--id",
        "42_bwd",
        "--height",
        "1",
        "--time",
        "3",
        "--store-dir",
        path_arg(&store),
    ]);

    assert!(output.status.success());
    let parsed: Value =
        serde_json::from_slice(&output.stdout).expect("contour output should be JSON");
    assert_eq!(parsed["type"], "Topology");
}

#[test]
fn contours_for_missing_slice_is_an_input_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let output = run_cli(&[
        "contours",
        "--id",
        "42_bwd",
        "--height",
        "0",
        "--time",
        "9",
        "--store-dir",
        path_arg(temp.path()),
    ]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("INPUT.CONTOUR_MISSING"), "stderr: {stderr}");
}

#[test]
fn config_directories_resolve_beside_the_config_file() {
    let temp = TempDir::new().expect("tempdir should be created");
    let deploy = temp.path().join("deploy");
    write_file(&deploy.join("pipeline.json"), r#"{ "storeDir": "store" }"#);
    write_file(
        &deploy.join("store").join("7_fwd").join("metadata.json"),
        r#"{"release_time":"2024-05-01 12:00:00","times":[]}"#,
    );

    let output = run_cli(&[
        "metadata",
        "--id",
        "7_fwd",
        "--config",
        path_arg(&deploy.join("pipeline.json")),
    ]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let parsed: Value =
        serde_json::from_slice(&output.stdout).expect("metadata output should be JSON");
    assert_eq!(parsed["release_time"], "2024-05-01 12:00:00");
}

#[test]
fn postprocess_without_site_controls_fails() {
    let temp = TempDir::new().expect("tempdir should be created");
    let output = run_cli(&[
        "postprocess",
        "--site",
        "WBB",
        "--direction",
        "fwd",
        "--data-dir",
        path_arg(temp.path()),
        "--store-dir",
        path_arg(&temp.path().join("store")),
    ]);

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("CONTROL.001_WBB"), "stderr: {stderr}");
    assert!(!temp.path().join("store").exists());
}

#[test]
fn invalid_config_file_is_rejected_before_running() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = temp.path().join("pipeline.json");
    write_file(&config, r#"{ "contourLadder": [-5, -11] }"#);

    let output = run_cli(&[
        "run",
        "--lat",
        "40.0",
        "--lon",
        "-111.0",
        "--records",
        "6",
        "--time",
        "2024-01-01 00",
        "--config",
        path_arg(&config),
    ]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("INPUT.CONFIG_LADDER"));
}

#[cfg(unix)]
#[test]
fn failing_model_reports_each_direction() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().expect("tempdir should be created");
    let templates = temp.path().join("templates");
    write_file(&templates.join("CONTROL_single_traj"), TRAJECTORY_TEMPLATE);
    write_file(&templates.join("CONTROL_ens_traj"), TRAJECTORY_TEMPLATE);
    write_file(&templates.join("CONTROL_conc"), CONCENTRATION_TEMPLATE);
    write_file(&templates.join("SETUP.trj.CFG"), "&SETUP\n/\n");
    write_file(&templates.join("ASCDATA.CFG"), "-90.0 -180.0\n");
    let model = temp.path().join("bin").join("model");
    write_file(&model, "#!/bin/sh\nexit 132\n");
    let mut permissions = fs::metadata(&model).expect("model metadata").permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&model, permissions).expect("model should be executable");

    let config = temp.path().join("pipeline.json");
    let model = model.display().to_string();
    write_file(
        &config,
        &serde_json::json!({
            "templateDir": templates,
            "dataDir": temp.path().join("data"),
            "storeDir": temp.path().join("store"),
            "launcher": null,
            "commands": {
                "singleTrajectory": model,
                "ensembleTrajectory": model,
                "concentration": model,
            },
        })
        .to_string(),
    );

    let output = run_cli(&[
        "run",
        "--lat",
        "40.0",
        "--lon",
        "-111.0",
        "--records",
        "6",
        "--time",
        "2024-01-01 00",
        "--id",
        "demo",
        "--config",
        path_arg(&config),
    ]);

    assert_eq!(output.status.code(), Some(1));
    let parsed: Value = serde_json::from_slice(&output.stdout).expect("run output should be JSON");
    assert_eq!(parsed["fwd"]["id"], "demo_fwd");
    assert_eq!(parsed["bwd"]["id"], "demo_bwd");
    assert!(
        parsed["fwd"]["error"]
            .as_str()
            .is_some_and(|error| error.contains("RUN.SIMULATION_FAILED"))
    );
    assert!(temp.path().join("data/demo_fwd/fwd/CONTROL").is_file());
    assert!(temp.path().join("data/demo_bwd/bwd/CONTROL").is_file());
}

fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hysplit-web"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("binary should run")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent dir should be created");
    }
    fs::write(path, content).expect("file should be written");
}
