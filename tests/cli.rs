use assert_cmd::prelude::*;
use predicates::str::contains;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn write_sketch(source: &str) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().expect("temp sketch");
    tmp.write_all(source.as_bytes()).expect("write sketch");
    tmp
}

#[test]
fn cli_runs_frames_and_prints_lighting_uniforms() {
    let sketch = write_sketch(
        r#"
function setup()
  print("setup done")
end

function draw()
  ambientLight(150)
  directionalLight(250, 250, 250, 0.5, -0.5, 0.25)
  pointLight(250, 250, 250, createVector(0, 0, 0))
end
"#,
    );
    let mut cmd = Command::cargo_bin("sketch-runtime").expect("binary exists");
    cmd.arg(sketch.path())
        .arg("--frames")
        .arg("3")
        .arg("--summary-only");
    cmd.assert()
        .success()
        .stdout(contains("[Lua] setup done"))
        .stdout(contains("Ran 3 frame(s)"))
        .stdout(contains("Lights: ambient=1 directional=1 point=1"))
        .stdout(contains(" - uAmbientColor[0] = (0.59, 0.59, 0.59)"))
        .stdout(contains(" - uDirectionalLightCount = 1"))
        .stdout(contains(" - uLightingDirection[0] = (0.50, -0.50, 0.25)"))
        .stdout(contains(" - uPointLightLocation[0] = (0.00, 0.00, 0.00)"))
        .stdout(contains(" - uMaterialColor = (1.00, 1.00, 1.00, 1.00)"));
}

#[test]
fn cli_reports_bad_light_arguments() {
    let sketch = write_sketch(
        r#"
function draw()
  pointLight(250, 250, 250, "not-a-vector")
end
"#,
    );
    let mut cmd = Command::cargo_bin("sketch-runtime").expect("binary exists");
    cmd.arg(sketch.path()).arg("--summary-only");
    cmd.assert()
        .failure()
        .stderr(contains("expected x, y, z numbers or a vector, got string"));
}

#[test]
fn cli_rejects_unknown_flags() {
    let sketch = write_sketch("");
    let mut cmd = Command::cargo_bin("sketch-runtime").expect("binary exists");
    cmd.arg(sketch.path()).arg("--run-scripts");
    cmd.assert()
        .failure()
        .stderr(contains("Unknown argument: --run-scripts"));
}
