use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use filetime::{set_file_mtime, FileTime};
use predicates::prelude::*;

fn flexdeps() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("flexdeps"))
}

/// `LibA` (sources only, never built) and `App1` (an application importing
/// `com.a.*`, with an up-to-date artifact of its own).
fn scenario() -> TempDir {
    let temp = TempDir::new().unwrap();
    for class in ["X", "Y", "Z"] {
        temp.child(format!("LibA/src/com/a/{class}.as"))
            .write_str(&format!("package com.a {{\n  public class {class} {{}}\n}}\n"))
            .unwrap();
    }
    temp.child("App1/src/Main.mxml")
        .write_str(
            r#"<?xml version="1.0"?>
<s:Application xmlns:s="library://ns.adobe.com/flex/spark" xmlns:fx="http://ns.adobe.com/mxml/2009">
  <fx:Script><![CDATA[
    import com.a.*;
  ]]></fx:Script>
</s:Application>
"#,
        )
        .unwrap();
    for source in [
        "LibA/src/com/a/X.as",
        "LibA/src/com/a/Y.as",
        "LibA/src/com/a/Z.as",
        "App1/src/Main.mxml",
    ] {
        set_file_mtime(temp.child(source).path(), FileTime::from_unix_time(1_000, 0)).unwrap();
    }
    build(&temp, "App1/bin/Main.swf");
    temp
}

fn build(temp: &TempDir, artifact: &str) {
    let artifact = temp.child(artifact);
    artifact.write_binary(b"").unwrap();
    set_file_mtime(artifact.path(), FileTime::from_unix_time(2_000, 0)).unwrap();
}

fn json_stdout(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
        panic!(
            "invalid JSON ({err}); stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

#[test]
fn help_mentions_core_commands() {
    flexdeps().arg("--help").assert().success().stdout(
        predicate::str::contains("index")
            .and(predicate::str::contains("resolve"))
            .and(predicate::str::contains("must-build"))
            .and(predicate::str::contains("invalidate"))
            .and(predicate::str::contains("imports")),
    );
}

#[test]
fn index_writes_the_cache_file() {
    let temp = scenario();

    let output = flexdeps()
        .arg("index")
        .arg(temp.path())
        .arg("--json")
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let v = json_stdout(&output);
    let records = v["index"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0]["artifact_path"]
        .as_str()
        .unwrap()
        .ends_with("liba.swc"));
    temp.child(".flexdeps-index.json")
        .assert(predicate::path::is_file());
}

#[test]
fn resolve_lists_library_artifact() {
    let temp = scenario();

    flexdeps()
        .arg("resolve")
        .arg(temp.child("App1").path())
        .assert()
        .success()
        .stdout(predicate::str::contains("liba.swc"));
}

#[test]
fn must_build_exit_code_reflects_verdict() {
    let temp = scenario();

    let output = flexdeps()
        .arg("must-build")
        .arg(temp.child("App1").path())
        .arg("--json")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let v = json_stdout(&output);
    assert_eq!(v["must_build"], true);
    assert_eq!(v["reason"]["reason"], "stale_dependency");

    build(&temp, "LibA/bin/liba.swc");
    flexdeps()
        .arg("must-build")
        .arg(temp.child("App1").path())
        .assert()
        .code(0)
        .stdout(predicate::str::contains("up to date"));
}

#[test]
fn invalidate_removes_artifacts_and_cache() {
    let temp = scenario();
    build(&temp, "LibA/bin/liba.swc");

    let output = flexdeps()
        .arg("invalidate")
        .arg(temp.child("App1").path())
        .arg("--json")
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let v = json_stdout(&output);
    assert_eq!(v["removed_artifacts"].as_array().unwrap().len(), 2);
    assert_eq!(v["index_removed"], true);
    temp.child("LibA/bin/liba.swc")
        .assert(predicate::path::missing());
    temp.child("App1/bin/Main.swf")
        .assert(predicate::path::missing());
    temp.child(".flexdeps-index.json")
        .assert(predicate::path::missing());
}

#[test]
fn imports_are_sorted() {
    let temp = TempDir::new().unwrap();
    temp.child("src/B.as")
        .write_str("import mx.core.UIComponent;\nimport com.z.Zed;\n")
        .unwrap();
    temp.child("src/A.as")
        .write_str("import com.a.*;\nimport mx.core.UIComponent;\n")
        .unwrap();

    flexdeps()
        .arg("imports")
        .arg(temp.child("src").path())
        .assert()
        .success()
        .stdout("com.a.*\ncom.z.Zed\nmx.core.UIComponent\n");
}

#[test]
fn unreadable_workspace_is_an_error() {
    let temp = TempDir::new().unwrap();

    flexdeps()
        .arg("index")
        .arg(temp.child("missing").path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("failed to read workspace"));
}

#[test]
fn invalid_config_is_an_error() {
    let temp = scenario();
    temp.child("flexdeps.toml")
        .write_str("[layout]\nbogus = true\n")
        .unwrap();

    flexdeps()
        .arg("index")
        .arg(temp.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("failed to load config"));
}

#[test]
fn quiet_silences_ambiguous_source_roots() {
    let temp = TempDir::new().unwrap();
    temp.child("Lib/a/src/com/a/X.as")
        .write_str("package com.a { public class X {} }")
        .unwrap();
    temp.child("Lib/b/src/com/b/Y.as")
        .write_str("package com.b { public class Y {} }")
        .unwrap();

    flexdeps()
        .arg("must-build")
        .arg(temp.child("Lib").path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("multiple source roots found"));

    flexdeps()
        .arg("--quiet")
        .arg("must-build")
        .arg(temp.child("Lib").path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("multiple source roots").not());
}
