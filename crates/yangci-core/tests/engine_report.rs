// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::path::Path;

use yangci_adapters::{
    AdapterError, Capabilities, CapturedOutput, ProcessRunner, RealFs,
};
use yangci_core::{classify, report, run_validation, RunOptions, RunRequest};
use yangci_model::{FileStatus, RunId, ValidatorSpec};

/// Pretends to be the JVM: the last argument is the YANG file under test
/// and its name decides the outcome.
struct ScriptedValidator;

impl ProcessRunner for ScriptedValidator {
    fn run(
        &self,
        program: &str,
        args: &[String],
        _cwd: &Path,
    ) -> Result<CapturedOutput, AdapterError> {
        assert_eq!(program, "java");
        assert_eq!(args[0], "-jar");
        let separator = args.iter().position(|a| a == "--").expect("separator");
        let files = &args[separator + 1..];
        if files.iter().any(|f| f.contains("broken")) {
            return Ok(CapturedOutput {
                code: 1,
                stdout: String::new(),
                stderr: "SomeModifiersUnresolvedException: EFFECTIVE_MODEL failed".to_string(),
            });
        }
        if files.iter().any(|f| f.contains("missing-jvm")) {
            return Err(AdapterError::Process {
                program: program.to_string(),
                detail: "No such file or directory".to_string(),
            });
        }
        Ok(CapturedOutput {
            code: 0,
            stdout: format!("validated {}", files.join(" ")),
            stderr: String::new(),
        })
    }
}

fn scratch_corpus() -> (tempfile::TempDir, std::path::PathBuf, std::path::PathBuf) {
    let scratch = tempfile::tempdir().expect("tempdir");
    let corpus_root = scratch.path().join("corpus");
    let logs_root = scratch.path().join("logs");
    fs::create_dir_all(corpus_root.join("yang/standard/ietf/RFC")).expect("mkdir");
    fs::write(
        corpus_root.join("yang/standard/ietf/RFC/clean.yang"),
        "module clean {}",
    )
    .expect("write");
    fs::write(
        corpus_root.join("yang/standard/ietf/RFC/broken.yang"),
        "module broken {",
    )
    .expect("write");
    fs::write(
        corpus_root.join("yang/standard/ietf/RFC/missing-jvm.yang"),
        "module unreachable {}",
    )
    .expect("write");
    (scratch, corpus_root, logs_root)
}

fn request(corpus_root: &Path, logs_root: &Path) -> RunRequest {
    RunRequest {
        corpus_root: corpus_root.to_path_buf(),
        logs_root: logs_root.to_path_buf(),
        run_id: Some(RunId::parse("engine_test").expect("run id")),
        capabilities: Capabilities::from_cli_flags(true, true, false, false),
        command: Some("yangci validate".to_string()),
        subdir: None,
        delete_passing_logs: false,
        timestamp: Some(1_700_000_000),
    }
}

#[test]
fn full_run_classifies_persists_and_aggregates() {
    let (_scratch, corpus_root, logs_root) = scratch_corpus();
    let rules = classify::load_rules(classify::DEFAULT_RULES).expect("rules");

    let report_out = run_validation(
        &ScriptedValidator,
        &RealFs,
        &request(&corpus_root, &logs_root),
        &ValidatorSpec::default(),
        &rules,
        &RunOptions::default(),
    )
    .expect("run");

    assert_eq!(report_out.summary.total, 3);
    assert_eq!(report_out.summary.passed, 1);
    assert_eq!(report_out.summary.failed, 1);
    assert_eq!(report_out.summary.errors, 1);

    assert_eq!(report_out.categories.get("unresolved_modifiers"), Some(&1));
    assert_eq!(report_out.categories.get("other"), Some(&1));

    let broken = report_out
        .outcomes
        .iter()
        .find(|o| o.path.ends_with("broken.yang"))
        .expect("broken outcome");
    assert_eq!(broken.status, FileStatus::Fail);
    assert_eq!(broken.exit_code, Some(1));
    let broken_log = broken.log.as_deref().expect("log name");
    assert!(broken_log.starts_with("unresolved_modifiers.yang-model-validator--broken."));
    assert!(broken_log.ends_with(".1700000000.log"));

    let spawn_error = report_out
        .outcomes
        .iter()
        .find(|o| o.path.ends_with("missing-jvm.yang"))
        .expect("error outcome");
    assert_eq!(spawn_error.status, FileStatus::Error);
    assert_eq!(spawn_error.exit_code, None);

    // Logs and category files land under <logs_root>/<run_id>/.
    let run_dir = logs_root.join("engine_test");
    let log_text = fs::read_to_string(run_dir.join(broken_log)).expect("log file");
    assert!(log_text.starts_with("$ java -jar yang-model-validator.jar"));
    assert!(log_text.contains("SomeModifiersUnresolvedException"));

    let category_file =
        fs::read_to_string(run_dir.join("unresolved_modifiers.txt")).expect("category file");
    assert_eq!(category_file, "yang/standard/ietf/RFC/broken.yang\n");
    let other_file = fs::read_to_string(run_dir.join("other.txt")).expect("other file");
    assert_eq!(other_file, "yang/standard/ietf/RFC/missing-jvm.yang\n");

    assert_eq!(report::exit_code_for_report(&report_out), 3);
}

#[test]
fn delete_passing_logs_drops_only_passing_logs() {
    let (_scratch, corpus_root, logs_root) = scratch_corpus();
    let rules = classify::load_rules(classify::DEFAULT_RULES).expect("rules");

    let mut req = request(&corpus_root, &logs_root);
    req.run_id = Some(RunId::parse("engine_test_prunelogs").expect("run id"));
    req.delete_passing_logs = true;

    let report_out = run_validation(
        &ScriptedValidator,
        &RealFs,
        &req,
        &ValidatorSpec::default(),
        &rules,
        &RunOptions::default(),
    )
    .expect("run");

    let clean = report_out
        .outcomes
        .iter()
        .find(|o| o.path.ends_with("clean.yang"))
        .expect("clean outcome");
    assert_eq!(clean.status, FileStatus::Pass);
    assert!(clean.log.is_none());
    assert!(clean.log_sha256.is_none());

    let run_dir = logs_root.join("engine_test_prunelogs");
    let kept: Vec<_> = fs::read_dir(&run_dir)
        .expect("run dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().to_string())
        .collect();
    assert!(kept.iter().all(|name| !name.contains("--clean.")));
    assert!(kept.iter().any(|name| name.contains("--broken.")));
}

#[test]
fn subdir_filter_and_fail_fast_bound_the_run() {
    let (_scratch, corpus_root, logs_root) = scratch_corpus();
    fs::create_dir_all(corpus_root.join("yang/experimental")).expect("mkdir");
    fs::write(
        corpus_root.join("yang/experimental/broken-too.yang"),
        "module broken-too {",
    )
    .expect("write");
    let rules = classify::load_rules(classify::DEFAULT_RULES).expect("rules");

    let mut req = request(&corpus_root, &logs_root);
    req.run_id = Some(RunId::parse("engine_test_subdir").expect("run id"));
    req.subdir = Some("yang/experimental".to_string());

    let report_out = run_validation(
        &ScriptedValidator,
        &RealFs,
        &req,
        &ValidatorSpec::default(),
        &rules,
        &RunOptions {
            fail_fast: true,
            max_failures: None,
        },
    )
    .expect("run");

    assert_eq!(report_out.summary.total, 1);
    assert_eq!(report_out.summary.failed, 1);
    assert_eq!(
        report_out.outcomes[0].path,
        "yang/experimental/broken-too.yang"
    );
}

#[test]
fn batching_shares_one_process_across_the_chunk() {
    let (_scratch, corpus_root, logs_root) = scratch_corpus();
    let rules = classify::load_rules(classify::DEFAULT_RULES).expect("rules");

    let mut req = request(&corpus_root, &logs_root);
    req.run_id = Some(RunId::parse("engine_test_batch").expect("run id"));
    let spec = ValidatorSpec {
        batch_size: 3,
        ..ValidatorSpec::default()
    };

    // The batch contains broken.yang, so every member is marked failed by
    // the shared process result.
    let report_out = run_validation(
        &ScriptedValidator,
        &RealFs,
        &req,
        &spec,
        &rules,
        &RunOptions::default(),
    )
    .expect("run");

    assert_eq!(report_out.summary.total, 3);
    assert_eq!(report_out.summary.failed, 3);
    let logs: std::collections::BTreeSet<_> = report_out
        .outcomes
        .iter()
        .filter_map(|o| o.log.clone())
        .collect();
    assert_eq!(logs.len(), 1, "one shared log per batch");
    assert!(logs.iter().next().expect("log").contains("batch_0000"));
}
