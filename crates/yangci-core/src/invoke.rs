//! Validator invocation contract.
//!
//! `java -jar <validator>.jar --path <dir>... -- <yang-file>...`
//! Success is exit code 0; everything else is judged from captured output.

use std::path::Path;

use regex::Regex;
use yangci_adapters::ProcessRunner;
use yangci_model::ValidatorSpec;

/// Matches the quoted version in `java -version` stderr output.
pub const JAVA_VERSION_PATTERN: &str = r#"version "?([0-9][0-9._]*)"#;

pub fn validator_args(spec: &ValidatorSpec, files: &[String]) -> Vec<String> {
    let mut args = vec!["-jar".to_string(), spec.jar.clone()];
    if !spec.model_paths.is_empty() {
        args.push("--path".to_string());
        args.extend(spec.model_paths.iter().cloned());
    }
    args.push("--".to_string());
    args.extend(files.iter().cloned());
    args
}

pub fn normalize_tool_version(raw: &str, pattern: &str) -> Option<String> {
    let re = Regex::new(pattern).ok()?;
    re.captures(raw)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

/// Reports the JVM version the validator would run under, if a JVM is
/// reachable at all.
pub fn java_version(process: &dyn ProcessRunner, spec: &ValidatorSpec, cwd: &Path) -> Option<String> {
    let out = process.run(&spec.java, &["-version".to_string()], cwd).ok()?;
    normalize_tool_version(&out.combined(), JAVA_VERSION_PATTERN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_follow_the_validator_contract() {
        let spec = ValidatorSpec {
            model_paths: vec![
                "yang/standard/ietf/RFC".to_string(),
                "yang/vendor/nokia".to_string(),
            ],
            ..ValidatorSpec::default()
        };
        let args = validator_args(&spec, &["yang/standard/ietf/RFC/ietf-inet-types.yang".to_string()]);
        assert_eq!(
            args,
            vec![
                "-jar",
                "yang-model-validator.jar",
                "--path",
                "yang/standard/ietf/RFC",
                "yang/vendor/nokia",
                "--",
                "yang/standard/ietf/RFC/ietf-inet-types.yang",
            ]
        );
    }

    #[test]
    fn args_without_model_paths_omit_the_flag() {
        let spec = ValidatorSpec::default();
        let args = validator_args(&spec, &["a.yang".to_string(), "b.yang".to_string()]);
        assert_eq!(args, vec!["-jar", "yang-model-validator.jar", "--", "a.yang", "b.yang"]);
    }

    #[test]
    fn java_version_is_normalized() {
        let stderr = "openjdk version \"17.0.2\" 2022-01-18\nOpenJDK Runtime Environment";
        assert_eq!(
            normalize_tool_version(stderr, JAVA_VERSION_PATTERN).as_deref(),
            Some("17.0.2")
        );
        let legacy = "java version \"1.8.0_292\"";
        assert_eq!(
            normalize_tool_version(legacy, JAVA_VERSION_PATTERN).as_deref(),
            Some("1.8.0_292")
        );
        assert_eq!(normalize_tool_version("no jvm here", JAVA_VERSION_PATTERN), None);
    }
}
