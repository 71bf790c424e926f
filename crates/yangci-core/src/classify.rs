//! Failure classification over captured validator output.
//!
//! This is a static lookup table, not an algorithm: rules are scanned in
//! registry order and the first needle contained anywhere in the output
//! assigns the category. Output nothing matches lands in `other`.

use serde::Deserialize;
use yangci_model::{Category, ClassifyRule};

pub const DEFAULT_RULES: &str = include_str!("../config/rules.toml");

#[derive(Debug, Deserialize)]
struct RawRules {
    rules: Vec<RawRule>,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    needle: String,
    category: String,
}

pub fn load_rules(text: &str) -> Result<Vec<ClassifyRule>, String> {
    let raw: RawRules =
        toml::from_str(text).map_err(|err| format!("failed to parse rules: {err}"))?;
    let rules = raw
        .rules
        .into_iter()
        .map(|row| {
            Ok(ClassifyRule {
                needle: row.needle,
                category: Category::parse(&row.category)?,
            })
        })
        .collect::<Result<Vec<_>, String>>()?;
    let errors = validate_rules(&rules);
    if errors.is_empty() {
        Ok(rules)
    } else {
        Err(errors.join("; "))
    }
}

pub fn validate_rules(rules: &[ClassifyRule]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = std::collections::BTreeSet::new();
    for rule in rules {
        if rule.needle.trim().is_empty() {
            errors.push(format!(
                "rule for `{}` has an empty needle",
                rule.category
            ));
            continue;
        }
        if !seen.insert(rule.needle.clone()) {
            errors.push(format!("duplicate needle `{}`", rule.needle));
        }
        if rule.category.is_other() {
            errors.push("`other` is the implicit catch-all; do not map to it".to_string());
        }
    }
    errors
}

/// First matching rule wins; unmatched output is `other`.
pub fn classify(rules: &[ClassifyRule], output: &str) -> Category {
    for rule in rules {
        if output.contains(&rule.needle) {
            return rule.category.clone();
        }
    }
    Category::other()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_rules() -> Vec<ClassifyRule> {
        load_rules(DEFAULT_RULES).expect("default rules parse")
    }

    #[test]
    fn default_rules_are_valid() {
        let rules = default_rules();
        assert!(validate_rules(&rules).is_empty());
        assert!(!rules.is_empty());
    }

    #[test]
    fn known_excerpts_get_the_expected_category() {
        let rules = default_rules();
        let oom = "Exception in thread \"main\" java.lang.OutOfMemoryError: Java heap space";
        assert_eq!(classify(&rules, oom).as_str(), "out_of_memory");

        let unresolved = "org.opendaylight.yangtools.yang.parser.spi.meta.SomeModifiersUnresolvedException: \
             Yang model processing phase EFFECTIVE_MODEL failed";
        assert_eq!(classify(&rules, unresolved).as_str(), "unresolved_modifiers");

        let syntax = "YangSyntaxErrorException: Premature end of file";
        assert_eq!(classify(&rules, syntax).as_str(), "syntax_error");

        let missing = "Imported module [ietf-yang-types] was not found";
        assert_eq!(classify(&rules, missing).as_str(), "missing_dependency");
    }

    #[test]
    fn rule_order_decides_ties() {
        // The OOM excerpt above also says "Exception in thread"; the more
        // specific rule sits earlier and must win.
        let rules = default_rules();
        let text = "Exception in thread \"main\" java.lang.OutOfMemoryError";
        assert_eq!(classify(&rules, text).as_str(), "out_of_memory");
    }

    #[test]
    fn unmatched_output_falls_into_other() {
        let rules = default_rules();
        assert!(classify(&rules, "something nobody anticipated").is_other());
        assert!(classify(&rules, "").is_other());
    }

    #[test]
    fn validation_rejects_duplicates_and_empty_needles() {
        let rules = vec![
            ClassifyRule {
                needle: "x".to_string(),
                category: Category::parse("a").expect("category"),
            },
            ClassifyRule {
                needle: "x".to_string(),
                category: Category::parse("b").expect("category"),
            },
            ClassifyRule {
                needle: "  ".to_string(),
                category: Category::parse("c").expect("category"),
            },
        ];
        let errors = validate_rules(&rules);
        assert_eq!(errors.len(), 2);
    }
}
