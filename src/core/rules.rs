//! Exercise rule evaluation.
//!
//! Each rule in an `ExerciseRules` block turns into findings with a
//! stable rule id, so reports stay diffable across runs:
//! `class.required`, `method.required`, `element.disallowed`,
//! `method.length`, `method.complexity`, `scope.undeclared`.
//! Required checks always emit a finding (passed or failed); threshold
//! checks only emit warnings for violations.

use regex::Regex;
use tracing::debug;

use crate::core::analyze::Finding;
use crate::infra::config::{ExerciseRules, RequiredMethod};
use crate::infra::line_index::NewlineIndex;
use crate::parsers::java_parser::{JavaSymbol, JavaSymbolKind, SourceAnalysis};

pub struct RuleEngine<'a> {
    rules: &'a ExerciseRules,
}

impl<'a> RuleEngine<'a> {
    pub fn new(rules: &'a ExerciseRules) -> Self {
        Self { rules }
    }

    /// Evaluate every configured rule against one analyzed source file.
    pub fn evaluate(&self, analysis: &SourceAnalysis, source: &str) -> Vec<Finding> {
        let mut findings = Vec::new();

        self.check_required_classes(analysis, &mut findings);
        self.check_required_methods(analysis, &mut findings);
        self.check_disallowed_elements(source, &mut findings);
        self.check_method_length(analysis, &mut findings);
        self.check_complexity(analysis, &mut findings);
        self.check_variable_scope(analysis, &mut findings);

        debug!(count = findings.len(), "rule evaluation complete");
        findings
    }

    fn check_required_classes(&self, analysis: &SourceAnalysis, findings: &mut Vec<Finding>) {
        for class in &self.rules.required_classes {
            let declared = analysis.symbols.iter().any(|s| {
                matches!(s.kind, JavaSymbolKind::Class | JavaSymbolKind::Interface)
                    && &s.name == class
            });

            findings.push(if declared {
                Finding::passed("class.required", format!("Class '{class}' is declared"))
            } else {
                Finding::failed(
                    "class.required",
                    format!("Required class '{class}' is missing"),
                )
            });
        }
    }

    fn check_required_methods(&self, analysis: &SourceAnalysis, findings: &mut Vec<Finding>) {
        for required in &self.rules.required_methods {
            findings.push(match best_method_match(analysis, required) {
                MethodMatch::Found(sym) => Finding::passed(
                    "method.required",
                    format!("Method '{}' is declared", required.name),
                )
                .at(sym.start_line, 1),
                MethodMatch::WrongSignature(sym, detail) => Finding::failed(
                    "method.required",
                    format!("Method '{}' has the wrong signature", required.name),
                )
                .with_message(detail)
                .at(sym.start_line, 1),
                MethodMatch::Missing => Finding::failed(
                    "method.required",
                    format!("Required method '{}' is missing", required.name),
                ),
            });
        }
    }

    fn check_disallowed_elements(&self, source: &str, findings: &mut Vec<Finding>) {
        let index = NewlineIndex::build(source.as_bytes());

        for pattern in &self.rules.disallowed_elements {
            let regex = match Regex::new(pattern) {
                Ok(r) => r,
                Err(err) => {
                    findings.push(
                        Finding::warning(
                            "rule.invalid",
                            format!("Disallowed-element pattern '{pattern}' is not a valid regex"),
                        )
                        .with_message(err.to_string()),
                    );
                    continue;
                }
            };

            match regex.find(source) {
                Some(m) => {
                    let (line, column) = index.line_col(m.start());
                    findings.push(
                        Finding::failed(
                            "element.disallowed",
                            format!("Disallowed element '{pattern}' is used"),
                        )
                        .with_message(format!("matched '{}'", m.as_str().trim()))
                        .at(line, column),
                    );
                }
                None => findings.push(Finding::passed(
                    "element.disallowed",
                    format!("Disallowed element '{pattern}' is absent"),
                )),
            }
        }
    }

    fn check_method_length(&self, analysis: &SourceAnalysis, findings: &mut Vec<Finding>) {
        let Some(limit) = self.rules.check_method_length else {
            return;
        };

        for sym in methods(analysis) {
            if sym.body_lines > limit {
                findings.push(
                    Finding::warning(
                        "method.length",
                        format!(
                            "Method '{}' is {} lines long (recommended max {limit})",
                            sym.name, sym.body_lines
                        ),
                    )
                    .at(sym.start_line, 1),
                );
            }
        }
    }

    fn check_complexity(&self, analysis: &SourceAnalysis, findings: &mut Vec<Finding>) {
        let Some(limit) = self.rules.check_cyclomatic_complexity else {
            return;
        };

        for sym in methods(analysis) {
            if sym.complexity > limit {
                findings.push(
                    Finding::warning(
                        "method.complexity",
                        format!(
                            "Method '{}' has cyclomatic complexity {} (threshold {limit})",
                            sym.name, sym.complexity
                        ),
                    )
                    .at(sym.start_line, 1),
                );
            }
        }
    }

    fn check_variable_scope(&self, analysis: &SourceAnalysis, findings: &mut Vec<Finding>) {
        if !self.rules.check_variable_scope {
            return;
        }

        for assignment in &analysis.undeclared_assignments {
            findings.push(
                Finding::failed(
                    "scope.undeclared",
                    format!("Variable '{}' is used without being declared", assignment.name),
                )
                .at(assignment.line, assignment.column),
            );
        }
    }
}

fn methods<'a>(analysis: &'a SourceAnalysis) -> impl Iterator<Item = &'a JavaSymbol> {
    analysis.symbols.iter().filter(|s| {
        matches!(
            s.kind,
            JavaSymbolKind::Method | JavaSymbolKind::Constructor
        )
    })
}

enum MethodMatch<'a> {
    Found(&'a JavaSymbol),
    WrongSignature(&'a JavaSymbol, String),
    Missing,
}

/// Find the best candidate for a required method: an exact signature
/// match wins; otherwise a same-name method explains what differs.
fn best_method_match<'a>(
    analysis: &'a SourceAnalysis,
    required: &RequiredMethod,
) -> MethodMatch<'a> {
    let mut same_name: Option<(&JavaSymbol, String)> = None;

    for sym in methods(analysis) {
        if sym.name != required.name {
            continue;
        }

        match signature_mismatch(sym, required) {
            None => return MethodMatch::Found(sym),
            Some(detail) => {
                same_name.get_or_insert((sym, detail));
            }
        }
    }

    match same_name {
        Some((sym, detail)) => MethodMatch::WrongSignature(sym, detail),
        None => MethodMatch::Missing,
    }
}

/// None when the symbol satisfies the requirement; otherwise a
/// human-readable description of the first difference.
fn signature_mismatch(sym: &JavaSymbol, required: &RequiredMethod) -> Option<String> {
    if let Some(expected) = &required.params {
        let actual: Vec<String> = sym.params.iter().map(|p| normalize_type(p)).collect();
        let expected: Vec<String> = expected.iter().map(|p| normalize_type(p)).collect();
        if actual != expected {
            return Some(format!(
                "expected parameters ({}), found ({})",
                expected.join(", "),
                actual.join(", ")
            ));
        }
    }

    if let Some(expected) = &required.return_type {
        let actual = sym.return_type.as_deref().unwrap_or("");
        if normalize_type(actual) != normalize_type(expected) {
            return Some(format!(
                "expected return type {expected}, found {actual}"
            ));
        }
    }

    None
}

/// "String []" and "String[]" mean the same thing to a grader.
fn normalize_type(t: &str) -> String {
    t.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analyze::FindingStatus;
    use crate::parsers::java_parser::JavaParser;

    fn analyze(src: &str) -> SourceAnalysis {
        JavaParser::new().unwrap().analyze_source(src).unwrap()
    }

    fn by_rule<'a>(findings: &'a [Finding], rule_id: &str) -> Vec<&'a Finding> {
        findings.iter().filter(|f| f.rule_id == rule_id).collect()
    }

    const HELLO: &str = r#"
public class Hello {
    public static void main(String[] args) {
        System.out.println("hi");
    }
}
"#;

    #[test]
    fn required_class_passes_and_fails() {
        let analysis = analyze(HELLO);
        let rules = ExerciseRules {
            required_classes: vec!["Hello".to_string(), "Missing".to_string()],
            ..Default::default()
        };

        let findings = RuleEngine::new(&rules).evaluate(&analysis, HELLO);
        let class_findings = by_rule(&findings, "class.required");
        assert_eq!(class_findings.len(), 2);
        assert_eq!(class_findings[0].status, FindingStatus::Passed);
        assert_eq!(class_findings[1].status, FindingStatus::Failed);
    }

    #[test]
    fn required_method_checks_signature() {
        let analysis = analyze(HELLO);
        let rules = ExerciseRules {
            required_methods: vec![
                RequiredMethod {
                    name: "main".to_string(),
                    params: Some(vec!["String[]".to_string()]),
                    return_type: Some("void".to_string()),
                },
                RequiredMethod {
                    name: "main".to_string(),
                    params: Some(vec!["int".to_string()]),
                    return_type: None,
                },
                RequiredMethod {
                    name: "helper".to_string(),
                    params: None,
                    return_type: None,
                },
            ],
            ..Default::default()
        };

        let findings = RuleEngine::new(&rules).evaluate(&analysis, HELLO);
        let method_findings = by_rule(&findings, "method.required");
        assert_eq!(method_findings.len(), 3);
        assert_eq!(method_findings[0].status, FindingStatus::Passed);
        assert_eq!(method_findings[1].status, FindingStatus::Failed);
        assert!(
            method_findings[1]
                .message
                .as_deref()
                .unwrap()
                .contains("expected parameters")
        );
        assert_eq!(method_findings[2].status, FindingStatus::Failed);
    }

    #[test]
    fn disallowed_pattern_reports_location() {
        let analysis = analyze(HELLO);
        let rules = ExerciseRules {
            disallowed_elements: vec![r"System\.out\.println".to_string(), r"goto".to_string()],
            ..Default::default()
        };

        let findings = RuleEngine::new(&rules).evaluate(&analysis, HELLO);
        let hits = by_rule(&findings, "element.disallowed");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].status, FindingStatus::Failed);
        assert_eq!(hits[0].location.as_ref().unwrap().line, 4);
        assert_eq!(hits[1].status, FindingStatus::Passed);
    }

    #[test]
    fn invalid_pattern_becomes_warning() {
        let analysis = analyze(HELLO);
        let rules = ExerciseRules {
            disallowed_elements: vec!["(unclosed".to_string()],
            ..Default::default()
        };

        let findings = RuleEngine::new(&rules).evaluate(&analysis, HELLO);
        let warnings = by_rule(&findings, "rule.invalid");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].status, FindingStatus::Warning);
    }

    #[test]
    fn thresholds_warn_only_on_violation() {
        let src = r#"
class Busy {
    int f(int n) {
        if (n > 0) {
            if (n > 1) {
                if (n > 2) {
                    n = 0;
                }
            }
        }
        return n;
    }
}
"#;
        let analysis = analyze(src);
        let rules = ExerciseRules {
            check_method_length: Some(5),
            check_cyclomatic_complexity: Some(2),
            ..Default::default()
        };

        let findings = RuleEngine::new(&rules).evaluate(&analysis, src);
        assert_eq!(by_rule(&findings, "method.length").len(), 1);
        assert_eq!(by_rule(&findings, "method.complexity").len(), 1);

        // Generous thresholds stay silent
        let rules = ExerciseRules {
            check_method_length: Some(100),
            check_cyclomatic_complexity: Some(10),
            ..Default::default()
        };
        let findings = RuleEngine::new(&rules).evaluate(&analysis, src);
        assert!(by_rule(&findings, "method.length").is_empty());
        assert!(by_rule(&findings, "method.complexity").is_empty());
    }

    #[test]
    fn scope_rule_reports_undeclared_assignment() {
        let src = "class A { void f() { ghost = 1; } }";
        let analysis = analyze(src);

        let rules = ExerciseRules {
            check_variable_scope: true,
            ..Default::default()
        };
        let findings = RuleEngine::new(&rules).evaluate(&analysis, src);
        let hits = by_rule(&findings, "scope.undeclared");
        assert_eq!(hits.len(), 1);
        assert!(hits[0].description.contains("ghost"));

        // Disabled by default
        let rules = ExerciseRules::default();
        let findings = RuleEngine::new(&rules).evaluate(&analysis, src);
        assert!(by_rule(&findings, "scope.undeclared").is_empty());
    }
}
