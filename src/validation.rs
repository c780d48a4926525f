//! Declarative validation of plugin parameters.
//!
//! Every rule names a parameter key, a predicate, an error message, and
//! example values to suggest in the report. Validation is advisory: a failed
//! rule is collected, not raised, and the configuration resolver still falls
//! back to defaults for the offending key.

use std::collections::HashMap;

use once_cell::sync::Lazy;

struct Rule {
    key: &'static str,
    check: fn(&str) -> bool,
    error: &'static str,
    suggestions: &'static [&'static str],
    /// Legal-but-suspect values; checked only when `check` passes.
    warn_check: Option<fn(&str) -> bool>,
    warn_message: Option<&'static str>,
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule {
            key: "debug",
            check: |v| {
                matches!(
                    v.to_ascii_lowercase().as_str(),
                    "true" | "false" | "1" | "0" | "yes" | "no" | "basic" | "verbose" | "trace"
                )
            },
            error: "must be one of: true, false, basic, verbose, trace",
            suggestions: &["debug=verbose", "debug=basic"],
            warn_check: None,
            warn_message: None,
        },
        Rule {
            key: "tool_name_case",
            check: |v| {
                matches!(
                    v.to_ascii_lowercase().as_str(),
                    "snake" | "camel" | "pascal" | "kebab"
                )
            },
            error: "must be one of: snake, camel, pascal, kebab",
            suggestions: &["tool_name_case=snake", "tool_name_case=camel"],
            warn_check: None,
            warn_message: None,
        },
        Rule {
            key: "stream_mode",
            check: |v| matches!(v.to_ascii_lowercase().as_str(), "collect" | "skip" | "warn"),
            error: "must be one of: collect, skip, warn",
            suggestions: &["stream_mode=collect", "stream_mode=skip"],
            warn_check: None,
            warn_message: None,
        },
        Rule {
            key: "error_format",
            check: |v| {
                matches!(
                    v.to_ascii_lowercase().as_str(),
                    "standard" | "simple" | "detailed"
                )
            },
            error: "must be one of: standard, simple, detailed",
            suggestions: &["error_format=standard"],
            warn_check: None,
            warn_message: None,
        },
        Rule {
            key: "timeout",
            check: |v| v.parse::<i64>().map(|n| n > 0).unwrap_or(false),
            error: "must be a positive integer number of seconds",
            suggestions: &["timeout=30", "timeout=60"],
            warn_check: Some(|v| v.parse::<i64>().map(|n| n > 300).unwrap_or(false)),
            warn_message: Some("timeouts above 300 seconds let calls hang for a long time before failing"),
        },
        Rule {
            key: "grpc_target",
            check: |v| {
                let mut parts = v.split(':');
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(host), Some(port), None) => !host.is_empty() && !port.is_empty(),
                    _ => false,
                }
            },
            error: "must be in host:port format",
            suggestions: &["grpc_target=localhost:50051", "grpc_target=api.example.com:443"],
            warn_check: None,
            warn_message: None,
        },
        Rule {
            key: "output_suffix",
            check: |v| v.ends_with(".py"),
            error: "must end with .py",
            suggestions: &["output_suffix=_pb2_mcp.py", "output_suffix=_mcp_server.py"],
            warn_check: None,
            warn_message: None,
        },
        Rule {
            key: "server_name_pattern",
            check: |v| v.contains("{service}"),
            error: "must contain the {service} placeholder",
            suggestions: &["server_name_pattern={service}"],
            warn_check: None,
            warn_message: None,
        },
        Rule {
            key: "function_name_pattern",
            check: |v| v.contains("{service}"),
            error: "must contain the {service} placeholder",
            suggestions: &["function_name_pattern=create_{service}_server"],
            warn_check: None,
            warn_message: None,
        },
    ]
});

/// Outcome of validating a parameter map.
#[derive(Clone, Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Checks every recognized parameter against the rule table.
///
/// Unknown keys pass through unreported. Rule order is fixed, so report
/// order is deterministic regardless of map iteration order.
pub fn validate_parameters(parameters: &HashMap<String, String>) -> ValidationReport {
    let mut report = ValidationReport::default();
    for rule in RULES.iter() {
        let Some(value) = parameters.get(rule.key) else {
            continue;
        };
        if !(rule.check)(value) {
            report.errors.push(format!(
                "Parameter '{}': {}. Examples: {}",
                rule.key,
                rule.error,
                rule.suggestions.join(", ")
            ));
        } else if let (Some(warn_check), Some(warn_message)) = (rule.warn_check, rule.warn_message)
        {
            if warn_check(value) {
                report
                    .warnings
                    .push(format!("Parameter '{}={}': {}", rule.key, value, warn_message));
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(pairs: &[(&str, &str)]) -> ValidationReport {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        validate_parameters(&map)
    }

    #[test]
    fn test_empty_is_valid() {
        let report = validate(&[]);
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        assert!(validate(&[("future_flag", "whatever")]).is_valid());
    }

    #[test]
    fn test_tool_name_case() {
        assert!(validate(&[("tool_name_case", "snake")]).is_valid());
        assert!(validate(&[("tool_name_case", "KEBAB")]).is_valid());
        let report = validate(&[("tool_name_case", "shouting")]);
        assert_eq!(1, report.errors.len());
        assert!(report.errors[0].contains("Parameter 'tool_name_case'"));
        assert!(report.errors[0].contains("Examples: tool_name_case=snake"));
    }

    #[test]
    fn test_stream_mode() {
        assert!(validate(&[("stream_mode", "warn")]).is_valid());
        assert!(!validate(&[("stream_mode", "buffer")]).is_valid());
    }

    #[test]
    fn test_debug_values() {
        assert!(validate(&[("debug", "verbose")]).is_valid());
        assert!(validate(&[("debug", "0")]).is_valid());
        assert!(!validate(&[("debug", "loud")]).is_valid());
    }

    #[test]
    fn test_timeout_rule() {
        assert!(validate(&[("timeout", "30")]).is_valid());
        assert!(!validate(&[("timeout", "0")]).is_valid());
        assert!(!validate(&[("timeout", "-10")]).is_valid());
        assert!(!validate(&[("timeout", "soon")]).is_valid());
    }

    #[test]
    fn test_timeout_above_300_warns_but_passes() {
        let report = validate(&[("timeout", "301")]);
        assert!(report.is_valid());
        assert_eq!(1, report.warnings.len());
        assert!(report.warnings[0].starts_with("Parameter 'timeout=301'"));

        let report = validate(&[("timeout", "300")]);
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_grpc_target_rule() {
        assert!(validate(&[("grpc_target", "localhost:50051")]).is_valid());
        assert!(validate(&[("grpc_target", "api.example.com:443")]).is_valid());
        assert!(!validate(&[("grpc_target", "localhost")]).is_valid());
        assert!(!validate(&[("grpc_target", ":50051")]).is_valid());
        assert!(!validate(&[("grpc_target", "localhost:")]).is_valid());
        assert!(!validate(&[("grpc_target", "a:b:c")]).is_valid());
    }

    #[test]
    fn test_output_suffix_rule() {
        assert!(validate(&[("output_suffix", "_mcp_server.py")]).is_valid());
        assert!(!validate(&[("output_suffix", "_mcp.txt")]).is_valid());
    }

    #[test]
    fn test_pattern_rules() {
        assert!(validate(&[("server_name_pattern", "{service} tools")]).is_valid());
        assert!(!validate(&[("server_name_pattern", "tools")]).is_valid());
        assert!(!validate(&[("function_name_pattern", "create_server")]).is_valid());
    }

    #[test]
    fn test_errors_accumulate_in_rule_order() {
        let report = validate(&[
            ("grpc_target", "nope"),
            ("tool_name_case", "shouting"),
            ("timeout", "never"),
        ]);
        assert_eq!(3, report.errors.len());
        assert!(report.errors[0].contains("tool_name_case"));
        assert!(report.errors[1].contains("timeout"));
        assert!(report.errors[2].contains("grpc_target"));
    }
}
