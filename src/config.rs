//! Plugin parameter parsing and the typed generation configuration.
//!
//! protoc hands the plugin a single comma-separated parameter string
//! (`--py-mcp_opt=debug=verbose,tool_name_case=camel`). The raw key/value map
//! is kept alongside the typed fields so unknown keys survive parsing; they
//! are ignored rather than rejected. Invalid values resolve to best-effort
//! defaults, with the problems reported through [`validation`](crate::validation).

use std::collections::HashMap;

use log::LevelFilter;

use crate::error::ErrorFormat;
use crate::ident::NameCase;
use crate::validation::{self, ValidationReport};

/// Verbosity ladder selected with the `debug` parameter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugLevel {
    #[default]
    Off,
    Basic,
    Verbose,
    Trace,
}

impl DebugLevel {
    pub fn from_param(value: &str) -> DebugLevel {
        match value.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "basic" => DebugLevel::Basic,
            "verbose" => DebugLevel::Verbose,
            "trace" => DebugLevel::Trace,
            _ => DebugLevel::Off,
        }
    }

    pub fn level_filter(&self) -> LevelFilter {
        match self {
            DebugLevel::Off => LevelFilter::Warn,
            DebugLevel::Basic => LevelFilter::Info,
            DebugLevel::Verbose => LevelFilter::Debug,
            DebugLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Policy for RPC methods with a streaming direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StreamMode {
    /// Emit tools that would collect the stream; bodies are placeholders.
    #[default]
    Collect,
    /// Replace every streaming method with an explanatory comment.
    Skip,
    /// Emit a unary-shaped tool under a warning comment.
    Warn,
}

impl StreamMode {
    pub fn from_param(value: &str) -> StreamMode {
        match value.to_ascii_lowercase().as_str() {
            "skip" => StreamMode::Skip,
            "warn" => StreamMode::Warn,
            _ => StreamMode::Collect,
        }
    }
}

/// Typed generation configuration resolved from the parameter string.
#[derive(Clone, Debug)]
pub struct Config {
    /// Raw key/value pairs, unknown keys included.
    pub parameters: HashMap<String, String>,
    pub debug_level: DebugLevel,
    pub output_suffix: String,
    pub tool_name_case: NameCase,
    pub include_comments: bool,
    pub stream_mode: StreamMode,
    /// Endpoint baked into generated code; `None` falls back to
    /// `localhost:50051` at emission time.
    pub grpc_target: Option<String>,
    pub async_mode: bool,
    pub grpc_timeout: i32,
    pub use_request_interceptor: bool,
    pub insecure: bool,
    pub server_factory: bool,
    pub server_name_pattern: String,
    pub function_name_pattern: String,
    pub error_format: ErrorFormat,
    pub show_generated: bool,
    pub show_types: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            parameters: HashMap::new(),
            debug_level: DebugLevel::Off,
            output_suffix: "_pb2_mcp.py".to_string(),
            tool_name_case: NameCase::Snake,
            include_comments: true,
            stream_mode: StreamMode::Collect,
            grpc_target: None,
            async_mode: false,
            grpc_timeout: 30,
            use_request_interceptor: false,
            insecure: true,
            server_factory: false,
            server_name_pattern: "{service}".to_string(),
            function_name_pattern: "create_{service}_server".to_string(),
            error_format: ErrorFormat::Standard,
            show_generated: false,
            show_types: false,
        }
    }
}

impl Config {
    /// Resolves the parameter string into a typed configuration plus the
    /// validation report for it. Validation never blocks resolution.
    pub fn from_parameter_string(raw: &str) -> (Config, ValidationReport) {
        let parameters = parse_parameter_map(raw);
        let report = validation::validate_parameters(&parameters);

        let mut config = Config {
            debug_level: parameters
                .get("debug")
                .map(|v| DebugLevel::from_param(v))
                .unwrap_or_default(),
            tool_name_case: parameters
                .get("tool_name_case")
                .map(|v| NameCase::from_param(v))
                .unwrap_or_default(),
            stream_mode: parameters
                .get("stream_mode")
                .map(|v| StreamMode::from_param(v))
                .unwrap_or_default(),
            error_format: parameters
                .get("error_format")
                .map(|v| ErrorFormat::from_param(v))
                .unwrap_or_default(),
            grpc_target: parameters
                .get("grpc_target")
                .filter(|v| !v.is_empty())
                .cloned(),
            grpc_timeout: parameters
                .get("timeout")
                .and_then(|v| v.parse::<i32>().ok())
                .unwrap_or(30),
            ..Config::default()
        };
        if let Some(suffix) = parameters.get("output_suffix") {
            if !suffix.is_empty() {
                config.output_suffix = suffix.clone();
            }
        }
        if let Some(pattern) = parameters.get("server_name_pattern") {
            if !pattern.is_empty() {
                config.server_name_pattern = pattern.clone();
            }
        }
        if let Some(pattern) = parameters.get("function_name_pattern") {
            if !pattern.is_empty() {
                config.function_name_pattern = pattern.clone();
            }
        }
        config.include_comments = parameters
            .get("include_comments")
            .map(|v| is_truthy(v))
            .unwrap_or(true);
        config.insecure = parameters
            .get("insecure")
            .map(|v| is_truthy(v))
            .unwrap_or(true);
        config.async_mode = truthy_flag(&parameters, "async");
        config.use_request_interceptor = truthy_flag(&parameters, "request_interceptor");
        config.server_factory = truthy_flag(&parameters, "server_factory");
        config.show_generated = truthy_flag(&parameters, "show_generated");
        config.show_types = truthy_flag(&parameters, "show_types");
        config.parameters = parameters;

        (config, report)
    }

    pub fn debug_mode(&self) -> bool {
        self.debug_level != DebugLevel::Off
    }
}

/// Splits the protoc parameter string into a key/value map.
///
/// Items split on the first `=` only, so values may themselves contain `=`;
/// a bare key means `"true"`.
pub fn parse_parameter_map(raw: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for item in raw.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        match item.split_once('=') {
            Some((key, value)) => map.insert(key.trim().to_string(), value.trim().to_string()),
            None => map.insert(item.to_string(), "true".to_string()),
        };
    }
    map
}

/// The log level the driver should run at for a raw parameter string.
///
/// Resolved before full configuration so decode-time logging already honors
/// the `debug` parameter.
pub fn log_level(raw: &str) -> LevelFilter {
    parse_parameter_map(raw)
        .get("debug")
        .map(|v| DebugLevel::from_param(v))
        .unwrap_or_default()
        .level_filter()
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

fn truthy_flag(parameters: &HashMap<String, String>, key: &str) -> bool {
    parameters.get(key).map(|v| is_truthy(v)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let (config, report) = Config::from_parameter_string("");
        assert!(report.is_valid());
        assert_eq!(DebugLevel::Off, config.debug_level);
        assert_eq!("_pb2_mcp.py", config.output_suffix);
        assert_eq!(NameCase::Snake, config.tool_name_case);
        assert!(config.include_comments);
        assert_eq!(StreamMode::Collect, config.stream_mode);
        assert_eq!(None, config.grpc_target);
        assert!(!config.async_mode);
        assert_eq!(30, config.grpc_timeout);
        assert!(!config.use_request_interceptor);
        assert!(config.insecure);
        assert!(!config.server_factory);
        assert_eq!("{service}", config.server_name_pattern);
        assert_eq!("create_{service}_server", config.function_name_pattern);
    }

    #[test]
    fn test_parse_parameter_map() {
        let map = parse_parameter_map("debug=verbose,async,timeout=60");
        assert_eq!("verbose", map["debug"]);
        assert_eq!("true", map["async"]);
        assert_eq!("60", map["timeout"]);
    }

    #[test]
    fn test_split_on_first_equals_only() {
        let map = parse_parameter_map("param=value=extra");
        assert_eq!("value=extra", map["param"]);
    }

    #[test]
    fn test_whitespace_trimmed() {
        let map = parse_parameter_map(" debug = true , async = 1 ");
        assert_eq!("true", map["debug"]);
        assert_eq!("1", map["async"]);
    }

    #[test]
    fn test_empty_items_skipped() {
        let map = parse_parameter_map(",,debug=basic,,");
        assert_eq!(1, map.len());
    }

    #[test]
    fn test_debug_ladder() {
        assert_eq!(DebugLevel::Basic, DebugLevel::from_param("true"));
        assert_eq!(DebugLevel::Basic, DebugLevel::from_param("1"));
        assert_eq!(DebugLevel::Basic, DebugLevel::from_param("yes"));
        assert_eq!(DebugLevel::Basic, DebugLevel::from_param("basic"));
        assert_eq!(DebugLevel::Verbose, DebugLevel::from_param("verbose"));
        assert_eq!(DebugLevel::Trace, DebugLevel::from_param("TRACE"));
        assert_eq!(DebugLevel::Off, DebugLevel::from_param("false"));
        assert_eq!(DebugLevel::Off, DebugLevel::from_param("0"));
        assert_eq!(DebugLevel::Off, DebugLevel::from_param("junk"));
    }

    #[test]
    fn test_level_filter() {
        assert_eq!(LevelFilter::Warn, DebugLevel::Off.level_filter());
        assert_eq!(LevelFilter::Info, DebugLevel::Basic.level_filter());
        assert_eq!(LevelFilter::Debug, DebugLevel::Verbose.level_filter());
        assert_eq!(LevelFilter::Trace, DebugLevel::Trace.level_filter());
        assert_eq!(LevelFilter::Debug, log_level("debug=verbose,async"));
        assert_eq!(LevelFilter::Warn, log_level(""));
    }

    #[test]
    fn test_boolean_values() {
        let (config, _) = Config::from_parameter_string("async=yes,request_interceptor=1");
        assert!(config.async_mode);
        assert!(config.use_request_interceptor);
        let (config, _) = Config::from_parameter_string("async=no,request_interceptor=off");
        assert!(!config.async_mode);
        assert!(!config.use_request_interceptor);
    }

    #[test]
    fn test_bare_key_means_true() {
        let (config, _) = Config::from_parameter_string("async");
        assert!(config.async_mode);
    }

    #[test]
    fn test_include_comments_opt_out() {
        let (config, _) = Config::from_parameter_string("include_comments=false");
        assert!(!config.include_comments);
    }

    #[test]
    fn test_insecure_opt_out() {
        let (config, _) = Config::from_parameter_string("insecure=false");
        assert!(!config.insecure);
    }

    #[test]
    fn test_timeout_parsing() {
        let (config, _) = Config::from_parameter_string("timeout=60");
        assert_eq!(60, config.grpc_timeout);
        // Non-numeric values fall back to the default.
        let (config, _) = Config::from_parameter_string("timeout=invalid");
        assert_eq!(30, config.grpc_timeout);
        // Out-of-range numerics are kept verbatim; validation reports them.
        let (config, report) = Config::from_parameter_string("timeout=-10");
        assert_eq!(-10, config.grpc_timeout);
        assert!(!report.is_valid());
        let (config, _) = Config::from_parameter_string("timeout=999999");
        assert_eq!(999999, config.grpc_timeout);
    }

    #[test]
    fn test_grpc_target() {
        let (config, _) = Config::from_parameter_string("grpc_target=api.example.com:443");
        assert_eq!(Some("api.example.com:443".to_string()), config.grpc_target.clone());
        let (config, _) = Config::from_parameter_string("grpc_target=");
        assert_eq!(None, config.grpc_target);
    }

    #[test]
    fn test_unknown_keys_retained() {
        let (config, _) = Config::from_parameter_string("future_flag=7,async=true");
        assert_eq!("7", config.parameters["future_flag"]);
        assert!(config.async_mode);
    }

    #[test]
    fn test_invalid_enum_values_fall_back() {
        let (config, report) = Config::from_parameter_string("tool_name_case=shouting,stream_mode=buffer");
        assert_eq!(NameCase::Snake, config.tool_name_case);
        assert_eq!(StreamMode::Collect, config.stream_mode);
        assert_eq!(2, report.errors.len());
    }
}
