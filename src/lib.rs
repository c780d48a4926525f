#![doc(html_root_url = "https://docs.rs/protoc-gen-py-mcp/0.3.0")]

//! `protoc-gen-py-mcp` is a protoc plugin that turns gRPC service
//! definitions into Python MCP tool servers: each unary RPC becomes a
//! callable tool function that builds the request message from typed
//! parameters, dispatches the call over a gRPC channel, and returns the
//! response as a plain dictionary.
//!
//! ## Example
//!
//! Given `simple.proto`:
//!
//! ```proto
//! syntax = "proto3";
//!
//! package test.simple;
//!
//! message SimpleRequest {
//!     string name = 1;
//!     int32 value = 2;
//! }
//!
//! message SimpleResponse {
//!     string result = 1;
//! }
//!
//! service SimpleService {
//!     // Does something simple.
//!     rpc DoSomething(SimpleRequest) returns (SimpleResponse);
//! }
//! ```
//!
//! running
//!
//! ```bash
//! protoc --plugin=protoc-gen-py-mcp=target/release/protoc-gen-py-mcp \
//!     --py-mcp_out=gen --py-mcp_opt=grpc_target=localhost:50051 \
//!     simple.proto
//! ```
//!
//! writes `gen/simple_pb2_mcp.py` containing, among the scaffolding:
//!
//! ```python
//! @mcp.tool(name="do_something", description="Does something simple.")
//! def do_something(name: str, value: int) -> dict:
//!     """Does something simple."""
//!     request = simple_pb2.SimpleRequest()
//!     request.name = name
//!     request.value = value
//!     channel = grpc.insecure_channel('localhost:50051')
//!     stub = simple_pb2_grpc.SimpleServiceStub(channel)
//!     response = stub.DoSomething(request, timeout=30)
//!     result = MessageToDict(response)
//!     return result
//! ```
//!
//! Options are passed through `--py-mcp_opt` as a comma-separated
//! `key=value` list; see [`Config`] for the recognized keys. Files without
//! services produce no output, dependency files are indexed for type
//! resolution but never generated, and a failure in one file is reported
//! through the response `error` field without stopping the others.

mod analysis;
mod code_generator;
mod config;
mod error;
mod ident;
mod index;
mod type_map;
mod validation;

use std::collections::HashSet;

use log::{debug, error, warn};
use prost_types::compiler::code_generator_response::{Feature, File};
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};

pub use crate::analysis::{analyze_fields, file_has_optional_fields, FieldInfo};
pub use crate::code_generator::{generate_file, output_file_name, DEFAULT_GRPC_TARGET};
pub use crate::config::{log_level, Config, DebugLevel, StreamMode};
pub use crate::error::{ErrorFormat, ErrorKind, GenerateError};
pub use crate::ident::{tool_name, NameCase};
pub use crate::index::TypeIndex;
pub use crate::type_map::{field_type, well_known_type};
pub use crate::validation::{validate_parameters, ValidationReport};

/// Runs the whole generation pipeline for a decoded request.
///
/// This never fails: parameter problems are logged and resolved to
/// defaults, and a generation error in one file is recorded in the response
/// `error` field while the remaining files still generate.
pub fn run_plugin(request: CodeGeneratorRequest) -> CodeGeneratorResponse {
    let (config, report) = Config::from_parameter_string(request.parameter());
    for problem in &report.errors {
        warn!("{}", problem);
    }
    for warning in &report.warnings {
        warn!("{}", warning);
    }

    let index = TypeIndex::build(&request.proto_file);
    let requested: HashSet<&str> = request
        .file_to_generate
        .iter()
        .map(String::as_str)
        .collect();

    let mut response = CodeGeneratorResponse {
        supported_features: Some(Feature::Proto3Optional as u64),
        ..Default::default()
    };
    let mut errors = Vec::new();
    for file in &request.proto_file {
        if !requested.contains(file.name()) {
            debug!("file: {:?} is a dependency, not generating", file.name());
            continue;
        }
        match code_generator::generate_file(&config, &index, file) {
            Ok(Some(content)) => {
                if config.show_generated {
                    for line in content.lines() {
                        debug!("generated: {}", line);
                    }
                }
                let name = code_generator::output_file_name(file.name(), &config.output_suffix);
                response.file.push(File {
                    name: Some(name),
                    content: Some(content),
                    ..Default::default()
                });
            }
            Ok(None) => {}
            Err(err) => {
                error!("file: {:?} failed: {}", file.name(), err);
                errors.push(err.detailed_context(
                    file.name(),
                    config.error_format,
                    config.debug_mode(),
                ));
            }
        }
    }
    if !errors.is_empty() {
        response.error = Some(errors.join("\n"));
    }
    response
}
