//! The protoc plugin entry point.
//!
//! protoc launches this binary with a serialized `CodeGeneratorRequest` on
//! stdin and expects a serialized `CodeGeneratorResponse` on stdout, so
//! stdout carries nothing else; all logging goes to stderr. Input that
//! cannot be read or decoded is fatal: a diagnostic dump is written to
//! stderr and the process exits non-zero. Everything after that point is
//! per-file error handling inside [`run_plugin`] and exits zero.

use std::io::{self, Read, Write};

use log::debug;
use prost::Message;
use prost_types::compiler::CodeGeneratorRequest;

use protoc_gen_py_mcp::{log_level, run_plugin, ErrorKind};

fn main() {
    if let Err(error) = faillible_main() {
        eprintln!("{}", fatal_context(&error));
        std::process::exit(1);
    }
}

fn faillible_main() -> io::Result<()> {
    let mut buf = Vec::new();
    io::stdin().read_to_end(&mut buf)?;

    let request = CodeGeneratorRequest::decode(buf.as_slice())
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidInput, error))?;

    // The log level comes from the request's own `debug` parameter, with
    // RUST_LOG still able to override it.
    env_logger::Builder::new()
        .filter_level(log_level(request.parameter()))
        .parse_default_env()
        .init();
    debug!(
        "request: {} files to generate, parameter: {:?}",
        request.file_to_generate.len(),
        request.parameter()
    );

    let response = run_plugin(request);

    buf.clear();
    response
        .encode(&mut buf)
        .map_err(|error| io::Error::new(io::ErrorKind::Other, error))?;
    io::stdout().write_all(&buf)?;
    io::stdout().flush()?;
    Ok(())
}

fn fatal_context(error: &io::Error) -> String {
    let mut lines = vec![
        "protoc-gen-py-mcp: fatal: could not process the code generator request".to_string(),
        format!("error: {}", error),
    ];
    for line in ErrorKind::Io.troubleshooting() {
        lines.push((*line).to_string());
    }
    lines.push(String::new());
    lines.push("The plugin reads a serialized CodeGeneratorRequest on stdin and is".to_string());
    lines.push("normally launched by protoc, for example:".to_string());
    lines.push("  protoc --py-mcp_out=gen --py-mcp_opt=debug=basic your.proto".to_string());
    lines.join("\n")
}
