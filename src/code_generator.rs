//! Emission of Python FastMCP server source for one proto file.
//!
//! Output is built by appending lines to a string buffer with a four-space
//! indent per depth level. Emission is deterministic: equal descriptors and
//! equal configuration produce byte-identical output, and nothing
//! time-dependent is written. Blank-line placement is part of the output
//! contract (two blank lines between top-level definitions, one inside a
//! factory), since downstream tooling greps the generated text.

use itertools::{Either, Itertools};
use log::debug;
use prost_types::{FileDescriptorProto, MethodDescriptorProto, ServiceDescriptorProto};

use crate::analysis::{self, FieldInfo};
use crate::config::{Config, StreamMode};
use crate::error::GenerateError;
use crate::ident::{sanitize_identifier, tool_name, NameCase};
use crate::index::TypeIndex;

/// Endpoint baked into generated code when `grpc_target` is not set.
pub const DEFAULT_GRPC_TARGET: &str = "localhost:50051";

/// The server name used by the shared global endpoint handle.
const GLOBAL_SERVER_NAME: &str = "MCP Server from Proto";

/// Derives the output file name from a proto file name.
pub fn output_file_name(proto_name: &str, suffix: &str) -> String {
    proto_name.replace(".proto", suffix)
}

/// Generates the Python source for `file`, or `None` when the file declares
/// no services.
pub fn generate_file(
    config: &Config,
    index: &TypeIndex,
    file: &FileDescriptorProto,
) -> Result<Option<String>, GenerateError> {
    if file.name().is_empty() {
        return Err(GenerateError::invalid_value("proto file has no name"));
    }
    if file.service.is_empty() {
        debug!("file: {:?} has no services, skipping", file.name());
        return Ok(None);
    }
    let mut buf = String::new();
    CodeGenerator::generate(config, index, file, &mut buf)?;
    Ok(Some(buf))
}

struct CodeGenerator<'a> {
    config: &'a Config,
    index: &'a TypeIndex<'a>,
    file: &'a FileDescriptorProto,
    /// Bare generated module name for the file, e.g. `simple_pb2`.
    module: String,
    depth: u8,
    buf: &'a mut String,
}

impl<'a> CodeGenerator<'a> {
    fn generate(
        config: &'a Config,
        index: &'a TypeIndex,
        file: &'a FileDescriptorProto,
        buf: &'a mut String,
    ) -> Result<(), GenerateError> {
        debug!("file: {:?}, package: {:?}", file.name(), file.package());
        let (_, module) = python_modules(file.name());
        let mut code_gen = CodeGenerator {
            config,
            index,
            file,
            module,
            depth: 0,
            buf,
        };

        code_gen.append_header();
        code_gen.append_imports();
        if code_gen.config.use_request_interceptor {
            code_gen.append_interceptor_prelude();
        }
        if code_gen.config.server_factory {
            for (idx, service) in file.service.iter().enumerate() {
                code_gen.append_service_factory(idx as i32, service)?;
            }
        } else {
            code_gen.blank();
            code_gen.line(&format!("mcp = FastMCP(\"{}\")", GLOBAL_SERVER_NAME));
            for (idx, service) in file.service.iter().enumerate() {
                code_gen.append_service_tools(idx as i32, service)?;
            }
        }
        code_gen.append_main_trailer();
        Ok(())
    }

    fn append_header(&mut self) {
        let out = output_file_name(self.file.name(), &self.config.output_suffix);
        self.line(&format!("# Generated from {}", self.file.name()));
        self.line(&format!("# Output to: {}", out));
    }

    fn append_imports(&mut self) {
        self.blank();
        self.line("from fastmcp import FastMCP");
        let typing = self.typing_imports();
        if !typing.is_empty() {
            self.line(&format!("from typing import {}", typing.join(", ")));
        }
        if self.config.async_mode {
            self.line("import asyncio");
        }
        self.line("import grpc");
        self.line("from google.protobuf.json_format import MessageToDict");
        self.blank();
        let (parent, module) = python_modules(self.file.name());
        match parent {
            Some(parent) => {
                self.line(&format!("from {} import {}", parent, module));
                self.line(&format!("from {} import {}_grpc", parent, module));
            }
            None => {
                self.line(&format!("import {}", module));
                self.line(&format!("import {}_grpc", module));
            }
        }
    }

    /// Typing names needed by the emitted signatures, in fixed priority
    /// order. `Optional` is gated on the file's method input messages; the
    /// rest are gated on the hints those messages map to.
    fn typing_imports(&self) -> Vec<&'static str> {
        let mut need_optional = analysis::file_has_optional_fields(self.file, self.index);
        let mut need_list = false;
        let mut need_dict = false;
        let mut need_any = false;
        for service in &self.file.service {
            for method in &service.method {
                if self.config.stream_mode == StreamMode::Collect
                    && method.client_streaming()
                    && !method.server_streaming()
                {
                    need_list = true;
                }
                for field in analysis::analyze_fields(method.input_type(), self.index) {
                    need_optional |= field.py_type.contains("Optional[");
                    need_list |= field.py_type.contains("List[");
                    need_dict |= field.py_type.contains("Dict[");
                    need_any |= field.py_type.contains("Any");
                }
            }
        }
        let mut names = Vec::new();
        if need_optional {
            names.push("Optional");
        }
        if need_list {
            names.push("List");
        }
        if need_dict {
            names.push("Dict");
        }
        if need_any {
            names.push("Any");
        }
        names
    }

    fn append_interceptor_prelude(&mut self) {
        self.blank();
        self.blank();
        self.line("def default_request_interceptor(request, metadata):");
        self.depth += 1;
        self.line("\"\"\"Pass-through hook applied to every outgoing request.\"\"\"");
        self.line("return request, metadata");
        self.depth -= 1;
        self.blank();
        self.blank();
        self.line("# Rebind to customize outgoing requests and metadata.");
        self.line("request_interceptor = default_request_interceptor");
    }

    fn append_service_tools(
        &mut self,
        service_index: i32,
        service: &ServiceDescriptorProto,
    ) -> Result<(), GenerateError> {
        if service.name().is_empty() {
            return Err(GenerateError::invalid_descriptor(format!(
                "service at index {} has no name",
                service_index
            )));
        }
        debug!("  service: {:?}", service.name());
        self.blank();
        self.blank();
        let comment = self
            .index
            .comment(self.file.name(), &[6, service_index])
            .to_string();
        if self.config.include_comments && !comment.is_empty() {
            self.line(&format!("# {}: {}", service.name(), collapse(&comment)));
        } else {
            self.line(&format!("# {} tools.", service.name()));
        }
        for (idx, method) in service.method.iter().enumerate() {
            self.blank();
            self.blank();
            self.append_method(service, service_index, method, idx as i32)?;
        }
        Ok(())
    }

    fn append_service_factory(
        &mut self,
        service_index: i32,
        service: &ServiceDescriptorProto,
    ) -> Result<(), GenerateError> {
        if service.name().is_empty() {
            return Err(GenerateError::invalid_descriptor(format!(
                "service at index {} has no name",
                service_index
            )));
        }
        debug!("  service: {:?} (factory)", service.name());
        let factory = factory_name(&self.config.function_name_pattern, service.name());
        let server_name = self
            .config
            .server_name_pattern
            .replace("{service}", service.name());

        self.blank();
        self.blank();
        self.line(&format!("def {}() -> FastMCP:", factory));
        self.depth += 1;
        let comment = self
            .index
            .comment(self.file.name(), &[6, service_index])
            .to_string();
        if self.config.include_comments && !comment.is_empty() {
            self.append_docstring(&comment);
        } else {
            self.append_docstring(&format!(
                "Build a FastMCP server exposing the {} RPCs.",
                service.name()
            ));
        }
        self.line(&format!("mcp = FastMCP(\"{}\")", escape(&server_name)));
        for (idx, method) in service.method.iter().enumerate() {
            self.blank();
            self.append_method(service, service_index, method, idx as i32)?;
        }
        self.blank();
        self.line("return mcp");
        self.depth -= 1;
        Ok(())
    }

    /// Routes a method to unary emission or the streaming policy.
    fn append_method(
        &mut self,
        service: &ServiceDescriptorProto,
        service_index: i32,
        method: &MethodDescriptorProto,
        method_index: i32,
    ) -> Result<(), GenerateError> {
        if method.name().is_empty() {
            return Err(GenerateError::invalid_descriptor(format!(
                "method at index {} of service {} has no name",
                method_index,
                service.name()
            )));
        }
        let client = method.client_streaming();
        let server = method.server_streaming();
        if !client && !server {
            return self.append_unary_tool(service, service_index, method, method_index);
        }
        match self.config.stream_mode {
            StreamMode::Skip => {
                self.line(&format!(
                    "# Skipped streaming method {} (client_streaming={}, server_streaming={}): stream_mode=skip.",
                    method.name(),
                    py_bool(client),
                    py_bool(server),
                ));
                Ok(())
            }
            StreamMode::Warn => {
                self.line(&format!(
                    "# Warning: {} is a streaming RPC; it is exposed below as if it were unary.",
                    method.name()
                ));
                self.append_unary_tool(service, service_index, method, method_index)
            }
            StreamMode::Collect => {
                if client && server {
                    self.line(&format!(
                        "# Skipped bidirectional streaming method {}: not supported by the tool bridge.",
                        method.name()
                    ));
                    Ok(())
                } else if client {
                    self.append_collect_tool(service, service_index, method, method_index, true)
                } else {
                    self.append_collect_tool(service, service_index, method, method_index, false)
                }
            }
        }
    }

    /// Emits a full request/dispatch/convert tool for a unary-shaped method.
    fn append_unary_tool(
        &mut self,
        service: &ServiceDescriptorProto,
        service_index: i32,
        method: &MethodDescriptorProto,
        method_index: i32,
    ) -> Result<(), GenerateError> {
        // Request construction needs an input type reference; without one the
        // emitted call would not name a message class at all.
        if method.input_type().is_empty() {
            return Err(GenerateError::missing_reference(format!(
                "method {} of service {} has no input type",
                method.name(),
                service.name()
            )));
        }
        let ident = sanitize_identifier(&tool_name(method.name(), NameCase::Snake));
        let registered = tool_name(method.name(), self.config.tool_name_case);
        debug!("    method: {:?}, tool: {:?}", method.name(), registered);

        let fields = analysis::analyze_fields(method.input_type(), self.index);
        if self.config.show_types {
            for field in &fields {
                debug!(
                    "      field: {:?}, proto type: {:?}, hint: {:?}",
                    field.name, field.proto_type, field.py_type
                );
            }
        }
        let comment = self
            .index
            .comment(self.file.name(), &[6, service_index, 2, method_index])
            .to_string();

        self.append_decorator(&registered, &comment);
        let params = signature_params(&fields);
        let prefix = if self.config.async_mode { "async def" } else { "def" };
        self.line(&format!("{} {}({}) -> dict:", prefix, ident, params));
        self.depth += 1;

        if self.config.include_comments && !comment.is_empty() {
            self.append_docstring(&comment);
        } else {
            self.append_docstring(&format!(
                "Invoke the {}.{} RPC.",
                service.name(),
                method.name()
            ));
        }
        if let Some(message) = self.index.message(method.input_type()) {
            for (group, members) in analysis::real_oneof_groups(message) {
                self.line(&format!(
                    "# Oneof validation: Only one of [{}] should be provided for '{}'.",
                    members.join(", "),
                    group
                ));
            }
        }
        self.append_request_construction(method, &fields);
        self.append_dispatch(service, method);
        self.depth -= 1;
        Ok(())
    }

    /// Emits the placeholder tool for a single-direction streaming method in
    /// collect mode. The body deliberately returns a structured error until
    /// stream collection is implemented.
    fn append_collect_tool(
        &mut self,
        service: &ServiceDescriptorProto,
        service_index: i32,
        method: &MethodDescriptorProto,
        method_index: i32,
        client_streaming: bool,
    ) -> Result<(), GenerateError> {
        let ident = sanitize_identifier(&tool_name(method.name(), NameCase::Snake));
        let registered = tool_name(method.name(), self.config.tool_name_case);
        let comment = self
            .index
            .comment(self.file.name(), &[6, service_index, 2, method_index])
            .to_string();

        self.append_decorator(&registered, &comment);
        let prefix = if self.config.async_mode { "async def" } else { "def" };
        let direction = if client_streaming {
            "client-streaming"
        } else {
            "server-streaming"
        };
        if client_streaming {
            self.line(&format!("{} {}(requests: List[dict]) -> dict:", prefix, ident));
            self.depth += 1;
            self.append_docstring(&format!(
                "{} RPC {}; accepts the full request list up front.",
                capitalize(direction),
                method.name()
            ));
        } else {
            let fields = analysis::analyze_fields(method.input_type(), self.index);
            self.line(&format!(
                "{} {}({}) -> dict:",
                prefix,
                ident,
                signature_params(&fields)
            ));
            self.depth += 1;
            self.append_docstring(&format!(
                "{} RPC {}; responses would be collected into a list.",
                capitalize(direction),
                method.name()
            ));
        }
        self.line("# Streaming collect is not implemented yet.");
        self.line(&format!(
            "return {{\"error\": \"NotImplemented\", \"message\": \"{} collect is not implemented for {}.{}\"}}",
            direction,
            service.name(),
            method.name()
        ));
        self.depth -= 1;
        Ok(())
    }

    fn append_decorator(&mut self, registered: &str, comment: &str) {
        if self.config.include_comments && !comment.is_empty() {
            self.line(&format!(
                "@mcp.tool(name=\"{}\", description=\"{}\")",
                registered,
                escape(&collapse(comment))
            ));
        } else {
            self.line(&format!("@mcp.tool(name=\"{}\")", registered));
        }
    }

    fn append_docstring(&mut self, text: &str) {
        let mut lines = text.lines().map(str::trim);
        let first = lines.next().unwrap_or("");
        let rest: Vec<&str> = lines.collect();
        if rest.is_empty() {
            self.line(&format!("\"\"\"{}\"\"\"", first));
            return;
        }
        self.line(&format!("\"\"\"{}", first));
        for (idx, line) in rest.iter().enumerate() {
            if idx + 1 == rest.len() {
                self.line(&format!("{}\"\"\"", line));
            } else {
                self.line(line);
            }
        }
    }

    fn append_request_construction(&mut self, method: &MethodDescriptorProto, fields: &[FieldInfo]) {
        self.line(&format!(
            "request = {}()",
            self.request_class(method.input_type())
        ));
        for field in fields {
            if field.required {
                self.append_assignment(field);
            } else {
                self.line(&format!("if {} is not None:", field.name));
                self.depth += 1;
                self.append_assignment(field);
                self.depth -= 1;
            }
        }
    }

    fn append_assignment(&mut self, field: &FieldInfo) {
        if field.is_map {
            self.line(&format!("request.{}.update({})", field.name, field.name));
        } else if field.repeated {
            self.line(&format!("request.{}.extend({})", field.name, field.name));
        } else {
            self.line(&format!("request.{} = {}", field.name, field.name));
        }
    }

    fn append_dispatch(&mut self, service: &ServiceDescriptorProto, method: &MethodDescriptorProto) {
        let target = self
            .config
            .grpc_target
            .as_deref()
            .unwrap_or(DEFAULT_GRPC_TARGET);
        let stub = format!("{}_grpc.{}Stub(channel)", self.module, service.name());
        let channel_args = if self.config.insecure {
            format!("insecure_channel('{}')", target)
        } else {
            format!("secure_channel('{}', grpc.ssl_channel_credentials())", target)
        };
        let call_args = if self.config.use_request_interceptor {
            format!("request, timeout={}, metadata=metadata", self.config.grpc_timeout)
        } else {
            format!("request, timeout={}", self.config.grpc_timeout)
        };
        if self.config.use_request_interceptor {
            self.line("metadata = []");
            self.line("request, metadata = request_interceptor(request, metadata)");
        }
        if self.config.async_mode {
            self.line(&format!("async with grpc.aio.{} as channel:", channel_args));
            self.depth += 1;
            self.line(&format!("stub = {}", stub));
            self.line(&format!("response = await stub.{}({})", method.name(), call_args));
            self.depth -= 1;
        } else {
            self.line(&format!("channel = grpc.{}", channel_args));
            self.line(&format!("stub = {}", stub));
            self.line(&format!("response = stub.{}({})", method.name(), call_args));
        }
        self.line("result = MessageToDict(response)");
        self.line("return result");
    }

    fn append_main_trailer(&mut self) {
        self.blank();
        self.blank();
        self.line("if __name__ == \"__main__\":");
        self.depth += 1;
        if self.config.server_factory {
            let factories: Vec<String> = self
                .file
                .service
                .iter()
                .map(|s| factory_name(&self.config.function_name_pattern, s.name()))
                .collect();
            if factories.len() > 1 {
                let others = factories[1..]
                    .iter()
                    .map(|f| format!("{}()", f))
                    .join(", ");
                self.line(&format!("# Additional servers: {}.", others));
            }
            self.line(&format!("{}().run()", factories[0]));
        } else {
            self.line("mcp.run()");
        }
        self.depth -= 1;
    }

    /// The request class expression for an input type, relative to the
    /// file's own generated module.
    fn request_class(&self, input_type: &str) -> String {
        let local = if self.file.package().is_empty() {
            input_type.trim_start_matches('.')
        } else {
            let prefix = format!(".{}.", self.file.package());
            input_type
                .strip_prefix(prefix.as_str())
                .unwrap_or_else(|| input_type.trim_start_matches('.'))
        };
        format!("{}.{}", self.module, local)
    }

    fn push_indent(&mut self) {
        for _ in 0..self.depth {
            self.buf.push_str("    ");
        }
    }

    fn line(&mut self, line: &str) {
        self.push_indent();
        self.buf.push_str(line);
        self.buf.push('\n');
    }

    fn blank(&mut self) {
        self.buf.push('\n');
    }
}

/// Signature parameters: required fields first, then everything else with a
/// `None` default, declaration order preserved within each group.
fn signature_params(fields: &[FieldInfo]) -> String {
    let (required, defaulted): (Vec<&FieldInfo>, Vec<&FieldInfo>) = fields
        .iter()
        .partition_map(|field| {
            if field.required {
                Either::Left(field)
            } else {
                Either::Right(field)
            }
        });
    required
        .iter()
        .map(|field| format!("{}: {}", field.name, field.py_type))
        .chain(
            defaulted
                .iter()
                .map(|field| format!("{}: {} = None", field.name, field.py_type)),
        )
        .join(", ")
}

/// Splits a proto path into the generated module's parent package and the
/// bare `*_pb2` module name.
fn python_modules(proto_name: &str) -> (Option<String>, String) {
    let stem = proto_name.strip_suffix(".proto").unwrap_or(proto_name);
    match stem.rsplit_once('/') {
        Some((parent, base)) => (Some(parent.replace('/', ".")), format!("{}_pb2", base)),
        None => (None, format!("{}_pb2", stem)),
    }
}

fn factory_name(pattern: &str, service: &str) -> String {
    sanitize_identifier(&pattern.replace("{service}", &service.to_lowercase()))
}

/// Collapses a multi-line comment to a single line for tool descriptions.
fn collapse(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .join(" ")
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn py_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_file_name() {
        assert_eq!("simple_pb2_mcp.py", output_file_name("simple.proto", "_pb2_mcp.py"));
        assert_eq!(
            "protos/example_mcp_server.py",
            output_file_name("protos/example.proto", "_mcp_server.py")
        );
        // A name without a .proto suffix passes through unchanged.
        assert_eq!("noext", output_file_name("noext", "_pb2_mcp.py"));
    }

    #[test]
    fn test_python_modules() {
        assert_eq!((None, "simple_pb2".to_string()), python_modules("simple.proto"));
        assert_eq!(
            (Some("protos".to_string()), "example_pb2".to_string()),
            python_modules("protos/example.proto")
        );
        assert_eq!(
            (Some("a.b".to_string()), "c_pb2".to_string()),
            python_modules("a/b/c.proto")
        );
    }

    #[test]
    fn test_factory_name() {
        assert_eq!(
            "create_simpleservice_server",
            factory_name("create_{service}_server", "SimpleService")
        );
        assert_eq!("userservice_tools", factory_name("{service}_tools", "UserService"));
    }

    #[test]
    fn test_collapse() {
        assert_eq!("one line", collapse("one line"));
        assert_eq!("first second", collapse("first\n second"));
        assert_eq!("a b c", collapse("a\n\n b\n  c\n"));
    }

    #[test]
    fn test_escape() {
        assert_eq!("say \\\"hi\\\"", escape("say \"hi\""));
        assert_eq!("back\\\\slash", escape("back\\slash"));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!("Client-streaming", capitalize("client-streaming"));
        assert_eq!("", capitalize(""));
    }
}
