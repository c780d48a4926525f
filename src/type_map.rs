//! Mapping from protobuf field types to Python type-hint text.
//!
//! Precedence: map fields become `Dict[K, V]`, repeated fields `List[T]`,
//! `proto3_optional` fields `Optional[T]`, then the singular base mapping.
//! Message types resolve through the well-known table below or degrade to
//! `dict`; enums are `int`; anything unmapped is `Any`, never an error.

use log::debug;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::FieldDescriptorProto;

use crate::index::TypeIndex;

/// The Python type-hint text for a field.
pub fn field_type(field: &FieldDescriptorProto, index: &TypeIndex) -> String {
    if is_map_field(field, index) {
        let (key, value) = map_types(field, index);
        return format!("Dict[{}, {}]", key, value);
    }
    if field.label() == Label::Repeated {
        return format!("List[{}]", singular_type(field));
    }
    if field.proto3_optional() {
        return format!("Optional[{}]", singular_type(field));
    }
    singular_type(field)
}

/// Whether the field is a protobuf map: repeated, message-typed, and its
/// entry descriptor carries the `map_entry` option.
pub fn is_map_field(field: &FieldDescriptorProto, index: &TypeIndex) -> bool {
    field.label() == Label::Repeated
        && field.r#type() == Type::Message
        && index
            .message(field.type_name())
            .map(|entry| entry.options.as_ref().map(|o| o.map_entry()).unwrap_or(false))
            .unwrap_or(false)
}

/// Key and value hints for a map field, from the synthetic entry message's
/// fields number 1 and 2. An unresolvable entry degrades to `(str, Any)`.
pub fn map_types(field: &FieldDescriptorProto, index: &TypeIndex) -> (String, String) {
    let entry = match index.message(field.type_name()) {
        Some(entry) => entry,
        None => return ("str".to_string(), "Any".to_string()),
    };
    let key = entry
        .field
        .iter()
        .find(|f| f.number() == 1)
        .map(|f| scalar_type(f.r#type()).to_string())
        .unwrap_or_else(|| "str".to_string());
    let value = entry
        .field
        .iter()
        .find(|f| f.number() == 2)
        .map(singular_type)
        .unwrap_or_else(|| "Any".to_string());
    (key, value)
}

/// The singular mapping, ignoring labels and presence.
fn singular_type(field: &FieldDescriptorProto) -> String {
    match field.r#type() {
        Type::Message => well_known_type(field.type_name())
            .unwrap_or("dict")
            .to_string(),
        Type::Enum => "int".to_string(),
        ty => scalar_type(ty).to_string(),
    }
}

/// The Python hint for a scalar descriptor type.
pub fn scalar_type(ty: Type) -> &'static str {
    match ty {
        Type::Double | Type::Float => "float",
        Type::Int64
        | Type::Uint64
        | Type::Int32
        | Type::Fixed64
        | Type::Fixed32
        | Type::Uint32
        | Type::Sfixed32
        | Type::Sfixed64
        | Type::Sint32
        | Type::Sint64 => "int",
        Type::Bool => "bool",
        Type::String => "str",
        Type::Bytes => "bytes",
        ty => {
            debug!("    no scalar mapping for {:?}, using Any", ty);
            "Any"
        }
    }
}

/// The Python hint for a well-known protobuf type, if there is one.
pub fn well_known_type(fqn: &str) -> Option<&'static str> {
    let hint = match fqn {
        ".google.protobuf.Timestamp" => "str",
        ".google.protobuf.Duration" => "str",
        ".google.protobuf.Empty" => "None",
        ".google.protobuf.Any" => "dict",
        ".google.protobuf.Struct" => "dict",
        ".google.protobuf.Value" => "Any",
        ".google.protobuf.ListValue" => "List[Any]",
        ".google.protobuf.StringValue" => "str",
        ".google.protobuf.BytesValue" => "bytes",
        ".google.protobuf.Int32Value"
        | ".google.protobuf.Int64Value"
        | ".google.protobuf.UInt32Value"
        | ".google.protobuf.UInt64Value" => "int",
        ".google.protobuf.FloatValue" | ".google.protobuf.DoubleValue" => "float",
        ".google.protobuf.BoolValue" => "bool",
        _ => return None,
    };
    Some(hint)
}
