//! Per-message field classification feeding signature emission.
//!
//! Oneof rule: a oneof group is synthetic iff every member field carries
//! `proto3_optional`; any other group is real. Synthetic groups are invisible
//! downstream, while membership in a real group makes a field optional and
//! forces an `Optional[...]` hint.

use std::collections::HashSet;

use log::debug;
use multimap::MultiMap;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, FileDescriptorProto};

use crate::index::TypeIndex;
use crate::type_map;

/// A classified field of a method input message.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    /// Python hint text, already `Optional[...]`-wrapped for real-oneof
    /// members.
    pub py_type: String,
    pub proto_type: Type,
    pub type_name: Option<String>,
    /// Neither optional, repeated, nor a map: emitted without a default.
    pub required: bool,
    /// `proto3_optional` or member of a real oneof group.
    pub optional: bool,
    /// Repeated and not a map; maps are not treated as repeated.
    pub repeated: bool,
    pub is_map: bool,
    /// The owning real oneof group, when there is one.
    pub oneof_name: Option<String>,
}

impl FieldInfo {
    pub fn is_oneof(&self) -> bool {
        self.oneof_name.is_some()
    }
}

/// Classifies the fields of the message named `message_fqn`.
///
/// An unindexed message yields no fields; generation continues with a
/// parameterless tool rather than failing.
pub fn analyze_fields(message_fqn: &str, index: &TypeIndex) -> Vec<FieldInfo> {
    match index.message(message_fqn) {
        Some(message) => analyze_message(message, index),
        None => {
            debug!("  message {:?} not indexed, emitting no fields", message_fqn);
            Vec::new()
        }
    }
}

/// Classifies the fields of a message descriptor, in declaration order.
pub fn analyze_message(message: &DescriptorProto, index: &TypeIndex) -> Vec<FieldInfo> {
    let real_groups = real_oneof_index_set(message);
    message
        .field
        .iter()
        .map(|field| {
            let is_map = type_map::is_map_field(field, index);
            let repeated = !is_map && field.label() == Label::Repeated;
            let oneof_name = field.oneof_index.and_then(|group| {
                if real_groups.contains(&group) {
                    message
                        .oneof_decl
                        .get(group as usize)
                        .map(|oneof| oneof.name().to_string())
                } else {
                    None
                }
            });
            let optional = field.proto3_optional() || oneof_name.is_some();
            let mut py_type = type_map::field_type(field, index);
            if oneof_name.is_some() && !py_type.starts_with("Optional[") {
                py_type = format!("Optional[{}]", py_type);
            }
            FieldInfo {
                name: field.name().to_string(),
                py_type,
                proto_type: field.r#type(),
                type_name: if field.type_name().is_empty() {
                    None
                } else {
                    Some(field.type_name().to_string())
                },
                required: !optional && !repeated && !is_map,
                optional,
                repeated,
                is_map,
                oneof_name,
            }
        })
        .collect()
}

/// Real oneof groups of a message, each with its member field names in
/// declaration order. Feeds the advisory comments in generated tools.
pub fn real_oneof_groups(message: &DescriptorProto) -> Vec<(String, Vec<String>)> {
    let real_groups = real_oneof_index_set(message);
    let mut members: MultiMap<i32, &str> = MultiMap::new();
    for field in &message.field {
        if let Some(group) = field.oneof_index {
            members.insert(group, field.name());
        }
    }
    message
        .oneof_decl
        .iter()
        .enumerate()
        .filter(|(group, _)| real_groups.contains(&(*group as i32)))
        .filter_map(|(group, oneof)| {
            members.get_vec(&(group as i32)).map(|names| {
                (
                    oneof.name().to_string(),
                    names.iter().map(|n| n.to_string()).collect(),
                )
            })
        })
        .collect()
}

/// True when any service method input message in the file has an optional
/// parameter. Gates the generated `Optional` import.
pub fn file_has_optional_fields(file: &FileDescriptorProto, index: &TypeIndex) -> bool {
    file.service
        .iter()
        .flat_map(|service| &service.method)
        .any(|method| {
            analyze_fields(method.input_type(), index)
                .iter()
                .any(|field| field.optional)
        })
}

fn real_oneof_index_set(message: &DescriptorProto) -> HashSet<i32> {
    let mut members: MultiMap<i32, bool> = MultiMap::new();
    for field in &message.field {
        if let Some(group) = field.oneof_index {
            members.insert(group, field.proto3_optional());
        }
    }
    members
        .iter_all()
        .filter(|(_, presence)| !presence.iter().all(|synthetic| *synthetic))
        .map(|(group, _)| *group)
        .collect()
}
