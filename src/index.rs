//! A global index over every descriptor in a `CodeGeneratorRequest`.
//!
//! All files in the request are indexed, dependencies included, so that
//! fields in generated files can resolve types declared elsewhere. Names are
//! keyed fully qualified with a leading dot (`.package.Outer.Inner`), the
//! same form `FieldDescriptorProto.type_name` uses; an empty package yields
//! `.Name`.

use std::collections::HashMap;

use log::debug;
use prost_types::{DescriptorProto, EnumDescriptorProto, FileDescriptorProto};

/// Message, enum, and comment lookup tables for a whole request.
#[derive(Debug, Default)]
pub struct TypeIndex<'a> {
    messages: HashMap<String, &'a DescriptorProto>,
    enums: HashMap<String, &'a EnumDescriptorProto>,
    /// Comment text per file, keyed by `source_code_info` location path.
    comments: HashMap<String, HashMap<Vec<i32>, String>>,
}

impl<'a> TypeIndex<'a> {
    pub fn build(files: &'a [FileDescriptorProto]) -> TypeIndex<'a> {
        let mut index = TypeIndex::default();
        for file in files {
            debug!("indexing file: {:?}, package: {:?}", file.name(), file.package());
            index.index_file(file);
        }
        debug!(
            "  indexed {} messages, {} enums",
            index.messages.len(),
            index.enums.len()
        );
        index
    }

    pub fn message(&self, fqn: &str) -> Option<&'a DescriptorProto> {
        self.messages.get(fqn).copied()
    }

    pub fn enum_type(&self, fqn: &str) -> Option<&'a EnumDescriptorProto> {
        self.enums.get(fqn).copied()
    }

    /// The extracted comment for a structural path in a file, `""` when none
    /// was recorded.
    pub fn comment(&self, file: &str, path: &[i32]) -> &str {
        self.comments
            .get(file)
            .and_then(|per_file| per_file.get(path))
            .map(String::as_str)
            .unwrap_or("")
    }

    fn index_file(&mut self, file: &'a FileDescriptorProto) {
        let prefix = if file.package().is_empty() {
            String::new()
        } else {
            format!(".{}", file.package())
        };
        for message in &file.message_type {
            self.index_message(&prefix, message);
        }
        for enum_type in &file.enum_type {
            self.enums
                .insert(format!("{}.{}", prefix, enum_type.name()), enum_type);
        }
        self.index_comments(file);
    }

    /// Indexes a message before descending into its nested messages, then
    /// its nested enums.
    fn index_message(&mut self, prefix: &str, message: &'a DescriptorProto) {
        let fqn = format!("{}.{}", prefix, message.name());
        debug!("  message: {:?}", fqn);
        self.messages.insert(fqn.clone(), message);
        for nested in &message.nested_type {
            self.index_message(&fqn, nested);
        }
        for enum_type in &message.enum_type {
            self.enums
                .insert(format!("{}.{}", fqn, enum_type.name()), enum_type);
        }
    }

    fn index_comments(&mut self, file: &'a FileDescriptorProto) {
        let mut per_file = HashMap::new();
        if let Some(info) = &file.source_code_info {
            for location in &info.location {
                let leading = location.leading_comments().trim();
                let trailing = location.trailing_comments().trim();
                let text = match (leading.is_empty(), trailing.is_empty()) {
                    (true, true) => continue,
                    (false, true) => leading.to_string(),
                    (true, false) => trailing.to_string(),
                    (false, false) => format!("{} {}", leading, trailing),
                };
                per_file.insert(location.path.clone(), text);
            }
        }
        self.comments.insert(file.name().to_string(), per_file);
    }
}

#[cfg(test)]
mod tests {
    use prost_types::source_code_info::Location;
    use prost_types::SourceCodeInfo;

    use super::*;

    fn message(name: &str) -> DescriptorProto {
        DescriptorProto {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn enum_type(name: &str) -> EnumDescriptorProto {
        EnumDescriptorProto {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_nested_names() {
        let mut outer = message("Outer");
        let mut inner = message("Inner");
        inner.nested_type.push(message("Leaf"));
        outer.nested_type.push(inner);
        outer.enum_type.push(enum_type("Kind"));
        let files = vec![FileDescriptorProto {
            name: Some("a.proto".to_string()),
            package: Some("pkg.sub".to_string()),
            message_type: vec![outer],
            enum_type: vec![enum_type("TopKind")],
            ..Default::default()
        }];

        let index = TypeIndex::build(&files);
        assert!(index.message(".pkg.sub.Outer").is_some());
        assert!(index.message(".pkg.sub.Outer.Inner").is_some());
        assert!(index.message(".pkg.sub.Outer.Inner.Leaf").is_some());
        assert!(index.enum_type(".pkg.sub.Outer.Kind").is_some());
        assert!(index.enum_type(".pkg.sub.TopKind").is_some());
        assert!(index.message(".pkg.sub.Missing").is_none());
        assert!(index.message("Outer").is_none());
    }

    #[test]
    fn test_empty_package_names() {
        let files = vec![FileDescriptorProto {
            name: Some("b.proto".to_string()),
            message_type: vec![message("Bare")],
            ..Default::default()
        }];
        let index = TypeIndex::build(&files);
        assert!(index.message(".Bare").is_some());
    }

    #[test]
    fn test_all_files_indexed() {
        let files = vec![
            FileDescriptorProto {
                name: Some("dep.proto".to_string()),
                package: Some("dep".to_string()),
                message_type: vec![message("FromDep")],
                ..Default::default()
            },
            FileDescriptorProto {
                name: Some("main.proto".to_string()),
                package: Some("main".to_string()),
                message_type: vec![message("FromMain")],
                ..Default::default()
            },
        ];
        let index = TypeIndex::build(&files);
        assert!(index.message(".dep.FromDep").is_some());
        assert!(index.message(".main.FromMain").is_some());
    }

    #[test]
    fn test_comment_extraction() {
        let files = vec![FileDescriptorProto {
            name: Some("c.proto".to_string()),
            source_code_info: Some(SourceCodeInfo {
                location: vec![
                    Location {
                        path: vec![6, 0, 2, 0],
                        leading_comments: Some(" Does a thing.\n".to_string()),
                        trailing_comments: Some("  really \n".to_string()),
                        ..Default::default()
                    },
                    Location {
                        path: vec![6, 0],
                        trailing_comments: Some("service trailer".to_string()),
                        ..Default::default()
                    },
                    Location {
                        path: vec![4, 0],
                        ..Default::default()
                    },
                ],
            }),
            ..Default::default()
        }];
        let index = TypeIndex::build(&files);
        // Leading and trailing are each trimmed, then joined with one space.
        assert_eq!("Does a thing. really", index.comment("c.proto", &[6, 0, 2, 0]));
        assert_eq!("service trailer", index.comment("c.proto", &[6, 0]));
        // A location with no comment text is not recorded.
        assert_eq!("", index.comment("c.proto", &[4, 0]));
        assert_eq!("", index.comment("c.proto", &[5, 0]));
        assert_eq!("", index.comment("other.proto", &[6, 0]));
    }

    #[test]
    fn test_missing_source_info() {
        let files = vec![FileDescriptorProto {
            name: Some("d.proto".to_string()),
            ..Default::default()
        }];
        let index = TypeIndex::build(&files);
        assert_eq!("", index.comment("d.proto", &[6, 0]));
    }
}
