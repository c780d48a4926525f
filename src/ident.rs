//! Utility functions for working with generated tool and function names.

use heck::{ToKebabCase, ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};

/// Case style applied to generated tool function names.
///
/// Selected with the `tool_name_case` plugin parameter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NameCase {
    #[default]
    Snake,
    Camel,
    Pascal,
    Kebab,
}

impl NameCase {
    /// Parses a `tool_name_case` parameter value.
    ///
    /// Unrecognized values fall back to `Snake`; parameter validation reports
    /// them separately.
    pub fn from_param(value: &str) -> NameCase {
        match value.to_ascii_lowercase().as_str() {
            "camel" => NameCase::Camel,
            "pascal" => NameCase::Pascal,
            "kebab" => NameCase::Kebab,
            _ => NameCase::Snake,
        }
    }
}

/// Converts an RPC method name to a tool name in the requested case style.
pub fn tool_name(method: &str, case: NameCase) -> String {
    match case {
        NameCase::Snake => method.to_snake_case(),
        NameCase::Camel => method.to_lower_camel_case(),
        NameCase::Pascal => method.to_upper_camel_case(),
        NameCase::Kebab => method.to_kebab_case(),
    }
}

/// Escapes Python keywords by appending an underscore, so an emitted `def`
/// statement stays parseable even for an RPC named `Return`.
pub fn sanitize_identifier(name: &str) -> String {
    match name {
        "False" | "None" | "True" | "and" | "as" | "assert" | "async" | "await" | "break"
        | "class" | "continue" | "def" | "del" | "elif" | "else" | "except" | "finally"
        | "for" | "from" | "global" | "if" | "import" | "in" | "is" | "lambda" | "nonlocal"
        | "not" | "or" | "pass" | "raise" | "return" | "try" | "while" | "with" | "yield" => {
            format!("{}_", name)
        }
        _ => name.to_string(),
    }
}
