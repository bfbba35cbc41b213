//! Result types guessed from member and method names. These rules are not
//! sound; they give tooling something better than `Unknown` for common
//! library calls on values the checker cannot see into.

use crate::types::Type;

pub fn member_type(name: &str) -> Type {
    match name {
        "length" | "size" | "count" | "indexOf" => Type::Int,
        "speak" | "name" | "toString" | "upper" | "lower" | "trim" | "join" | "type" => {
            Type::String
        }
        "active" | "enabled" | "contains" | "isEmpty" | "startsWith" | "endsWith" => Type::Bool,
        "push" | "pop" | "get" | "first" | "last" => Type::Any,
        "map" | "filter" | "slice" | "split" | "keys" | "values" | "reverse" | "sort" => {
            Type::Array(None)
        }
        _ => Type::Unknown,
    }
}
