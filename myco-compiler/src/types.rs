use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Float,
    String,
    Bool,
    Null,
    Any,
    /// Inference could not decide. Accepted everywhere.
    Unknown,
    /// An earlier error was already reported for this value.
    Error,
    /// `None` when the element type is unknown or mixed.
    Array(Option<Box<Type>>),
    HashMap(Box<Type>, Box<Type>),
    Set(Box<Type>),
    Function(Vec<Type>, Box<Type>),
    Class(String),
    /// Never empty. Build through [`Type::union`].
    Union(Vec<Type>),
    Optional(Box<Type>),
    Generic {
        parameters: Vec<String>,
        constraints: Vec<Option<Type>>,
        base: Box<Type>,
    },
    GenericParameter {
        name: String,
        constraint: Option<Box<Type>>,
    },
}

/// Answers nominal subtyping questions for class types.
pub trait ClassHierarchy {
    fn is_subclass(&self, class: &str, ancestor: &str) -> bool;
}

struct FlatHierarchy;

impl ClassHierarchy for FlatHierarchy {
    fn is_subclass(&self, _class: &str, _ancestor: &str) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenericError {
    #[error("type {0} is not generic")]
    NotGeneric(String),
    #[error("expected {expected} type arguments, found {found}")]
    ArityMismatch { expected: usize, found: usize },
    #[error("type argument {argument} does not satisfy constraint {constraint} on '{parameter}'")]
    ConstraintViolation {
        parameter: String,
        argument: String,
        constraint: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Loose,
    Strict,
}

impl Type {
    pub fn array_of(element: Type) -> Self {
        Type::Array(Some(Box::new(element)))
    }

    pub fn optional(inner: Type) -> Self {
        match inner {
            Type::Optional(_) => inner,
            other => Type::Optional(Box::new(other)),
        }
    }

    /// Flattens nested unions and drops duplicates. A single distinct
    /// member is returned as itself.
    pub fn union(first: Type, rest: impl IntoIterator<Item = Type>) -> Self {
        let mut members: Vec<Type> = Vec::new();
        for ty in std::iter::once(first).chain(rest) {
            let flattened = match ty {
                Type::Union(inner) => inner,
                other => vec![other],
            };
            for member in flattened {
                if !members.contains(&member) {
                    members.push(member);
                }
            }
        }

        if members.len() == 1 {
            members.remove(0)
        } else {
            Type::Union(members)
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Type::Int => "Int".to_string(),
            Type::Float => "Float".to_string(),
            Type::String => "String".to_string(),
            Type::Bool => "Bool".to_string(),
            Type::Null => "Null".to_string(),
            Type::Any => "Any".to_string(),
            Type::Unknown => "Unknown".to_string(),
            Type::Error => "Error".to_string(),
            Type::Array(None) => "Array".to_string(),
            Type::Array(Some(element)) => format!("[{}]", element.describe()),
            Type::HashMap(key, value) => {
                format!("HashMap<{}, {}>", key.describe(), value.describe())
            }
            Type::Set(element) => format!("Set<{}>", element.describe()),
            Type::Function(params, return_type) => {
                let joined = params
                    .iter()
                    .map(|param| param.describe())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({joined}) -> {}", return_type.describe())
            }
            Type::Class(name) => name.clone(),
            Type::Union(members) => members
                .iter()
                .map(|member| member.describe())
                .collect::<Vec<_>>()
                .join(" | "),
            Type::Optional(inner) => match inner.as_ref() {
                Type::Union(_) | Type::Function(..) => format!("({})?", inner.describe()),
                _ => format!("{}?", inner.describe()),
            },
            Type::Generic {
                parameters, base, ..
            } => format!("{}<{}>", base.describe(), parameters.join(", ")),
            Type::GenericParameter { name, .. } => name.clone(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    /// `Any` or `Unknown`: no static information to check against.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Type::Any | Type::Unknown)
    }

    /// Whether a value of type `actual` may be used where `self` is expected.
    /// Int and Float coerce into each other.
    pub fn is_compatible(&self, actual: &Type) -> bool {
        compatible(self, actual, Mode::Loose, &FlatHierarchy)
    }

    /// Like [`Type::is_compatible`] but without numeric coercion, including
    /// inside array element types. Used for explicitly declared types.
    pub fn is_strictly_compatible(&self, actual: &Type) -> bool {
        compatible(self, actual, Mode::Strict, &FlatHierarchy)
    }

    pub fn is_compatible_in(&self, actual: &Type, classes: &dyn ClassHierarchy) -> bool {
        compatible(self, actual, Mode::Loose, classes)
    }

    pub fn is_strictly_compatible_in(&self, actual: &Type, classes: &dyn ClassHierarchy) -> bool {
        compatible(self, actual, Mode::Strict, classes)
    }

    /// Checks `arguments` against a generic type's parameters and returns its
    /// base type. Parameters inside the base are left unsubstituted.
    pub fn instantiate_generic(&self, arguments: &[Type]) -> Result<Type, GenericError> {
        let Type::Generic {
            parameters,
            constraints,
            base,
        } = self
        else {
            return Err(GenericError::NotGeneric(self.describe()));
        };

        if parameters.len() != arguments.len() {
            return Err(GenericError::ArityMismatch {
                expected: parameters.len(),
                found: arguments.len(),
            });
        }

        for (index, (parameter, argument)) in parameters.iter().zip(arguments).enumerate() {
            if let Some(Some(constraint)) = constraints.get(index) {
                if !constraint.is_compatible(argument) {
                    return Err(GenericError::ConstraintViolation {
                        parameter: parameter.clone(),
                        argument: argument.describe(),
                        constraint: constraint.describe(),
                    });
                }
            }
        }

        Ok(base.as_ref().clone())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Serialized as its display form, e.g. `"[Int]"`.
impl Serialize for Type {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn compatible(expected: &Type, actual: &Type, mode: Mode, classes: &dyn ClassHierarchy) -> bool {
    let check = |expected: &Type, actual: &Type| compatible(expected, actual, mode, classes);

    match (expected, actual) {
        (Type::Any | Type::Unknown | Type::Error, _) | (_, Type::Any | Type::Unknown | Type::Error) => {
            true
        }
        (_, Type::Union(members)) => members.iter().all(|member| check(expected, member)),
        (Type::Union(members), _) => members.iter().any(|member| check(member, actual)),
        (Type::Optional(_), Type::Null) => true,
        (Type::Optional(inner), Type::Optional(actual_inner)) => check(inner, actual_inner),
        (Type::Optional(inner), _) => check(inner, actual),
        (Type::GenericParameter { constraint, .. }, _) => constraint
            .as_deref()
            .map_or(true, |constraint| check(constraint, actual)),
        (_, Type::GenericParameter { constraint, .. }) => constraint
            .as_deref()
            .map_or(true, |constraint| check(expected, constraint)),
        (Type::Generic { base, .. }, _) => check(base, actual),
        (_, Type::Generic { base, .. }) => check(expected, base),
        (Type::Int, Type::Float) | (Type::Float, Type::Int) => mode == Mode::Loose,
        (Type::Array(_), Type::Array(None)) | (Type::Array(None), Type::Array(_)) => true,
        (Type::Array(Some(expected_element)), Type::Array(Some(actual_element))) => {
            check(expected_element, actual_element)
        }
        (Type::HashMap(expected_key, expected_value), Type::HashMap(actual_key, actual_value)) => {
            check(expected_key, actual_key) && check(expected_value, actual_value)
        }
        (Type::Set(expected_element), Type::Set(actual_element)) => {
            check(expected_element, actual_element)
        }
        (
            Type::Function(expected_params, expected_return),
            Type::Function(actual_params, actual_return),
        ) => {
            expected_params.len() == actual_params.len()
                && expected_params
                    .iter()
                    .zip(actual_params)
                    .all(|(expected, actual)| check(expected, actual))
                && check(expected_return, actual_return)
        }
        (Type::Class(expected_name), Type::Class(actual_name)) => {
            expected_name == actual_name || classes.is_subclass(actual_name, expected_name)
        }
        _ => expected == actual,
    }
}
