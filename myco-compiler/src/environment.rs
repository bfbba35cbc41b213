use std::collections::HashMap;

use thiserror::Error;

use crate::types::Type;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvironmentError {
    #[error("Variable already declared in this scope: '{0}'")]
    AlreadyDeclared(String),
    #[error("Undefined variable '{0}'")]
    Undefined(String),
}

#[derive(Debug, Clone)]
struct Binding {
    ty: Type,
    is_const: bool,
}

/// Chain of lexical scopes. The last scope is the innermost; lookups walk
/// outward toward the global scope at index 0.
#[derive(Debug, Clone)]
pub struct TypeEnvironment {
    scopes: Vec<HashMap<String, Binding>>,
}

impl Default for TypeEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeEnvironment {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// The global scope is never popped.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn add_variable(&mut self, name: &str, ty: Type) -> Result<(), EnvironmentError> {
        self.declare(name, ty, false)
    }

    pub fn add_constant(&mut self, name: &str, ty: Type) -> Result<(), EnvironmentError> {
        self.declare(name, ty, true)
    }

    fn declare(&mut self, name: &str, ty: Type, is_const: bool) -> Result<(), EnvironmentError> {
        let scope = self.innermost();
        if scope.contains_key(name) {
            return Err(EnvironmentError::AlreadyDeclared(name.to_string()));
        }
        scope.insert(name.to_string(), Binding { ty, is_const });
        Ok(())
    }

    pub fn lookup_variable(&self, name: &str) -> Option<Type> {
        self.find(name).map(|binding| binding.ty.clone())
    }

    pub fn is_constant(&self, name: &str) -> bool {
        self.find(name).map(|binding| binding.is_const).unwrap_or(false)
    }

    /// Replaces the type of the nearest binding named `name`.
    pub fn update_variable(&mut self, name: &str, ty: Type) -> Result<(), EnvironmentError> {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(binding) = scope.get_mut(name) {
                binding.ty = ty;
                return Ok(());
            }
        }
        Err(EnvironmentError::Undefined(name.to_string()))
    }

    fn find(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn innermost(&mut self) -> &mut HashMap<String, Binding> {
        if self.scopes.is_empty() {
            self.scopes.push(HashMap::new());
        }
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_redeclaration_in_same_scope() {
        let mut env = TypeEnvironment::new();
        env.add_variable("x", Type::Int).unwrap();
        assert_eq!(
            env.add_variable("x", Type::String),
            Err(EnvironmentError::AlreadyDeclared("x".to_string()))
        );
    }

    #[test]
    fn nested_scope_shadows_and_restores() {
        let mut env = TypeEnvironment::new();
        env.add_variable("x", Type::Int).unwrap();
        env.push_scope();
        env.add_variable("x", Type::String).unwrap();
        assert_eq!(env.lookup_variable("x"), Some(Type::String));
        env.pop_scope();
        assert_eq!(env.lookup_variable("x"), Some(Type::Int));
    }

    #[test]
    fn update_reaches_enclosing_scope() {
        let mut env = TypeEnvironment::new();
        env.add_variable("total", Type::Unknown).unwrap();
        env.push_scope();
        env.update_variable("total", Type::Float).unwrap();
        env.pop_scope();
        assert_eq!(env.lookup_variable("total"), Some(Type::Float));
        assert_eq!(
            env.update_variable("missing", Type::Int),
            Err(EnvironmentError::Undefined("missing".to_string()))
        );
    }

    #[test]
    fn constants_are_tracked_per_binding() {
        let mut env = TypeEnvironment::new();
        env.add_constant("limit", Type::Int).unwrap();
        env.push_scope();
        env.add_variable("limit", Type::Int).unwrap();
        assert!(!env.is_constant("limit"));
        env.pop_scope();
        assert!(env.is_constant("limit"));
    }

    #[test]
    fn global_scope_survives_extra_pops() {
        let mut env = TypeEnvironment::new();
        env.pop_scope();
        env.pop_scope();
        assert_eq!(env.depth(), 1);
        env.add_variable("x", Type::Bool).unwrap();
        assert_eq!(env.lookup_variable("x"), Some(Type::Bool));
    }
}
