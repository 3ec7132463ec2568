use std::collections::HashMap;
use std::fmt;

use crate::ast::{ASTNode, Prototype};

#[derive(Debug, PartialEq, Clone, thiserror::Error)]
pub enum CodegenError {
    #[error("unknown variable referenced {0}")]
    UnknownVariable(String),
    #[error("unknown operator {0}")]
    UnknownOperator(char),
    #[error("unknown function {0}")]
    UnknownFunction(String),
    #[error("invalid number of args in call {0} expected {1} found {2}")]
    ArgumentCountMismatch(String, usize, usize),
    #[error("duplicate parameter {1} in prototype of {0}")]
    DuplicateParameter(String, String),
    #[error("function {0} is already defined")]
    Redefinition(String),
    #[error("failed to verify function {0}")]
    InvalidFunction(String),
}

/// Consumes each completed top-level construct.
pub trait Backend {
    type Output: fmt::Display;

    fn generate(&mut self, node: ASTNode) -> Result<Self::Output, CodegenError>;
}

/// Parameter name to value map for the body currently being generated.
#[derive(Debug, Clone)]
pub struct Bindings<V> {
    values: HashMap<String, V>,
}

impl<V> std::default::Default for Bindings<V> {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
        }
    }
}

impl<V: Copy> Bindings<V> {
    /// Bind `proto`'s parameters, in order, to `values`.
    pub fn bind<I>(proto: &Prototype, values: I) -> Result<Self, CodegenError>
    where
        I: IntoIterator<Item = V>,
    {
        let mut values_iter = values.into_iter();
        let mut bindings = HashMap::with_capacity(proto.args.len());
        for (found, name) in proto.args.iter().enumerate() {
            let value = values_iter.next().ok_or_else(|| {
                CodegenError::ArgumentCountMismatch(proto.name.clone(), proto.args.len(), found)
            })?;
            if bindings.insert(name.clone(), value).is_some() {
                return Err(CodegenError::DuplicateParameter(
                    proto.name.clone(),
                    name.clone(),
                ));
            }
        }
        let extra = values_iter.count();
        if extra > 0 {
            return Err(CodegenError::ArgumentCountMismatch(
                proto.name.clone(),
                proto.args.len(),
                proto.args.len() + extra,
            ));
        }

        Ok(Self { values: bindings })
    }

    pub fn lookup(&self, name: &str) -> Result<V, CodegenError> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| CodegenError::UnknownVariable(name.to_string()))
    }
}
