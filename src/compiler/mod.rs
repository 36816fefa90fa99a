use crate::ast::{Expression, LogicalOp, VariablePath};
use crate::error::RuleError;
use ahash::AHashMap;
use itertools::Itertools;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

mod builder;
mod optimizer;
pub mod parsing;

use builder::AstBuilder;
use optimizer::AstOptimizer;
use parsing::*;

/// A condition as written in the configuration, together with its compile result.
///
/// Compilation failures are kept rather than raised so that the caller can decide
/// how a broken rule behaves (visibility fails open).
#[derive(Debug, Clone)]
pub struct Rule {
    source: serde_json::Value,
    compiled: Result<Expression, RuleError>,
}

impl Rule {
    /// Wraps an already-built expression.
    pub fn from_expression(expr: Expression) -> Self {
        Self {
            source: serde_json::Value::Null,
            compiled: Ok(expr),
        }
    }

    pub fn source(&self) -> &serde_json::Value {
        &self.source
    }

    pub fn expression(&self) -> Result<&Expression, &RuleError> {
        self.compiled.as_ref()
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.is_ok()
    }

    /// Variable paths the rule reads. A rule that failed to compile reads nothing.
    pub fn referenced_paths(&self) -> HashSet<&VariablePath> {
        let mut paths = HashSet::new();
        if let Ok(expr) = &self.compiled {
            expr.get_referenced_paths(&mut paths);
        }
        paths
    }
}

/// Compiles JSON-Logic rules into optimized `Expression` trees using an explicit
/// operator table. Cheap to clone; the table is shared.
#[derive(Clone)]
pub struct RuleCompiler {
    registry: Arc<AHashMap<String, Arc<dyn OperatorParser>>>,
}

pub struct RuleCompilerBuilder {
    registry: AHashMap<String, Arc<dyn OperatorParser>>,
}

impl RuleCompilerBuilder {
    pub fn new() -> Self {
        let mut registry: AHashMap<String, Arc<dyn OperatorParser>> = AHashMap::new();
        register_default_parsers(&mut registry);
        Self { registry }
    }

    /// Makes `user_operator` behave like the built-in `builtin_operator`.
    /// Unknown built-in names are ignored.
    pub fn with_operator_alias(mut self, user_operator: &str, builtin_operator: &str) -> Self {
        if let Some(parser) = create_parser_by_name(builtin_operator) {
            self.registry.insert(user_operator.to_string(), parser);
        }
        self
    }

    pub fn with_custom_parser(mut self, parser: Arc<dyn OperatorParser>) -> Self {
        self.registry.insert(parser.operator().to_string(), parser);
        self
    }

    pub fn build(self) -> RuleCompiler {
        RuleCompiler {
            registry: Arc::new(self.registry),
        }
    }
}

impl Default for RuleCompilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleCompiler {
    pub fn builder() -> RuleCompilerBuilder {
        RuleCompilerBuilder::new()
    }

    pub fn compile(&self, json: &serde_json::Value) -> Result<Expression, RuleError> {
        let naive_ast = AstBuilder::new(&self.registry).build(json)?;
        Ok(AstOptimizer::new().optimize(naive_ast))
    }

    pub fn compile_rule(&self, json: &serde_json::Value) -> Rule {
        Rule {
            source: json.clone(),
            compiled: self.compile(json),
        }
    }

    /// Compiles a `conditions` entry: a single rule object, or an array of rule
    /// objects combined with an implicit AND.
    pub fn compile_conditions(&self, json: &serde_json::Value) -> Rule {
        let compiled = match json {
            serde_json::Value::Array(rules) => rules
                .iter()
                .map(|rule| AstBuilder::new(&self.registry).build(rule))
                .collect::<Result<Vec<_>, _>>()
                .map(|operands| {
                    AstOptimizer::new().optimize(Expression::Logical(LogicalOp::And, operands))
                }),
            single => self.compile(single),
        };
        Rule {
            source: json.clone(),
            compiled,
        }
    }

    pub fn supports(&self, operator: &str) -> bool {
        self.registry.contains_key(operator)
    }

    /// Registered operator names, sorted.
    pub fn operators(&self) -> Vec<&str> {
        self.registry.keys().map(String::as_str).sorted().collect()
    }
}

impl Default for RuleCompiler {
    fn default() -> Self {
        RuleCompilerBuilder::new().build()
    }
}

impl fmt::Debug for RuleCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleCompiler")
            .field("operators", &self.operators())
            .finish()
    }
}
