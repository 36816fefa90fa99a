use crate::ast::{Expression, Value};
use crate::compiler::parsing::OperatorParser;
use crate::error::RuleError;
use ahash::AHashMap;
use serde_json::Value as Json;
use std::sync::Arc;

/// Responsible for building the initial, unoptimized AST from a JSON-Logic document.
pub(super) struct AstBuilder<'a> {
    registry: &'a AHashMap<String, Arc<dyn OperatorParser>>,
}

impl<'a> AstBuilder<'a> {
    pub(super) fn new(registry: &'a AHashMap<String, Arc<dyn OperatorParser>>) -> Self {
        Self { registry }
    }

    /// Recursively builds the AST for one JSON node.
    pub(super) fn build(&self, json: &Json) -> Result<Expression, RuleError> {
        match json {
            Json::Object(map) => {
                if map.len() != 1 {
                    return Err(RuleError::Malformed(format!(
                        "a rule object must hold exactly one operator, found {}",
                        map.len()
                    )));
                }
                let Some((operator, raw_args)) = map.iter().next() else {
                    return Err(RuleError::Malformed("empty rule object".to_string()));
                };
                let parser = self.registry.get(operator.as_str()).ok_or_else(|| {
                    RuleError::UnknownOperator {
                        operator: operator.clone(),
                    }
                })?;
                let args = self.build_args(raw_args)?;
                parser.parse(args)
            }
            Json::Array(items) => self.build_list(items),
            scalar => Ok(Expression::Literal(Value::from(scalar.clone()))),
        }
    }

    /// JSON-Logic allows a lone argument in place of a one-element array.
    fn build_args(&self, raw_args: &Json) -> Result<Vec<Expression>, RuleError> {
        match raw_args {
            Json::Array(items) => items.iter().map(|item| self.build(item)).collect(),
            single => Ok(vec![self.build(single)?]),
        }
    }

    /// Arrays of plain values stay literals; arrays holding rules become a `List`.
    fn build_list(&self, items: &[Json]) -> Result<Expression, RuleError> {
        let built: Vec<Expression> = items
            .iter()
            .map(|item| self.build(item))
            .collect::<Result<_, _>>()?;
        if built.iter().all(|e| matches!(e, Expression::Literal(_))) {
            let values = built
                .into_iter()
                .filter_map(|e| match e {
                    Expression::Literal(v) => Some(v),
                    _ => None,
                })
                .collect();
            Ok(Expression::Literal(Value::Array(values)))
        } else {
            Ok(Expression::List(built))
        }
    }
}
