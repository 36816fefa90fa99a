//! The rule interpreter: an explicitly constructed operator table plus an
//! injected clock. There is no global registration; every form holds its own
//! `Interpreter` (cheap to clone).

use crate::ast::{EvaluationTrace, Expression, Value, VariablePath};
use crate::compiler::{Rule, RuleCompiler, RuleCompilerBuilder};
use crate::compiler::parsing::OperatorParser;
use crate::data::Environment;
use crate::error::RuleError;
use chrono::NaiveDate;
use std::fmt;
use std::sync::Arc;

mod calendar;
mod engine;

pub use calendar::{
    Clock, DATE_FORMAT, FixedClock, SystemClock, format_date, parse_date, whole_years_between,
};
pub(crate) use engine::AstEngine;

#[derive(Clone)]
pub struct Interpreter {
    compiler: RuleCompiler,
    clock: Arc<dyn Clock>,
}

pub struct InterpreterBuilder {
    compiler: RuleCompilerBuilder,
    clock: Arc<dyn Clock>,
}

impl InterpreterBuilder {
    pub fn new() -> Self {
        Self {
            compiler: RuleCompilerBuilder::new(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_operator_alias(mut self, user_operator: &str, builtin_operator: &str) -> Self {
        self.compiler = self
            .compiler
            .with_operator_alias(user_operator, builtin_operator);
        self
    }

    pub fn with_custom_parser(mut self, parser: Arc<dyn OperatorParser>) -> Self {
        self.compiler = self.compiler.with_custom_parser(parser);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Pins `CurrentDate` to a fixed date.
    pub fn with_today(self, today: NaiveDate) -> Self {
        self.with_clock(FixedClock(today))
    }

    pub fn build(self) -> Interpreter {
        Interpreter {
            compiler: self.compiler.build(),
            clock: self.clock,
        }
    }
}

impl Default for InterpreterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        InterpreterBuilder::new().build()
    }

    pub fn builder() -> InterpreterBuilder {
        InterpreterBuilder::new()
    }

    pub fn compiler(&self) -> &RuleCompiler {
        &self.compiler
    }

    pub fn compile(&self, json: &serde_json::Value) -> Result<Expression, RuleError> {
        self.compiler.compile(json)
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Starts an evaluation pass over an immutable snapshot. The clock is read
    /// exactly once, here.
    pub fn begin_pass<'a>(&'a self, env: &'a Environment) -> EvaluationPass<'a> {
        self.begin_pass_at(env, self.clock.today())
    }

    /// Starts a pass with an evaluation date the caller already read, so that
    /// several snapshots taken during one user action agree on `CurrentDate`.
    pub fn begin_pass_at<'a>(&'a self, env: &'a Environment, today: NaiveDate) -> EvaluationPass<'a> {
        EvaluationPass {
            interpreter: self,
            env,
            row: None,
            today,
        }
    }

    pub fn evaluate(&self, expr: &Expression, env: &Environment) -> Value {
        self.begin_pass(env).evaluate(expr)
    }

    /// Evaluates a configured rule. A rule that failed to compile reports its `RuleError`.
    pub fn evaluate_rule(&self, rule: &Rule, env: &Environment) -> Result<Value, RuleError> {
        self.begin_pass(env).evaluate_rule(rule)
    }

    /// Compiles and evaluates a JSON-Logic document in one step.
    pub fn evaluate_json(
        &self,
        json: &serde_json::Value,
        env: &Environment,
    ) -> Result<Value, RuleError> {
        let expr = self.compile(json)?;
        Ok(self.evaluate(&expr, env))
    }

    pub fn explain(&self, expr: &Expression, env: &Environment) -> EvaluationTrace {
        self.begin_pass(env).trace(expr)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("compiler", &self.compiler)
            .field("clock", &self.clock)
            .finish()
    }
}

/// One synchronous evaluation pass: a borrowed environment snapshot and the
/// single evaluation date shared by every rule evaluated through it.
///
/// A pass scoped to an array row resolves variables against that row's
/// entries before the snapshot.
#[derive(Clone, Copy)]
pub struct EvaluationPass<'a> {
    interpreter: &'a Interpreter,
    env: &'a Environment,
    row: Option<&'a Value>,
    today: NaiveDate,
}

impl<'a> EvaluationPass<'a> {
    pub fn interpreter(&self) -> &'a Interpreter {
        self.interpreter
    }

    pub fn env(&self) -> &'a Environment {
        self.env
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// The same pass, scoped to one array row.
    pub fn in_row<'r>(&self, row: &'r Value) -> EvaluationPass<'r>
    where
        'a: 'r,
    {
        EvaluationPass {
            interpreter: self.interpreter,
            env: self.env,
            row: Some(row),
            today: self.today,
        }
    }

    pub fn resolve(&self, path: &VariablePath) -> Value {
        match self.row {
            Some(row) => self.env.resolve_in_row(row, path),
            None => self.env.resolve(path),
        }
    }

    pub fn resolve_str(&self, path: &str) -> Value {
        self.resolve(&VariablePath::parse(path))
    }

    pub fn trace(&self, expr: &Expression) -> EvaluationTrace {
        AstEngine::new(self.env, self.today)
            .in_row(self.row)
            .evaluate(expr)
    }

    pub fn evaluate(&self, expr: &Expression) -> Value {
        self.trace(expr).into_outcome()
    }

    pub fn trace_rule(&self, rule: &Rule) -> Result<EvaluationTrace, RuleError> {
        rule.expression()
            .map(|expr| self.trace(expr))
            .map_err(Clone::clone)
    }

    pub fn evaluate_rule(&self, rule: &Rule) -> Result<Value, RuleError> {
        self.trace_rule(rule).map(EvaluationTrace::into_outcome)
    }
}
