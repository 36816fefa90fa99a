use super::Value;

/// A record of how an expression was evaluated, including intermediate values.
#[derive(Debug, Clone)]
pub enum EvaluationTrace {
    BinaryOp {
        op_symbol: &'static str,
        left: Box<EvaluationTrace>,
        right: Box<EvaluationTrace>,
        outcome: Value,
    },
    UnaryOp {
        op_symbol: &'static str,
        child: Box<EvaluationTrace>,
        outcome: Value,
    },
    /// AND / OR over any number of operands. Operands skipped by short-circuiting
    /// are not recorded.
    NaryOp {
        op_symbol: &'static str,
        operands: Vec<EvaluationTrace>,
        outcome: Value,
    },
    Call {
        name: &'static str,
        args: Vec<EvaluationTrace>,
        outcome: Value,
    },
    Branch {
        condition: Box<EvaluationTrace>,
        taken: Box<EvaluationTrace>,
        outcome: Value,
    },
    Leaf {
        source: String,
        value: Value,
    },
}

impl EvaluationTrace {
    pub fn get_outcome(&self) -> &Value {
        match self {
            EvaluationTrace::BinaryOp { outcome, .. }
            | EvaluationTrace::UnaryOp { outcome, .. }
            | EvaluationTrace::NaryOp { outcome, .. }
            | EvaluationTrace::Call { outcome, .. }
            | EvaluationTrace::Branch { outcome, .. } => outcome,
            EvaluationTrace::Leaf { value, .. } => value,
        }
    }

    pub fn into_outcome(self) -> Value {
        match self {
            EvaluationTrace::BinaryOp { outcome, .. }
            | EvaluationTrace::UnaryOp { outcome, .. }
            | EvaluationTrace::NaryOp { outcome, .. }
            | EvaluationTrace::Call { outcome, .. }
            | EvaluationTrace::Branch { outcome, .. } => outcome,
            EvaluationTrace::Leaf { value, .. } => value,
        }
    }

    pub fn precedence(&self) -> u8 {
        match self {
            EvaluationTrace::NaryOp { op_symbol, .. } => match *op_symbol {
                "OR" => 1,
                "AND" => 2,
                _ => 0,
            },
            EvaluationTrace::Branch { .. } => 0,
            EvaluationTrace::BinaryOp { op_symbol, .. } => match *op_symbol {
                "==" | "!=" => 4,
                ">" | ">=" | "<" | "<=" => 5,
                "IN" => 6,
                _ => 0,
            },
            EvaluationTrace::UnaryOp { .. } => 8,
            EvaluationTrace::Call { .. } | EvaluationTrace::Leaf { .. } => 9,
        }
    }
}
