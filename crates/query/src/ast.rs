//! Expression syntax tree.

use serde_json::Value;

/// A parsed query expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Path(Path),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare {
        op: CmpOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call { name: String, args: Vec<Expr> },
}

/// Where a path starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Root {
    /// `$`: the evaluation document.
    Document,
    /// `@`: the element currently being filtered.
    Current,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub root: Root,
    pub steps: Vec<Step>,
}

/// One selector applied to the current node set.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// `.name`
    Child(String),
    /// `..name`, or `..*` when `None`.
    Descend(Option<String>),
    /// `.*` or `[*]`
    Wildcard,
    /// `[n]`, negative counts from the end.
    Index(i64),
    /// `[expr]`
    Filter(Box<Expr>),
}

impl Step {
    /// Whether this step turns a single selection into a match sequence.
    pub fn yields_sequence(&self) -> bool {
        matches!(self, Step::Descend(_) | Step::Wildcard | Step::Filter(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

impl std::fmt::Display for CmpOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CmpOp::Eq => "is",
            CmpOp::Ne => "is not",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
        };
        f.write_str(s)
    }
}
