//! Restricted formula language for `formula` extra columns.
//!
//! Formulas come from dataset metadata, which is trusted configuration. This
//! is a closed arithmetic surface, not a sandbox: it has numeric and string
//! literals, record field lookups (`x["col"]` or `x.col`), `+ - * / %`,
//! comparisons, a `cond ? a : b` conditional and a fixed set of math
//! functions. Nothing else can be expressed, so a formula can only read the
//! record it is evaluated against.
//!
//! A formula is parsed once into an [`Expr`] tree and evaluated per record.

mod eval;
mod parser;
mod token;

use crate::cell::{Cell, Record};
use crate::error::ExprError;
use std::collections::BTreeSet;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

/// Built-in functions, callable bare or with a `Math.` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Min,
    Max,
    Abs,
    Round,
    Floor,
    Ceil,
    Sqrt,
    Pow,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "min" => Some(Function::Min),
            "max" => Some(Function::Max),
            "abs" => Some(Function::Abs),
            "round" => Some(Function::Round),
            "floor" => Some(Function::Floor),
            "ceil" => Some(Function::Ceil),
            "sqrt" => Some(Function::Sqrt),
            "pow" => Some(Function::Pow),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Min => "min",
            Function::Max => "max",
            Function::Abs => "abs",
            Function::Round => "round",
            Function::Floor => "floor",
            Function::Ceil => "ceil",
            Function::Sqrt => "sqrt",
            Function::Pow => "pow",
        }
    }

    fn check_arity(&self, got: usize) -> Result<(), ExprError> {
        let (ok, expected) = match self {
            Function::Min | Function::Max => (got >= 1, "at least 1"),
            Function::Pow => (got == 2, "2"),
            _ => (got == 1, "1"),
        };
        if ok {
            Ok(())
        } else {
            Err(ExprError::Arity {
                name: self.name().to_string(),
                expected: expected.to_string(),
                got,
            })
        }
    }
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Text(String),
    Field(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Call {
        func: Function,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn collect_fields<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Field(name) => {
                out.insert(name);
            }
            Expr::Number(_) | Expr::Text(_) => {}
            Expr::Unary { operand, .. } => operand.collect_fields(out),
            Expr::Binary { left, right, .. } => {
                left.collect_fields(out);
                right.collect_fields(out);
            }
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => {
                cond.collect_fields(out);
                then.collect_fields(out);
                otherwise.collect_fields(out);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_fields(out);
                }
            }
        }
    }
}

/// A compiled formula.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    expr: Expr,
}

impl Formula {
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let tokens = token::tokenize(source)?;
        let expr = parser::parse(&tokens)?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Every record field the formula reads, sorted and deduplicated.
    pub fn fields(&self) -> Vec<&str> {
        let mut out = BTreeSet::new();
        self.expr.collect_fields(&mut out);
        out.into_iter().collect()
    }

    pub fn eval(&self, view: &Record) -> Cell {
        eval::evaluate(&self.expr, view)
    }
}
