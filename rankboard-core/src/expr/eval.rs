//! Expression evaluation against a single record.

use super::{BinaryOp, Expr, Function, UnaryOp};
use crate::cell::{Cell, Record};
use std::cmp::Ordering;

fn truthy(cell: &Cell) -> bool {
    match cell {
        Cell::Null => false,
        Cell::Number(n) => *n != 0.0 && !n.is_nan(),
        Cell::Text(s) => !s.is_empty(),
    }
}

fn flag(b: bool) -> Cell {
    Cell::Number(if b { 1.0 } else { 0.0 })
}

/// Evaluate `expr` against `view`.
///
/// Arithmetic needs numbers on both sides; anything else yields `null`.
/// Comparisons yield `1` or `0`. Missing fields read as `null`.
pub(crate) fn evaluate(expr: &Expr, view: &Record) -> Cell {
    match expr {
        Expr::Number(n) => Cell::Number(*n),
        Expr::Text(s) => Cell::Text(s.clone()),
        Expr::Field(name) => view.get(name).cloned().unwrap_or_default(),
        Expr::Unary { op, operand } => match (op, evaluate(operand, view)) {
            (UnaryOp::Neg, Cell::Number(n)) => Cell::Number(-n),
            (UnaryOp::Plus, Cell::Number(n)) => Cell::Number(n),
            _ => Cell::Null,
        },
        Expr::Binary { op, left, right } => {
            binary(*op, evaluate(left, view), evaluate(right, view))
        }
        Expr::Conditional {
            cond,
            then,
            otherwise,
        } => {
            if truthy(&evaluate(cond, view)) {
                evaluate(then, view)
            } else {
                evaluate(otherwise, view)
            }
        }
        Expr::Call { func, args } => {
            let values: Option<Vec<f64>> = args
                .iter()
                .map(|a| evaluate(a, view).as_number())
                .collect();
            values
                .and_then(|v| call(*func, &v))
                .map_or(Cell::Null, Cell::Number)
        }
    }
}

fn binary(op: BinaryOp, left: Cell, right: Cell) -> Cell {
    match op {
        BinaryOp::Eq => return flag(left == right),
        BinaryOp::Ne => return flag(left != right),
        _ => {}
    }

    let ordering = match (&left, &right) {
        (Cell::Number(a), Cell::Number(b)) => {
            let (a, b) = (*a, *b);
            match op {
                BinaryOp::Add => return Cell::Number(a + b),
                BinaryOp::Sub => return Cell::Number(a - b),
                BinaryOp::Mul => return Cell::Number(a * b),
                BinaryOp::Div => return Cell::Number(a / b),
                BinaryOp::Rem => return Cell::Number(a % b),
                _ => a.partial_cmp(&b),
            }
        }
        (Cell::Text(a), Cell::Text(b)) => Some(a.cmp(b)),
        _ => return Cell::Null,
    };

    let Some(ordering) = ordering else {
        return flag(false);
    };
    match op {
        BinaryOp::Lt => flag(ordering == Ordering::Less),
        BinaryOp::Le => flag(ordering != Ordering::Greater),
        BinaryOp::Gt => flag(ordering == Ordering::Greater),
        BinaryOp::Ge => flag(ordering != Ordering::Less),
        _ => Cell::Null,
    }
}

/// Apply `func`; `None` when `args` does not fit its arity.
fn call(func: Function, args: &[f64]) -> Option<f64> {
    let unary = |f: fn(f64) -> f64| match args {
        [x] => Some(f(*x)),
        _ => None,
    };
    match func {
        Function::Min => args.iter().copied().reduce(f64::min),
        Function::Max => args.iter().copied().reduce(f64::max),
        Function::Abs => unary(f64::abs),
        Function::Round => unary(f64::round),
        Function::Floor => unary(f64::floor),
        Function::Ceil => unary(f64::ceil),
        Function::Sqrt => unary(f64::sqrt),
        Function::Pow => match args {
            [base, exp] => Some(base.powf(*exp)),
            _ => None,
        },
    }
}
