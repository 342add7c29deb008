//! Recursive descent parser producing an [`Expr`] tree.

use super::token::Token;
use super::{BinaryOp, Expr, Function, UnaryOp};
use crate::error::ExprError;

/// Name of the record binding inside formulas (`x["col"]`, `x.col`).
const RECORD_BINDING: &str = "x";

pub fn parse(tokens: &[Token]) -> Result<Expr, ExprError> {
    let mut pos = 0;
    let expr = parse_expr(tokens, &mut pos)?;
    if let Some(token) = tokens.get(pos) {
        return Err(unexpected(token));
    }
    Ok(expr)
}

fn unexpected(token: &Token) -> ExprError {
    ExprError::UnexpectedToken {
        found: token.to_string(),
    }
}

fn expect(tokens: &[Token], pos: &mut usize, want: &Token) -> Result<(), ExprError> {
    match tokens.get(*pos) {
        Some(t) if t == want => {
            *pos += 1;
            Ok(())
        }
        Some(t) => Err(unexpected(t)),
        None => Err(ExprError::UnexpectedEnd),
    }
}

// expr = comparison ('?' expr ':' expr)?
fn parse_expr(tokens: &[Token], pos: &mut usize) -> Result<Expr, ExprError> {
    let cond = parse_comparison(tokens, pos)?;
    if tokens.get(*pos) != Some(&Token::Question) {
        return Ok(cond);
    }
    *pos += 1;
    let then = parse_expr(tokens, pos)?;
    expect(tokens, pos, &Token::Colon)?;
    let otherwise = parse_expr(tokens, pos)?;
    Ok(Expr::Conditional {
        cond: Box::new(cond),
        then: Box::new(then),
        otherwise: Box::new(otherwise),
    })
}

// comparison = additive (cmp additive)?
fn parse_comparison(tokens: &[Token], pos: &mut usize) -> Result<Expr, ExprError> {
    let left = parse_additive(tokens, pos)?;
    let op = match tokens.get(*pos) {
        Some(Token::Lt) => BinaryOp::Lt,
        Some(Token::Le) => BinaryOp::Le,
        Some(Token::Gt) => BinaryOp::Gt,
        Some(Token::Ge) => BinaryOp::Ge,
        Some(Token::Eq) => BinaryOp::Eq,
        Some(Token::Ne) => BinaryOp::Ne,
        _ => return Ok(left),
    };
    *pos += 1;
    let right = parse_additive(tokens, pos)?;
    Ok(Expr::binary(op, left, right))
}

// additive = term (('+' | '-') term)*
fn parse_additive(tokens: &[Token], pos: &mut usize) -> Result<Expr, ExprError> {
    let mut left = parse_term(tokens, pos)?;
    loop {
        let op = match tokens.get(*pos) {
            Some(Token::Plus) => BinaryOp::Add,
            Some(Token::Minus) => BinaryOp::Sub,
            _ => break,
        };
        *pos += 1;
        let right = parse_term(tokens, pos)?;
        left = Expr::binary(op, left, right);
    }
    Ok(left)
}

// term = unary (('*' | '/' | '%') unary)*
fn parse_term(tokens: &[Token], pos: &mut usize) -> Result<Expr, ExprError> {
    let mut left = parse_unary(tokens, pos)?;
    loop {
        let op = match tokens.get(*pos) {
            Some(Token::Star) => BinaryOp::Mul,
            Some(Token::Slash) => BinaryOp::Div,
            Some(Token::Percent) => BinaryOp::Rem,
            _ => break,
        };
        *pos += 1;
        let right = parse_unary(tokens, pos)?;
        left = Expr::binary(op, left, right);
    }
    Ok(left)
}

// unary = ('-' | '+') unary | primary
fn parse_unary(tokens: &[Token], pos: &mut usize) -> Result<Expr, ExprError> {
    let op = match tokens.get(*pos) {
        Some(Token::Minus) => UnaryOp::Neg,
        Some(Token::Plus) => UnaryOp::Plus,
        _ => return parse_primary(tokens, pos),
    };
    *pos += 1;
    let operand = parse_unary(tokens, pos)?;
    Ok(Expr::Unary {
        op,
        operand: Box::new(operand),
    })
}

// primary = NUMBER | STRING | field | call | '(' expr ')'
fn parse_primary(tokens: &[Token], pos: &mut usize) -> Result<Expr, ExprError> {
    let token = tokens.get(*pos).ok_or(ExprError::UnexpectedEnd)?;
    *pos += 1;
    match token {
        Token::Number(n) => Ok(Expr::Number(*n)),
        Token::Str(s) => Ok(Expr::Text(s.clone())),
        Token::LParen => {
            let inner = parse_expr(tokens, pos)?;
            expect(tokens, pos, &Token::RParen)?;
            Ok(inner)
        }
        Token::Ident(name) => parse_identifier(name, tokens, pos),
        other => Err(unexpected(other)),
    }
}

fn parse_identifier(name: &str, tokens: &[Token], pos: &mut usize) -> Result<Expr, ExprError> {
    match (name, tokens.get(*pos)) {
        (RECORD_BINDING, Some(Token::LBracket)) => {
            *pos += 1;
            let field = match tokens.get(*pos) {
                Some(Token::Str(s)) => s.clone(),
                Some(t) => return Err(unexpected(t)),
                None => return Err(ExprError::UnexpectedEnd),
            };
            *pos += 1;
            expect(tokens, pos, &Token::RBracket)?;
            Ok(Expr::Field(field))
        }
        (RECORD_BINDING, Some(Token::Dot)) => {
            *pos += 1;
            let field = expect_ident(tokens, pos)?;
            Ok(Expr::Field(field))
        }
        ("Math", Some(Token::Dot)) => {
            *pos += 1;
            let func = expect_ident(tokens, pos)?;
            parse_call(&func, tokens, pos)
        }
        (_, Some(Token::LParen)) => parse_call(name, tokens, pos),
        _ => Err(ExprError::UnexpectedToken {
            found: name.to_string(),
        }),
    }
}

fn expect_ident(tokens: &[Token], pos: &mut usize) -> Result<String, ExprError> {
    match tokens.get(*pos) {
        Some(Token::Ident(s)) => {
            *pos += 1;
            Ok(s.clone())
        }
        Some(t) => Err(unexpected(t)),
        None => Err(ExprError::UnexpectedEnd),
    }
}

fn parse_call(name: &str, tokens: &[Token], pos: &mut usize) -> Result<Expr, ExprError> {
    let func = Function::from_name(name).ok_or_else(|| ExprError::UnknownFunction {
        name: name.to_string(),
    })?;
    expect(tokens, pos, &Token::LParen)?;

    let mut args = Vec::new();
    if tokens.get(*pos) == Some(&Token::RParen) {
        *pos += 1;
    } else {
        loop {
            args.push(parse_expr(tokens, pos)?);
            match tokens.get(*pos) {
                Some(Token::Comma) => *pos += 1,
                Some(Token::RParen) => {
                    *pos += 1;
                    break;
                }
                Some(t) => return Err(unexpected(t)),
                None => return Err(ExprError::UnexpectedEnd),
            }
        }
    }

    func.check_arity(args.len())?;
    Ok(Expr::Call { func, args })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::token::tokenize;

    fn parse_str(src: &str) -> Result<Expr, ExprError> {
        parse(&tokenize(src)?)
    }

    #[test]
    fn test_precedence() {
        let expr = parse_str("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::Add,
                Expr::Number(1.0),
                Expr::binary(BinaryOp::Mul, Expr::Number(2.0), Expr::Number(3.0)),
            )
        );
    }

    #[test]
    fn test_left_associative_subtraction() {
        let expr = parse_str("10 - 4 - 3").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::Sub,
                Expr::binary(BinaryOp::Sub, Expr::Number(10.0), Expr::Number(4.0)),
                Expr::Number(3.0),
            )
        );
    }

    #[test]
    fn test_field_forms() {
        assert_eq!(
            parse_str(r#"x["MATH Lvl 5"]"#).unwrap(),
            Expr::Field("MATH Lvl 5".into())
        );
        assert_eq!(parse_str("x.average").unwrap(), Expr::Field("average".into()));
    }

    #[test]
    fn test_calls() {
        let expr = parse_str("Math.max(x.a, x.b, 1)").unwrap();
        assert!(matches!(expr, Expr::Call { func: Function::Max, ref args } if args.len() == 3));
        assert!(matches!(
            parse_str("round(1.5)").unwrap(),
            Expr::Call {
                func: Function::Round,
                ..
            }
        ));
    }

    #[test]
    fn test_conditional() {
        let expr = parse_str("x.a > 0 ? x.a : 0").unwrap();
        assert!(matches!(expr, Expr::Conditional { .. }));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_str("1 +"), Err(ExprError::UnexpectedEnd));
        assert_eq!(parse_str("(1 + 2"), Err(ExprError::UnexpectedEnd));
        assert_eq!(
            parse_str("1 2"),
            Err(ExprError::UnexpectedToken { found: "2".into() })
        );
        assert_eq!(
            parse_str("average * 2"),
            Err(ExprError::UnexpectedToken {
                found: "average".into()
            })
        );
        assert_eq!(
            parse_str("eval(1)"),
            Err(ExprError::UnknownFunction {
                name: "eval".into()
            })
        );
        assert!(matches!(
            parse_str("pow(2)"),
            Err(ExprError::Arity { got: 1, .. })
        ));
        assert!(matches!(
            parse_str("x[1]"),
            Err(ExprError::UnexpectedToken { .. })
        ));
    }
}
