//! Tokenizer for formula expressions.

use crate::error::ExprError;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Comma,
    Question,
    Colon,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{n}"),
            Token::Str(s) => write!(f, "{s:?}"),
            Token::Ident(s) => write!(f, "{s}"),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::Percent => f.write_str("%"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::LBracket => f.write_str("["),
            Token::RBracket => f.write_str("]"),
            Token::Dot => f.write_str("."),
            Token::Comma => f.write_str(","),
            Token::Question => f.write_str("?"),
            Token::Colon => f.write_str(":"),
            Token::Lt => f.write_str("<"),
            Token::Le => f.write_str("<="),
            Token::Gt => f.write_str(">"),
            Token::Ge => f.write_str(">="),
            Token::Eq => f.write_str("=="),
            Token::Ne => f.write_str("!="),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            c if c.is_ascii_digit()
                || (c == '.' && input[offset + 1..].starts_with(|d: char| d.is_ascii_digit())) =>
            {
                let mut literal = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    let exponent_sign = (c == '+' || c == '-')
                        && literal.ends_with(['e', 'E']);
                    if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || exponent_sign {
                        literal.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let n: f64 = literal
                    .parse()
                    .map_err(|_| ExprError::InvalidNumber { literal })?;
                tokens.push(Token::Number(n));
            }
            '"' | '\'' => {
                let quote = ch;
                chars.next();
                let mut text = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some((_, escaped)) = chars.next() {
                                text.push(escaped);
                            }
                        }
                        c if c == quote => {
                            closed = true;
                            break;
                        }
                        c => text.push(c),
                    }
                }
                if !closed {
                    return Err(ExprError::UnterminatedString { offset });
                }
                tokens.push(Token::Str(text));
            }
            c if is_ident_start(c) => {
                let mut ident = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if is_ident_continue(c) {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            '<' | '>' | '=' | '!' => {
                chars.next();
                let followed_by_eq = chars.next_if(|&(_, c)| c == '=').is_some();
                let token = match (ch, followed_by_eq) {
                    ('<', false) => Token::Lt,
                    ('<', true) => Token::Le,
                    ('>', false) => Token::Gt,
                    ('>', true) => Token::Ge,
                    ('=', true) => Token::Eq,
                    ('!', true) => Token::Ne,
                    _ => return Err(ExprError::UnexpectedChar { ch, offset }),
                };
                // `===` and `!==` read the same as `==` and `!=`.
                if matches!(token, Token::Eq | Token::Ne) {
                    chars.next_if(|&(_, c)| c == '=');
                }
                tokens.push(token);
            }
            _ => {
                let token = match ch {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '%' => Token::Percent,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    '.' => Token::Dot,
                    ',' => Token::Comma,
                    '?' => Token::Question,
                    ':' => Token::Colon,
                    _ => return Err(ExprError::UnexpectedChar { ch, offset }),
                };
                tokens.push(token);
                chars.next();
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_field_access() {
        let tokens = tokenize(r#"x["MMLU-PRO"] * 2"#).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("x".into()),
                Token::LBracket,
                Token::Str("MMLU-PRO".into()),
                Token::RBracket,
                Token::Star,
                Token::Number(2.0),
            ]
        );
    }

    #[test]
    fn test_tokenize_numbers() {
        let tokens = tokenize("1.5 + .25 - 2e3 + 1e-2").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Number(1.5),
                Token::Plus,
                Token::Number(0.25),
                Token::Minus,
                Token::Number(2000.0),
                Token::Plus,
                Token::Number(0.01),
            ]
        );
    }

    #[test]
    fn test_tokenize_comparisons() {
        let tokens = tokenize("a <= b === c != d > e").unwrap();
        assert!(tokens.contains(&Token::Le));
        assert!(tokens.contains(&Token::Eq));
        assert!(tokens.contains(&Token::Ne));
        assert!(tokens.contains(&Token::Gt));
        assert_eq!(tokens.len(), 9);
    }

    #[test]
    fn test_tokenize_single_quoted_string() {
        let tokens = tokenize(r"x['it\'s']").unwrap();
        assert_eq!(tokens[2], Token::Str("it's".into()));
    }

    #[test]
    fn test_tokenize_errors() {
        assert_eq!(
            tokenize("1 # 2"),
            Err(ExprError::UnexpectedChar { ch: '#', offset: 2 })
        );
        assert_eq!(
            tokenize("x[\"open"),
            Err(ExprError::UnterminatedString { offset: 2 })
        );
        assert!(matches!(
            tokenize("1.2.3"),
            Err(ExprError::InvalidNumber { .. })
        ));
        assert_eq!(
            tokenize("a = b"),
            Err(ExprError::UnexpectedChar { ch: '=', offset: 2 })
        );
    }
}
