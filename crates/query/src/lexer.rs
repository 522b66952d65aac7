//! Tokenizer for query expressions.

use crate::error::{QueryError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Dollar,
    At,
    Dot,
    DotDot,
    Star,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Minus,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Ident(String),
    Str(String),
    Num(f64),
}

/// A token plus its byte offset in the source expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

/// Split an expression into tokens.
pub fn tokenize(src: &str) -> Result<Vec<Spanned>> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        let simple = match ch {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '$' => Some(Token::Dollar),
            '@' => Some(Token::At),
            '*' => Some(Token::Star),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            ',' => Some(Token::Comma),
            '-' => Some(Token::Minus),
            _ => None,
        };
        if let Some(token) = simple {
            chars.next();
            tokens.push(Spanned { token, offset });
            continue;
        }

        match ch {
            '.' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '.'))) {
                    chars.next();
                    tokens.push(Spanned { token: Token::DotDot, offset });
                } else {
                    tokens.push(Spanned { token: Token::Dot, offset });
                }
            }
            '=' | '!' | '<' | '>' => {
                chars.next();
                let followed_by_eq = matches!(chars.peek(), Some(&(_, '=')));
                if followed_by_eq {
                    chars.next();
                }
                let token = match (ch, followed_by_eq) {
                    ('=', true) => Token::EqEq,
                    ('!', true) => Token::NotEq,
                    ('<', false) => Token::Lt,
                    ('<', true) => Token::Le,
                    ('>', false) => Token::Gt,
                    ('>', true) => Token::Ge,
                    _ => {
                        return Err(QueryError::Syntax {
                            offset,
                            message: format!("unexpected character '{ch}'"),
                        })
                    }
                };
                tokens.push(Spanned { token, offset });
            }
            '\'' | '"' => {
                chars.next();
                let quote = ch;
                let mut text = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    if c == quote {
                        closed = true;
                        break;
                    }
                    if c == '\\' {
                        match chars.next() {
                            Some((_, 'n')) => text.push('\n'),
                            Some((_, 't')) => text.push('\t'),
                            Some((_, escaped)) => text.push(escaped),
                            None => break,
                        }
                        continue;
                    }
                    text.push(c);
                }
                if !closed {
                    return Err(QueryError::Syntax {
                        offset,
                        message: "unterminated string literal".to_string(),
                    });
                }
                tokens.push(Spanned { token: Token::Str(text), offset });
            }
            c if c.is_ascii_digit() => {
                let mut text = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        text.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = text.parse::<f64>().map_err(|_| QueryError::Syntax {
                    offset,
                    message: format!("invalid number '{text}'"),
                })?;
                tokens.push(Spanned { token: Token::Num(value), offset });
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut text = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' {
                        text.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Spanned { token: Token::Ident(text), offset });
            }
            other => {
                return Err(QueryError::Syntax {
                    offset,
                    message: format!("unexpected character '{other}'"),
                })
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        tokenize(src).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn path_with_descent_and_filter() {
        assert_eq!(
            kinds("$..id[@.x >= 2]"),
            vec![
                Token::Dollar,
                Token::DotDot,
                Token::Ident("id".into()),
                Token::LBracket,
                Token::At,
                Token::Dot,
                Token::Ident("x".into()),
                Token::Ge,
                Token::Num(2.0),
                Token::RBracket,
            ]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(kinds(r#""a\"b""#), vec![Token::Str("a\"b".into())]);
        assert_eq!(kinds("'x y'"), vec![Token::Str("x y".into())]);
    }

    #[test]
    fn unterminated_string_is_syntax_error() {
        let err = tokenize("'abc").unwrap_err();
        assert!(matches!(err, QueryError::Syntax { offset: 0, .. }));
    }

    #[test]
    fn lone_equals_rejected() {
        assert!(tokenize("$.a = 1").is_err());
    }
}
