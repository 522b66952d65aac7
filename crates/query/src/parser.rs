//! Recursive-descent parser producing [`Expr`] trees.
//!
//! Precedence, loosest first: `or`, `and`, `not`, comparison, unary minus,
//! primary (literal, path, call, parenthesized expression).

use serde_json::Value;

use crate::ast::{CmpOp, Expr, Path, Root, Step};
use crate::error::{QueryError, Result};
use crate::lexer::{tokenize, Spanned, Token};

/// Parse an expression string.
pub fn parse(src: &str) -> Result<Expr> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        src_len: src.len(),
    };
    let expr = parser.expr()?;
    if let Some(tok) = parser.tokens.get(parser.pos) {
        return Err(QueryError::Syntax {
            offset: tok.offset,
            message: format!("unexpected trailing token {:?}", tok.token),
        });
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    src_len: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead).map(|s| &s.token)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|s| s.offset)
            .unwrap_or(self.src_len)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).map(|s| s.token.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T> {
        Err(QueryError::Syntax {
            offset: self.offset(),
            message: message.into(),
        })
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.peek() {
            Some(tok) if *tok == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(tok) => {
                let msg = format!("expected {:?}, found {:?}", expected, tok);
                self.error(msg)
            }
            None => self.error(format!("expected {:?}, found end of input", expected)),
        }
    }

    fn is_keyword(&self, ahead: usize, kw: &str) -> bool {
        matches!(self.peek_at(ahead), Some(Token::Ident(s)) if s == kw)
    }

    fn expr(&mut self) -> Result<Expr> {
        self.or()
    }

    fn or(&mut self) -> Result<Expr> {
        let mut lhs = self.and()?;
        while self.is_keyword(0, "or") {
            self.pos += 1;
            let rhs = self.and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr> {
        let mut lhs = self.not()?;
        while self.is_keyword(0, "and") {
            self.pos += 1;
            let rhs = self.not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn not(&mut self) -> Result<Expr> {
        if self.is_keyword(0, "not") {
            self.pos += 1;
            let inner = self.not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr> {
        let lhs = self.unary()?;
        let op = match self.peek() {
            Some(Token::EqEq) => Some((CmpOp::Eq, 1)),
            Some(Token::NotEq) => Some((CmpOp::Ne, 1)),
            Some(Token::Lt) => Some((CmpOp::Lt, 1)),
            Some(Token::Le) => Some((CmpOp::Le, 1)),
            Some(Token::Gt) => Some((CmpOp::Gt, 1)),
            Some(Token::Ge) => Some((CmpOp::Ge, 1)),
            Some(Token::Ident(kw)) => match kw.as_str() {
                "is" if self.is_keyword(1, "not") => Some((CmpOp::Ne, 2)),
                "is" => Some((CmpOp::Eq, 1)),
                "in" => Some((CmpOp::In, 1)),
                "not" if self.is_keyword(1, "in") => Some((CmpOp::NotIn, 2)),
                _ => None,
            },
            _ => None,
        };
        let Some((op, width)) = op else {
            return Ok(lhs);
        };
        self.pos += width;
        let rhs = self.unary()?;
        Ok(Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn unary(&mut self) -> Result<Expr> {
        if matches!(self.peek(), Some(Token::Minus)) {
            self.pos += 1;
            let inner = self.unary()?;
            return Ok(match inner {
                Expr::Literal(Value::Number(n)) => {
                    Expr::Literal(number_value(-n.as_f64().unwrap_or(0.0)))
                }
                other => Expr::Neg(Box::new(other)),
            });
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.advance() {
            Some(Token::Num(n)) => Ok(Expr::Literal(number_value(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::Dollar) => self.path(Root::Document),
            Some(Token::At) => self.path(Root::Current),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if name == "true" {
                    Ok(Expr::Literal(Value::Bool(true)))
                } else if name == "false" {
                    Ok(Expr::Literal(Value::Bool(false)))
                } else if name == "null" || name == "None" {
                    Ok(Expr::Literal(Value::Null))
                } else if matches!(self.peek(), Some(Token::LParen)) {
                    self.call(name)
                } else {
                    self.pos -= 1;
                    self.error(format!("unexpected identifier '{name}'"))
                }
            }
            Some(tok) => {
                self.pos -= 1;
                self.error(format!("unexpected token {:?}", tok))
            }
            None => self.error("unexpected end of input"),
        }
    }

    fn call(&mut self, name: String) -> Result<Expr> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        if !matches!(self.peek(), Some(Token::RParen)) {
            loop {
                args.push(self.expr()?);
                if matches!(self.peek(), Some(Token::Comma)) {
                    self.pos += 1;
                    continue;
                }
                break;
            }
        }
        self.expect(Token::RParen)?;
        Ok(Expr::Call { name, args })
    }

    fn path(&mut self, root: Root) -> Result<Expr> {
        let mut steps = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    steps.push(match self.advance() {
                        Some(Token::Ident(name)) | Some(Token::Str(name)) => Step::Child(name),
                        Some(Token::Star) => Step::Wildcard,
                        _ => {
                            self.pos -= 1;
                            return self.error("expected a name after '.'");
                        }
                    });
                }
                Some(Token::DotDot) => {
                    self.pos += 1;
                    steps.push(match self.advance() {
                        Some(Token::Ident(name)) | Some(Token::Str(name)) => {
                            Step::Descend(Some(name))
                        }
                        Some(Token::Star) => Step::Descend(None),
                        _ => {
                            self.pos -= 1;
                            return self.error("expected a name after '..'");
                        }
                    });
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    steps.push(self.bracket()?);
                }
                _ => break,
            }
        }
        Ok(Expr::Path(Path { root, steps }))
    }

    fn bracket(&mut self) -> Result<Step> {
        if matches!(self.peek(), Some(Token::Star)) && matches!(self.peek_at(1), Some(Token::RBracket)) {
            self.pos += 2;
            return Ok(Step::Wildcard);
        }
        if let Some(index) = self.integer_index() {
            return Ok(Step::Index(index));
        }
        let filter = self.expr()?;
        self.expect(Token::RBracket)?;
        Ok(Step::Filter(Box::new(filter)))
    }

    /// `[n]` / `[-n]` with an integral literal directly followed by `]`.
    fn integer_index(&mut self) -> Option<i64> {
        let (negative, num_at) = match self.peek() {
            Some(Token::Minus) => (true, 1),
            _ => (false, 0),
        };
        let n = match self.peek_at(num_at) {
            Some(Token::Num(n)) if n.fract() == 0.0 => *n,
            _ => return None,
        };
        if !matches!(self.peek_at(num_at + 1), Some(Token::RBracket)) {
            return None;
        }
        self.pos += num_at + 2;
        let n = n as i64;
        Some(if negative { -n } else { n })
    }
}

/// Integral numbers become JSON integers so `1 == 1.0` style literals
/// compare and render like the document values they are checked against.
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}
