//! Parsing and evaluation of `dynamic_size` arithmetic expressions.
//!
//! The grammar is conventional infix arithmetic over unsigned 64-bit values:
//!
//! ```text
//! expr   := term (('+'|'-') term)*
//! term   := factor (('*'|'/') factor)*
//! factor := number | ident | '(' expr ')'
//! ```
//!
//! Multiplication and division bind tighter than addition and subtraction,
//! operators of equal precedence associate left, and parentheses override.
//! Division is integer division. All arithmetic is checked: any overflow,
//! and any intermediate result that would go negative, fails evaluation.

use crate::spec::SpecValues;
use thiserror::Error as ThisError;

/// Returned when an expression cannot be parsed or evaluated.
#[derive(Debug, PartialEq, Clone, ThisError)]
pub enum ExprError {
    /// An identifier in the expression is not present in the registry.
    #[error("unknown spec value `{0}`")]
    UnknownSpec(String),
    /// The expression text is not valid under the grammar.
    #[error("parse error at byte {position}: {message}")]
    Parse {
        position: usize,
        message: &'static str,
    },
    /// Division by a divisor that evaluated to zero.
    #[error("division by zero")]
    DivideByZero,
    /// Arithmetic overflow, including subtraction below zero.
    #[error("arithmetic overflow")]
    Overflow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Num(u64),
    Ident(String),
    Binary {
        op: Op,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
}

/// A parsed `dynamic_size` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct SizeExpr {
    root: Node,
}

impl SizeExpr {
    /// Parses `src`, which must be a complete expression. Whitespace between
    /// tokens is ignored.
    pub fn parse(src: &str) -> Result<Self, ExprError> {
        let mut parser = Parser {
            bytes: src.as_bytes(),
            pos: 0,
        };
        let root = parser.expr()?;
        parser.skip_whitespace();
        if parser.pos != parser.bytes.len() {
            return Err(ExprError::Parse {
                position: parser.pos,
                message: "unexpected trailing input",
            });
        }
        Ok(Self { root })
    }

    /// Evaluates the expression against `specs`.
    pub fn eval(&self, specs: &SpecValues) -> Result<u64, ExprError> {
        eval_node(&self.root, specs)
    }
}

fn eval_node(node: &Node, specs: &SpecValues) -> Result<u64, ExprError> {
    match node {
        Node::Num(n) => Ok(*n),
        Node::Ident(name) => specs
            .lookup(name)
            .ok_or_else(|| ExprError::UnknownSpec(name.clone())),
        Node::Binary { op, lhs, rhs } => {
            let lhs = eval_node(lhs, specs)?;
            let rhs = eval_node(rhs, specs)?;
            match op {
                Op::Add => lhs.checked_add(rhs).ok_or(ExprError::Overflow),
                Op::Sub => lhs.checked_sub(rhs).ok_or(ExprError::Overflow),
                Op::Mul => lhs.checked_mul(rhs).ok_or(ExprError::Overflow),
                Op::Div => {
                    if rhs == 0 {
                        Err(ExprError::DivideByZero)
                    } else {
                        Ok(lhs / rhs)
                    }
                }
            }
        }
    }
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn skip_whitespace(&mut self) {
        while self
            .bytes
            .get(self.pos)
            .map_or(false, |b| b.is_ascii_whitespace())
        {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_whitespace();
        self.bytes.get(self.pos).copied()
    }

    fn expr(&mut self) -> Result<Node, ExprError> {
        let mut lhs = self.term()?;
        while let Some(b) = self.peek() {
            let op = match b {
                b'+' => Op::Add,
                b'-' => Op::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Node::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Node, ExprError> {
        let mut lhs = self.factor()?;
        while let Some(b) = self.peek() {
            let op = match b {
                b'*' => Op::Mul,
                b'/' => Op::Div,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.factor()?;
            lhs = Node::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> Result<Node, ExprError> {
        match self.peek() {
            Some(b'(') => {
                self.pos += 1;
                let inner = self.expr()?;
                if self.peek() != Some(b')') {
                    return Err(ExprError::Parse {
                        position: self.pos,
                        message: "expected closing parenthesis",
                    });
                }
                self.pos += 1;
                Ok(inner)
            }
            Some(b) if b.is_ascii_digit() => self.number(),
            Some(b) if b == b'_' || b.is_ascii_alphabetic() => Ok(Node::Ident(self.ident())),
            _ => Err(ExprError::Parse {
                position: self.pos,
                message: "expected number, identifier or parenthesized expression",
            }),
        }
    }

    fn number(&mut self) -> Result<Node, ExprError> {
        let start = self.pos;
        while self
            .bytes
            .get(self.pos)
            .map_or(false, |b| b.is_ascii_digit())
        {
            self.pos += 1;
        }
        // Safe: the scanned range is ASCII digits.
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).expect("digits are utf8");
        text.parse::<u64>()
            .map(Node::Num)
            .map_err(|_| ExprError::Parse {
                position: start,
                message: "integer literal out of range",
            })
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while self
            .bytes
            .get(self.pos)
            .map_or(false, |b| *b == b'_' || b.is_ascii_alphanumeric())
        {
            self.pos += 1;
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .expect("identifier is utf8")
            .to_string()
    }
}
