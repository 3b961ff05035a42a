//! Recursive descent over a flat arithmetic token list.
//!
//! ```text
//! expr   := term (("+" | "-") term)*
//! term   := factor (("*" | "/") factor)*
//! factor := "(" expr ")" | "-" factor | literal
//! ```

use crate::error::{Result, TemplateError};
use crate::value::{Value, is_numeric_literal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn from_symbol(s: &str) -> Option<ArithOp> {
        match s {
            "+" => Some(ArithOp::Add),
            "-" => Some(ArithOp::Sub),
            "*" => Some(ArithOp::Mul),
            "/" => Some(ArithOp::Div),
            _ => None,
        }
    }

    fn apply(self, lhs: &Value, rhs: &Value) -> Value {
        match self {
            ArithOp::Add => lhs.add(rhs),
            ArithOp::Sub => lhs.sub(rhs),
            ArithOp::Mul => lhs.mul(rhs),
            ArithOp::Div => lhs.div(rhs),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArithToken<T = Value> {
    Op(ArithOp),
    Open,
    Close,
    Operand(T),
}

/// Evaluates tokens whose operands are already values.
pub fn evaluate(tokens: &[ArithToken]) -> Result<Value> {
    evaluate_with(tokens, |v| v.clone())
}

/// Evaluates a plain string token sequence such as `["1", "+", "2"]`.
/// Anything that is not an operator or a parenthesis is a literal.
pub fn evaluate_str(tokens: &[&str]) -> Result<Value> {
    let tokens: Vec<ArithToken> = tokens
        .iter()
        .map(|t| match *t {
            "(" => ArithToken::Open,
            ")" => ArithToken::Close,
            other => match ArithOp::from_symbol(other) {
                Some(op) => ArithToken::Op(op),
                None => ArithToken::Operand(Value::from(other)),
            },
        })
        .collect();
    evaluate(&tokens)
}

/// Parentheses and unary minus may nest this deep.
pub const MAX_NESTING: usize = 64;

/// Evaluates tokens, resolving each operand through `resolve`. An empty list
/// yields `Null`; tokens left over after a complete expression are an error.
pub(crate) fn evaluate_with<T, F>(tokens: &[ArithToken<T>], resolve: F) -> Result<Value>
where
    F: FnMut(&T) -> Value,
{
    if tokens.is_empty() {
        return Ok(Value::Null);
    }
    let mut calc = Calc {
        tokens,
        idx: 0,
        depth: 0,
        resolve,
    };
    let value = calc.expr()?;
    if calc.idx < tokens.len() {
        return Err(TemplateError::expression(format!(
            "unexpected token at position {} after a complete expression",
            calc.idx + 1
        )));
    }
    Ok(value)
}

struct Calc<'t, T, F> {
    tokens: &'t [ArithToken<T>],
    idx: usize,
    depth: usize,
    resolve: F,
}

impl<T, F> Calc<'_, T, F>
where
    F: FnMut(&T) -> Value,
{
    fn peek_op(&self) -> Option<ArithOp> {
        match self.tokens.get(self.idx) {
            Some(ArithToken::Op(op)) => Some(*op),
            _ => None,
        }
    }

    fn expr(&mut self) -> Result<Value> {
        let mut value = self.term()?;
        while let Some(op @ (ArithOp::Add | ArithOp::Sub)) = self.peek_op() {
            self.idx += 1;
            let rhs = self.term()?;
            value = op.apply(&value, &rhs);
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<Value> {
        let mut value = self.factor()?;
        while let Some(op @ (ArithOp::Mul | ArithOp::Div)) = self.peek_op() {
            self.idx += 1;
            let rhs = self.factor()?;
            value = op.apply(&value, &rhs);
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<Value> {
        let tokens = self.tokens;
        let token = tokens.get(self.idx);
        self.idx += 1;
        match token {
            Some(ArithToken::Open) => {
                self.enter()?;
                let value = self.expr()?;
                self.depth -= 1;
                match self.tokens.get(self.idx) {
                    Some(ArithToken::Close) => {
                        self.idx += 1;
                        Ok(value)
                    }
                    _ => Err(TemplateError::expression(
                        "unterminated parenthesized factor, expected \")\"",
                    )),
                }
            }
            Some(ArithToken::Op(ArithOp::Sub)) => {
                self.enter()?;
                let value = self.factor()?.neg();
                self.depth -= 1;
                Ok(value)
            }
            Some(ArithToken::Op(op)) => Err(TemplateError::expression(format!(
                "unexpected operator {:?} where an operand was expected",
                op
            ))),
            Some(ArithToken::Close) => Err(TemplateError::expression(
                "unexpected \")\" where an operand was expected",
            )),
            Some(ArithToken::Operand(t)) => Ok(literal((self.resolve)(t))),
            None => Err(TemplateError::expression(
                "unexpected end of expression, expected an operand",
            )),
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(TemplateError::expression(format!(
                "expression nesting exceeds the limit of {}",
                MAX_NESTING
            )));
        }
        Ok(())
    }
}

/// Numeric-looking strings take part in arithmetic as numbers.
fn literal(value: Value) -> Value {
    match value {
        Value::Str(s) if is_numeric_literal(&s) => match s.parse::<f64>() {
            Ok(f) => Value::F64(f),
            Err(_) => Value::Str(s),
        },
        other => other,
    }
}
