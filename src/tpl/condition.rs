//! Boolean conditions used by `if` / `else if`.
//!
//! A condition is a chain of clauses joined by `&&` / `||` and evaluated left
//! to right with short-circuiting; there is no precedence between the two.
//! Each clause is either a lone arithmetic expression (tested for
//! truthiness) or two arithmetic expressions around one relational operator.

use crate::error::{Result, TemplateError};
use crate::tpl::arith::{self, ArithOp, ArithToken};
use crate::tpl::render_context::{Accessor, Scope};
use crate::value::Value;
use std::cmp::Ordering;

const SYMBOL_CHARS: &[char] = &['<', '>', '=', '!', '&', '|', '/', '-', '+', '*'];

const OPERATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "<", ">", "+", "-", "*", "/",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    StrictEq,
    Ne,
    StrictNe,
}

impl RelOp {
    pub fn from_symbol(s: &str) -> Option<RelOp> {
        match s {
            "<" => Some(RelOp::Lt),
            ">" => Some(RelOp::Gt),
            "<=" => Some(RelOp::Le),
            ">=" => Some(RelOp::Ge),
            "==" => Some(RelOp::Eq),
            "===" => Some(RelOp::StrictEq),
            "!=" => Some(RelOp::Ne),
            "!==" => Some(RelOp::StrictNe),
            _ => None,
        }
    }

    pub fn apply(self, left: &Value, right: &Value) -> bool {
        let ord = || left.compare(right);
        match self {
            RelOp::Lt => ord() == Some(Ordering::Less),
            RelOp::Gt => ord() == Some(Ordering::Greater),
            RelOp::Le => matches!(ord(), Some(Ordering::Less | Ordering::Equal)),
            RelOp::Ge => matches!(ord(), Some(Ordering::Greater | Ordering::Equal)),
            RelOp::Eq => left.loose_eq(right),
            RelOp::StrictEq => left.strict_eq(right),
            RelOp::Ne => !left.loose_eq(right),
            RelOp::StrictNe => !left.strict_eq(right),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Logic {
    And,
    Or,
}

/// A literal or something read from the render context.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    Ref(Accessor),
}

impl Operand {
    /// Quoted text is a string, `^[0-9.]+$` a number, `true` / `false` /
    /// `null` keywords; anything else is an identifier.
    pub fn parse(token: &str) -> std::result::Result<Operand, String> {
        if let Some(s) = unquote(token) {
            return Ok(Operand::Literal(Value::from(s)));
        }
        if let Some(n) = Value::parse_numeric(token) {
            return Ok(Operand::Literal(n));
        }
        match token {
            "true" => Ok(Operand::Literal(Value::Bool(true))),
            "false" => Ok(Operand::Literal(Value::Bool(false))),
            "null" => Ok(Operand::Literal(Value::Null)),
            _ => Accessor::parse(token).map(Operand::Ref),
        }
    }

    pub(crate) fn resolve(&self, scope: &Scope) -> Value {
        match self {
            Operand::Literal(v) => v.clone(),
            Operand::Ref(accessor) => scope.resolve(accessor).into_owned(),
        }
    }
}

fn unquote(token: &str) -> Option<&str> {
    let first = token.chars().next()?;
    if token.len() >= 2 && (first == '\'' || first == '"') && token.ends_with(first) {
        Some(&token[1..token.len() - 1])
    } else {
        None
    }
}

/// Splits a raw condition into tokens. Runs of operator characters are cut
/// into the longest known operators (at most three characters each),
/// parentheses stand alone, quoted literals are kept whole and everything
/// else is split on whitespace.
pub fn tokenize(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut chars = raw.chars().peekable();

    fn flush(word: &mut String, tokens: &mut Vec<String>) {
        let w = word.trim();
        if !w.is_empty() {
            tokens.push(w.to_string());
        }
        word.clear();
    }

    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            flush(&mut word, &mut tokens);
        } else if (c == '\'' || c == '"') && word.is_empty() {
            let mut quoted = String::from(c);
            for q in chars.by_ref() {
                quoted.push(q);
                if q == c {
                    break;
                }
            }
            tokens.push(quoted);
        } else if c == '(' || c == ')' {
            flush(&mut word, &mut tokens);
            tokens.push(c.to_string());
        } else if SYMBOL_CHARS.contains(&c) {
            flush(&mut word, &mut tokens);
            let mut run = String::from(c);
            while let Some(&n) = chars.peek() {
                if !SYMBOL_CHARS.contains(&n) {
                    break;
                }
                run.push(n);
                chars.next();
            }
            split_symbol_run(&run, &mut tokens);
        } else {
            word.push(c);
        }
    }
    flush(&mut word, &mut tokens);
    tokens
}

fn split_symbol_run(run: &str, tokens: &mut Vec<String>) {
    let mut rest = run;
    while !rest.is_empty() {
        let piece = OPERATORS
            .iter()
            .find(|op| rest.starts_with(**op))
            .map(|op| op.len())
            .unwrap_or_else(|| rest.char_indices().nth(3).map_or(rest.len(), |(i, _)| i));
        tokens.push(rest[..piece].to_string());
        rest = &rest[piece..];
    }
}

#[derive(Debug, Clone, Default)]
struct Clause {
    left: Vec<ArithToken<Operand>>,
    op: Option<RelOp>,
    right: Vec<ArithToken<Operand>>,
}

impl Clause {
    fn push(&mut self, token: ArithToken<Operand>) {
        if self.op.is_some() {
            self.right.push(token);
        } else {
            self.left.push(token);
        }
    }

    fn evaluate(&self, scope: &Scope) -> Result<bool> {
        let left = arith::evaluate_with(&self.left, |o| o.resolve(scope))?;
        match self.op {
            Some(op) => {
                let right = arith::evaluate_with(&self.right, |o| o.resolve(scope))?;
                Ok(op.apply(&left, &right))
            }
            None => Ok(left.is_truthy()),
        }
    }

    /// Walks both sides without a context so malformed arithmetic is
    /// reported when the template is compiled. A side may only be empty
    /// when there is no relational operator to give it one.
    fn validate(&self, raw: &str) -> Result<()> {
        if self.left.is_empty() {
            let message = match self.op {
                Some(op) => format!("missing left operand of {:?} in \"{}\"", op, raw),
                None => format!("empty clause in \"{}\"", raw),
            };
            return Err(TemplateError::expression(message));
        }
        if let Some(op) = self.op {
            if self.right.is_empty() {
                return Err(TemplateError::expression(format!(
                    "missing right operand of {:?} in \"{}\"",
                    op, raw
                )));
            }
        }
        arith::evaluate_with(&self.left, |_| Value::Null)?;
        arith::evaluate_with(&self.right, |_| Value::Null)?;
        Ok(())
    }
}

/// A parsed condition, ready to be evaluated against any scope.
#[derive(Debug, Clone)]
pub struct Condition {
    source: String,
    clauses: Vec<Clause>,
    connectors: Vec<Logic>,
}

impl Condition {
    pub fn parse(raw: &str) -> Result<Condition> {
        let mut clauses = Vec::new();
        let mut connectors = Vec::new();
        let mut clause = Clause::default();

        for token in tokenize(raw) {
            let t = token.as_str();
            if let Some(op) = RelOp::from_symbol(t) {
                if let Some(prev) = clause.op {
                    return Err(TemplateError::expression(format!(
                        "bad operator \"{}\" after {:?} in \"{}\"",
                        t, prev, raw
                    )));
                }
                clause.op = Some(op);
            } else if let Some(op) = ArithOp::from_symbol(t) {
                clause.push(ArithToken::Op(op));
            } else if t == "&&" || t == "||" {
                clauses.push(std::mem::take(&mut clause));
                connectors.push(if t == "&&" { Logic::And } else { Logic::Or });
            } else if t == "(" {
                clause.push(ArithToken::Open);
            } else if t == ")" {
                clause.push(ArithToken::Close);
            } else if t.starts_with(SYMBOL_CHARS) {
                return Err(TemplateError::expression(format!(
                    "unknown operator \"{}\" in \"{}\"",
                    t, raw
                )));
            } else {
                let operand = Operand::parse(t).map_err(TemplateError::Expression)?;
                clause.push(ArithToken::Operand(operand));
            }
        }
        clauses.push(clause);

        for c in &clauses {
            c.validate(raw)?;
        }

        Ok(Condition {
            source: raw.to_string(),
            clauses,
            connectors,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn evaluate(&self, scope: &Scope) -> Result<bool> {
        for (i, clause) in self.clauses.iter().enumerate() {
            let result = clause.evaluate(scope)?;
            match self.connectors.get(i) {
                Some(Logic::And) if !result => return Ok(false),
                Some(Logic::Or) if result => return Ok(true),
                Some(_) => continue,
                None => return Ok(result),
            }
        }
        Ok(false)
    }

    /// Evaluates against a context value used as the root scope.
    pub fn evaluate_in(&self, context: &Value) -> Result<bool> {
        self.evaluate(&Scope::new(context))
    }
}
