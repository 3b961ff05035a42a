use crate::error::{Result, TemplateError};
use crate::options::Delimiters;
use crate::tpl::condition::Condition;
use crate::tpl::lexer::{self, Segment};
use crate::tpl::parser::Directive;
use crate::tpl::render_context::Scope;
use crate::value::Value;

/// One arm of an if/else-if/else chain. `condition` is `None` for `else`.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub condition: Option<String>,
    pub body: String,
    pub(crate) line: usize,
}

/// The arms of one `if` block, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchList {
    branches: Vec<Branch>,
}

impl BranchList {
    /// Splits the raw body of `{{if cond}}...{{/if}}` on its top-level
    /// `{{else}}` / `{{else if ...}}` markers.
    pub fn split(condition: &str, raw: &str) -> Result<BranchList> {
        Self::split_with(condition, raw, &Delimiters::default(), 1)
    }

    pub(crate) fn split_with(
        condition: &str,
        raw: &str,
        delimiters: &Delimiters,
        base_line: usize,
    ) -> Result<BranchList> {
        // (condition, start, end, line, end_line) of each top-level marker
        let mut markers: Vec<(Option<&str>, usize, usize, usize, usize)> = Vec::new();
        let mut depth = 0usize;

        for segment in lexer::scan(raw, delimiters, base_line)? {
            let Segment::Directive(d) = segment else {
                continue;
            };
            match Directive::classify(d.body, d.line)? {
                Directive::If(_) | Directive::Loop(_) => depth += 1,
                Directive::Close(_) => depth = depth.saturating_sub(1),
                Directive::Else if depth == 0 => {
                    markers.push((None, d.start, d.end, d.line, d.end_line))
                }
                Directive::ElseIf(cond) if depth == 0 => {
                    markers.push((Some(cond), d.start, d.end, d.line, d.end_line))
                }
                _ => {}
            }
        }

        if let Some(pos) = markers.iter().position(|m| m.0.is_none()) {
            if let Some(next) = markers.get(pos + 1) {
                return Err(TemplateError::syntax(
                    next.3,
                    "\"else\" must be the last branch of an \"if\" block",
                ));
            }
        }

        if markers.is_empty() {
            return Ok(BranchList {
                branches: vec![Branch {
                    condition: Some(condition.to_string()),
                    body: raw.to_string(),
                    line: base_line,
                }],
            });
        }

        let mut branches = Vec::with_capacity(markers.len() + 1);
        let first = &raw[..markers[0].1];
        let (first, line) = match first.strip_prefix('\n') {
            Some(rest) => (rest, base_line + 1),
            None => (first, base_line),
        };
        branches.push(Branch {
            condition: Some(condition.to_string()),
            body: first.to_string(),
            line,
        });

        for (k, &(cond, _, end, _, end_line)) in markers.iter().enumerate() {
            let stop = markers.get(k + 1).map_or(raw.len(), |m| m.1);
            let body = &raw[end..stop];
            branches.push(Branch {
                condition: cond.map(str::to_string),
                body: body.strip_suffix('\n').unwrap_or(body).to_string(),
                line: end_line,
            });
        }

        Ok(BranchList { branches })
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    pub fn into_branches(self) -> Vec<Branch> {
        self.branches
    }

    /// Returns the raw body of the first arm whose condition holds in
    /// `context`, or `""` when none does.
    pub fn resolve(&self, context: &Value) -> Result<&str> {
        let mut parsed = Vec::with_capacity(self.branches.len());
        for branch in &self.branches {
            let condition = match branch.condition.as_deref() {
                Some(c) => Some(Condition::parse(c)?),
                None => None,
            };
            parsed.push((condition, branch.body.as_str()));
        }
        let scope = Scope::new(context);
        Ok(select(&parsed, &scope)?.copied().unwrap_or(""))
    }
}

/// Picks the first arm whose condition holds. An arm without a condition
/// always matches.
pub(crate) fn select<'b, B>(
    branches: &'b [(Option<Condition>, B)],
    scope: &Scope,
) -> Result<Option<&'b B>> {
    for (condition, body) in branches {
        match condition {
            None => return Ok(Some(body)),
            Some(c) if c.evaluate(scope)? => return Ok(Some(body)),
            Some(_) => {}
        }
    }
    Ok(None)
}
