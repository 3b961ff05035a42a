use crate::error::{Result, TemplateError};
use crate::options::Delimiters;
use crate::tpl::AstNode;
use crate::tpl::branch::BranchList;
use crate::tpl::condition::{Condition, Operand};
use crate::tpl::helper::{HelperRef, HelperRegistry};
use crate::tpl::lexer::{self, RawDirective, Segment};
use crate::tpl::render_context::Accessor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockKind {
    If,
    Loop,
}

impl BlockKind {
    fn keyword(self) -> &'static str {
        match self {
            BlockKind::If => "if",
            BlockKind::Loop => "loop",
        }
    }

    fn from_close(keyword: &str, line: usize) -> Result<BlockKind> {
        match keyword {
            "if" => Ok(BlockKind::If),
            "loop" | "for" => Ok(BlockKind::Loop),
            other => Err(TemplateError::syntax(
                line,
                format!("unknown block \"/{}\"", other),
            )),
        }
    }
}

/// A directive body classified by its marker and keyword.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Directive<'a> {
    Var { accessor: Accessor, escape: bool },
    Helper { name: &'a str, args: Vec<&'a str> },
    If(&'a str),
    ElseIf(&'a str),
    Else,
    Loop(&'a str),
    Close(&'a str),
}

impl<'a> Directive<'a> {
    pub(crate) fn classify(body: &'a str, line: usize) -> Result<Directive<'a>> {
        let body = body.trim();
        let Some(marker) = body.chars().next() else {
            return Err(TemplateError::syntax(line, "empty directive"));
        };
        let rest = &body[marker.len_utf8()..];

        match marker {
            '/' => Ok(Directive::Close(rest.trim())),
            '#' => {
                let mut words = split_args(rest).into_iter();
                let name = words
                    .next()
                    .ok_or_else(|| TemplateError::syntax(line, "helper call without a name"))?;
                Ok(Directive::Helper {
                    name,
                    args: words.collect(),
                })
            }
            '@' => {
                let (escape, name) = match rest.strip_prefix('%') {
                    Some(name) => (false, name.trim()),
                    None => (true, rest.trim()),
                };
                let accessor = Accessor::reserved(name).ok_or_else(|| {
                    TemplateError::syntax(line, format!("unknown reserved variable \"@{}\"", name))
                })?;
                // @index is a number and never escaped
                let escape = escape && accessor != Accessor::Index;
                Ok(Directive::Var { accessor, escape })
            }
            '%' => variable(rest.trim(), false, line),
            _ => {
                let (word, tail) = body
                    .split_once(char::is_whitespace)
                    .map(|(w, t)| (w, t.trim()))
                    .unwrap_or((body, ""));
                match word {
                    "if" => required(tail, "if", line).map(Directive::If),
                    "loop" | "for" => required(tail, word, line).map(Directive::Loop),
                    "else" if tail.is_empty() => Ok(Directive::Else),
                    "else" => {
                        let (kw, cond) = tail
                            .split_once(char::is_whitespace)
                            .map(|(w, c)| (w, c.trim()))
                            .unwrap_or((tail, ""));
                        if kw != "if" {
                            return Err(TemplateError::syntax(
                                line,
                                format!("unexpected \"{}\" after \"else\"", tail),
                            ));
                        }
                        required(cond, "else if", line).map(Directive::ElseIf)
                    }
                    _ => variable(body, true, line),
                }
            }
        }
    }

    fn opens_block(&self) -> bool {
        matches!(self, Directive::If(_) | Directive::Loop(_))
    }
}

fn required<'a>(tail: &'a str, keyword: &str, line: usize) -> Result<&'a str> {
    if tail.is_empty() {
        Err(TemplateError::syntax(
            line,
            format!("\"{}\" requires an expression", keyword),
        ))
    } else {
        Ok(tail)
    }
}

fn variable<'a>(path: &str, escape: bool, line: usize) -> Result<Directive<'a>> {
    if path.is_empty() {
        return Err(TemplateError::syntax(line, "empty variable name"));
    }
    if path.contains(char::is_whitespace) {
        return Err(TemplateError::syntax(
            line,
            format!("unknown directive \"{}\"", path),
        ));
    }
    let accessor = Accessor::parse(path).map_err(|m| TemplateError::syntax(line, m))?;
    Ok(Directive::Var { accessor, escape })
}

/// Splits helper arguments on whitespace, keeping quoted literals whole.
fn split_args(s: &str) -> Vec<&str> {
    let mut args = Vec::new();
    let mut start = None;
    let mut quote = None;
    for (i, c) in s.char_indices() {
        match (quote, start) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, _) if c == '\'' || c == '"' => {
                quote = Some(c);
                start.get_or_insert(i);
            }
            (None, Some(st)) if c.is_whitespace() => {
                args.push(&s[st..i]);
                start = None;
            }
            (None, None) if !c.is_whitespace() => start = Some(i),
            _ => {}
        }
    }
    if let Some(st) = start {
        args.push(&s[st..]);
    }
    args
}

/// Builds the node tree for one template. Holds only configuration, so a
/// compile never sees state left over from a previous one.
pub(crate) struct Compiler<'e> {
    pub delimiters: &'e Delimiters,
    pub helpers: &'e HelperRegistry,
    pub max_depth: usize,
}

impl Compiler<'_> {
    pub fn compile(&self, template: &str) -> Result<Vec<AstNode>> {
        self.fragment(template, 1, 0)
    }

    /// Compiles `src`, which starts on `base_line`. Block bodies are cut out
    /// verbatim and compiled by a recursive call one level deeper.
    fn fragment(&self, src: &str, base_line: usize, depth: usize) -> Result<Vec<AstNode>> {
        let segments = lexer::scan(src, self.delimiters, base_line)?;
        let mut nodes = Vec::new();
        let mut i = 0;

        while i < segments.len() {
            let d = match &segments[i] {
                Segment::Text(text) => {
                    append_text(&mut nodes, text);
                    i += 1;
                    continue;
                }
                Segment::Directive(d) => d,
            };

            match Directive::classify(d.body, d.line)? {
                Directive::Var { accessor, escape } => {
                    nodes.push(AstNode::Var { accessor, escape });
                }
                Directive::Helper { name, args } => {
                    nodes.push(self.helper(name, &args, d.line)?);
                }
                Directive::If(cond) => {
                    let (close_idx, close) = find_close(&segments, i, BlockKind::If)?;
                    self.check_depth(depth, d.line)?;
                    let body = &src[d.end..close.start];
                    nodes.push(self.if_block(cond, body, d, depth)?);
                    i = close_idx;
                }
                Directive::Loop(path) => {
                    let (close_idx, close) = find_close(&segments, i, BlockKind::Loop)?;
                    self.check_depth(depth, d.line)?;
                    let source = loop_source(path, d.line)?;
                    let body = self.fragment(&src[d.end..close.start], d.end_line, depth + 1)?;
                    nodes.push(AstNode::Loop { source, body });
                    i = close_idx;
                }
                Directive::Else | Directive::ElseIf(_) => {
                    return Err(TemplateError::syntax(
                        d.line,
                        "\"else\" outside of an \"if\" block",
                    ));
                }
                Directive::Close(keyword) => {
                    return Err(TemplateError::syntax(
                        d.line,
                        format!("\"/{}\" without an open block", keyword),
                    ));
                }
            }
            i += 1;
        }

        Ok(nodes)
    }

    fn check_depth(&self, depth: usize, line: usize) -> Result<()> {
        if depth >= self.max_depth {
            tracing::warn!("nesting limit {} reached at line {}", self.max_depth, line);
            return Err(TemplateError::NestingTooDeep(self.max_depth));
        }
        Ok(())
    }

    fn if_block(
        &self,
        cond: &str,
        body: &str,
        open: &RawDirective,
        depth: usize,
    ) -> Result<AstNode> {
        let list = BranchList::split_with(cond, body, self.delimiters, open.end_line)?;
        let mut branches = Vec::with_capacity(list.len());
        for branch in list.into_branches() {
            let condition = match branch.condition.as_deref() {
                Some(c) => Some(Condition::parse(c).map_err(|e| e.at_line(branch.line))?),
                None => None,
            };
            let body = self.fragment(&branch.body, branch.line, depth + 1)?;
            branches.push((condition, body));
        }
        Ok(AstNode::If { branches })
    }

    fn helper(&self, name: &str, args: &[&str], line: usize) -> Result<AstNode> {
        let func = self
            .helpers
            .get(name)
            .ok_or_else(|| TemplateError::UndefinedHelper(name.to_string()))?;
        let args = args
            .iter()
            .map(|a| Operand::parse(a).map_err(|m| TemplateError::syntax(line, m)))
            .collect::<Result<Vec<_>>>()?;
        Ok(AstNode::Helper {
            helper: HelperRef {
                name: name.to_string(),
                func,
            },
            args,
        })
    }
}

fn loop_source(path: &str, line: usize) -> Result<Accessor> {
    if path.contains(char::is_whitespace) {
        return Err(TemplateError::syntax(
            line,
            format!("loop source must be a single path, got \"{}\"", path),
        ));
    }
    Accessor::parse(path).map_err(|m| TemplateError::syntax(line, m))
}

/// Finds the directive closing the block opened at `open_idx`, skipping
/// over nested blocks.
fn find_close<'s, 'a>(
    segments: &'s [Segment<'a>],
    open_idx: usize,
    kind: BlockKind,
) -> Result<(usize, &'s RawDirective<'a>)> {
    let open_line = match &segments[open_idx] {
        Segment::Directive(d) => d.line,
        Segment::Text(_) => 0,
    };
    let mut depth = 0usize;

    for (k, segment) in segments.iter().enumerate().skip(open_idx + 1) {
        let Segment::Directive(d) = segment else {
            continue;
        };
        let directive = Directive::classify(d.body, d.line)?;
        if directive.opens_block() {
            depth += 1;
        } else if let Directive::Close(keyword) = directive {
            let closing = BlockKind::from_close(keyword, d.line)?;
            if depth == 0 {
                if closing != kind {
                    return Err(TemplateError::syntax(
                        d.line,
                        format!(
                            "expected \"/{}\" but found \"/{}\"",
                            kind.keyword(),
                            keyword
                        ),
                    ));
                }
                return Ok((k, d));
            }
            depth -= 1;
        }
    }

    Err(TemplateError::syntax(
        open_line,
        format!("unclosed \"{}\" block", kind.keyword()),
    ))
}

fn append_text(nodes: &mut Vec<AstNode>, text: &str) {
    if let Some(AstNode::Text(last_text)) = nodes.last_mut() {
        last_text.push_str(text);
    } else {
        nodes.push(AstNode::Text(text.to_string()));
    }
}
