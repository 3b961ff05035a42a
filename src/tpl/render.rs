use crate::error::{Result, TemplateError};
use crate::tpl::AstNode;
use crate::tpl::branch::select;
use crate::tpl::render_context::Scope;
use crate::value::Value;
use std::borrow::Cow;

/// Replaces `<`, `>`, `"` and `'` with HTML entities.
pub fn escape_html(s: &str) -> Cow<'_, str> {
    if !s.contains(['<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn push_value(out: &mut String, value: &Value, escape: bool) {
    if value.is_null() {
        return;
    }
    let text = value.to_string();
    if escape {
        out.push_str(&escape_html(&text));
    } else {
        out.push_str(&text);
    }
}

pub(crate) fn render<'a>(nodes: &[AstNode], scope: &mut Scope<'a>, out: &mut String) -> Result<()> {
    for node in nodes {
        match node {
            AstNode::Text(t) => out.push_str(t),
            AstNode::Var { accessor, escape } => {
                push_value(out, &scope.resolve(accessor), *escape);
            }
            AstNode::Helper { helper, args } => {
                let args: Vec<Value> = args.iter().map(|a| a.resolve(scope)).collect();
                let value = helper.call(&args).map_err(|message| TemplateError::Helper {
                    name: helper.name.clone(),
                    message,
                })?;
                push_value(out, &value, false);
            }
            AstNode::If { branches } => {
                if let Some(body) = select(branches, scope)? {
                    let mut piece = String::new();
                    render(body, scope, &mut piece)?;
                    out.push_str(piece.trim());
                }
            }
            AstNode::Loop { source, body } => {
                let items: Vec<&'a Value> = match scope.resolve_ref(source) {
                    Some(Value::List(list)) => list.iter().collect(),
                    Some(Value::Map(map)) => map.values().collect(),
                    _ => continue,
                };
                for (index, item) in items.into_iter().enumerate() {
                    let mut piece = String::new();
                    scope.push(item, index);
                    let rendered = render(body, scope, &mut piece);
                    scope.pop();
                    rendered?;
                    out.push_str(piece.trim());
                }
            }
        }
    }
    Ok(())
}
