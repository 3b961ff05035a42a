pub mod arith;
pub mod branch;
mod cache;
pub mod condition;
pub mod engine;
pub mod helper;
mod lexer;
mod parser;
mod render;
pub mod render_context;

pub use render::escape_html;

use crate::tpl::condition::{Condition, Operand};
use crate::tpl::helper::HelperRef;
use crate::tpl::render_context::Accessor;

#[derive(Debug, Clone)]
pub enum AstNode {
    Text(String),
    Var {
        accessor: Accessor,
        escape: bool,
    },
    Helper {
        helper: HelperRef,
        args: Vec<Operand>,
    },
    If {
        branches: Vec<(Option<Condition>, Vec<AstNode>)>,
    },
    Loop {
        source: Accessor,
        body: Vec<AstNode>,
    },
}
