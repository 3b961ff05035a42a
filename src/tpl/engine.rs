use crate::error::Result;
use crate::options::{DEFAULT_MAX_DEPTH, Delimiters, EngineOptions};
use crate::tpl::cache::TemplateCache;
use crate::tpl::helper::{HelperFn, HelperRegistry};
use crate::tpl::parser::Compiler;
use crate::tpl::render_context::Scope;
use crate::tpl::{AstNode, render};
use crate::value::{Value, to_value};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// A compiled template. Immutable and cheap to clone; every render starts
/// from a fresh scope.
#[derive(Debug, Clone)]
pub struct Template {
    nodes: Arc<Vec<AstNode>>,
}

impl Template {
    /// 序列化上下文后渲染
    pub fn render<T: ?Sized + Serialize>(&self, context: &T) -> Result<String> {
        self.render_value(&to_value(context)?)
    }

    pub fn render_value(&self, context: &Value) -> Result<String> {
        let mut scope = Scope::new(context);
        let mut out = String::new();
        render::render(&self.nodes, &mut scope, &mut out)?;
        Ok(out.trim().to_string())
    }

    pub fn nodes(&self) -> &[AstNode] {
        &self.nodes
    }
}

/// Compiles with the given delimiters, no helpers and the default nesting
/// limit.
pub fn compile(template: &str, delimiters: &Delimiters) -> Result<Template> {
    let helpers = HelperRegistry::new();
    let nodes = Compiler {
        delimiters,
        helpers: &helpers,
        max_depth: DEFAULT_MAX_DEPTH,
    }
    .compile(template)?;
    Ok(Template {
        nodes: Arc::new(nodes),
    })
}

/// Owns the configuration, helpers and named-template cache used to compile
/// templates.
pub struct Engine {
    options: EngineOptions,
    helpers: HelperRegistry,
    cache: TemplateCache,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        Engine {
            options,
            helpers: HelperRegistry::new(),
            cache: TemplateCache::default(),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Templates compiled earlier keep the helper they resolved.
    pub fn register_helper<F, R>(&self, name: &str, helper: F)
    where
        F: Fn(&[Value]) -> R + Send + Sync + 'static,
        R: Into<Value>,
    {
        self.helpers.register(name, helper);
    }

    pub fn register_fallible_helper<F>(&self, name: &str, helper: F)
    where
        F: Fn(&[Value]) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        self.helpers.register_fallible(name, helper);
    }

    pub fn register_helpers<I, K>(&self, helpers: I)
    where
        I: IntoIterator<Item = (K, HelperFn)>,
        K: AsRef<str>,
    {
        self.helpers.register_all(helpers);
    }

    pub fn has_helper(&self, name: &str) -> bool {
        self.helpers.contains(name)
    }

    /// Templates already compiled keep calling the removed helper.
    pub fn unregister_helper(&self, name: &str) -> bool {
        self.helpers.remove(name)
    }

    pub fn compile(&self, template: &str) -> Result<Template> {
        let start = Instant::now();
        let nodes = Compiler {
            delimiters: &self.options.delimiters,
            helpers: &self.helpers,
            max_depth: self.options.max_depth,
        }
        .compile(template)?;
        debug!(
            "compiled template into {} nodes in {:?}",
            nodes.len(),
            start.elapsed()
        );
        Ok(Template {
            nodes: Arc::new(nodes),
        })
    }

    /// 渲染具名模板；开启缓存时同名同内容的模板只编译一次
    pub fn render_template<T: ?Sized + Serialize>(
        &self,
        name: &str,
        content: &str,
        context: &T,
    ) -> Result<String> {
        let template = if self.options.cache {
            self.cache
                .get_or_compile(name, content, |c| self.compile(c))?
        } else {
            self.compile(content)?
        };
        template.render(context)
    }

    /// 卸载模板缓存
    pub fn remove_template(&self, name: &str) -> bool {
        self.cache.remove(name)
    }

    pub fn cached_templates(&self) -> usize {
        self.cache.len()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
