use crate::error::Result;
use crate::tpl::engine::Template;
use dashmap::DashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::trace;

#[derive(Clone)]
struct CachedTemplate {
    template: Template,
    content_hash: u64,
}

/// 按名称缓存编译后的模板，内容变化时重新编译
#[derive(Default)]
pub(crate) struct TemplateCache {
    entries: DashMap<String, CachedTemplate>,
}

impl TemplateCache {
    pub fn get_or_compile<F>(&self, name: &str, content: &str, compile: F) -> Result<Template>
    where
        F: FnOnce(&str) -> Result<Template>,
    {
        let mut hasher = DefaultHasher::new();
        content.hash(&mut hasher);
        let new_hash = hasher.finish();

        if let Some(cached) = self.entries.get(name) {
            if cached.content_hash == new_hash {
                trace!("template \"{}\" served from cache", name);
                return Ok(cached.template.clone());
            }
        }

        let template = compile(content)?;
        trace!("template \"{}\" compiled and cached", name);
        self.entries.insert(
            name.to_string(),
            CachedTemplate {
                template: template.clone(),
                content_hash: new_hash,
            },
        );
        Ok(template)
    }

    pub fn remove(&self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
