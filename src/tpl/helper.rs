use crate::value::Value;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub type HelperFn = Arc<dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync>;

/// Wraps a closure as a [`HelperFn`], for building helper sets.
pub fn helper_fn<F>(helper: F) -> HelperFn
where
    F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
{
    Arc::new(helper)
}

/// Named helper functions callable as `{{#name arg1 arg2}}`.
#[derive(Default)]
pub struct HelperRegistry {
    helpers: DashMap<String, HelperFn>,
}

impl HelperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an infallible helper, replacing any helper of the same name.
    pub fn register<F, R>(&self, name: &str, helper: F)
    where
        F: Fn(&[Value]) -> R + Send + Sync + 'static,
        R: Into<Value>,
    {
        self.register_fallible(name, move |args| Ok(helper(args).into()));
    }

    /// Registers a helper that may fail; the message surfaces as
    /// `TemplateError::Helper` when the template renders.
    pub fn register_fallible<F>(&self, name: &str, helper: F)
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.register_all([(name, helper_fn(helper))]);
    }

    /// Registers every `(name, helper)` pair, e.g. from a `HashMap` of
    /// shared helpers.
    pub fn register_all<I, K>(&self, helpers: I)
    where
        I: IntoIterator<Item = (K, HelperFn)>,
        K: AsRef<str>,
    {
        for (name, helper) in helpers {
            let name = name.as_ref();
            if self.helpers.insert(name.to_string(), helper).is_some() {
                debug!("helper \"{}\" overwritten", name);
            } else {
                debug!("helper \"{}\" registered", name);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<HelperFn> {
        self.helpers.get(name).map(|h| h.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    pub fn remove(&self, name: &str) -> bool {
        self.helpers.remove(name).is_some()
    }
}

impl fmt::Debug for HelperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.helpers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        f.debug_struct("HelperRegistry").field("helpers", &names).finish()
    }
}

/// A helper resolved at compile time.
#[derive(Clone)]
pub struct HelperRef {
    pub name: String,
    pub func: HelperFn,
}

impl HelperRef {
    pub fn call(&self, args: &[Value]) -> Result<Value, String> {
        (self.func)(args)
    }
}

impl fmt::Debug for HelperRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelperRef").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_call() {
        let registry = HelperRegistry::new();
        registry.register("upper", |args: &[Value]| {
            args.first().map(|v| v.to_string().to_uppercase()).unwrap_or_default()
        });
        let helper = registry.get("upper").unwrap();
        assert_eq!(helper(&[Value::from("abc")]), Ok(Value::from("ABC")));
        assert!(registry.get("lower").is_none());
    }

    #[test]
    fn test_reregister_overwrites() {
        let registry = HelperRegistry::new();
        registry.register("v", |_: &[Value]| 1);
        registry.register("v", |_: &[Value]| 2);
        assert_eq!(registry.get("v").unwrap()(&[]), Ok(Value::I64(2)));
    }

    #[test]
    fn test_register_all() {
        let registry = HelperRegistry::new();
        registry.register("one", |_: &[Value]| 0);
        registry.register_all([
            ("one", helper_fn(|_| Ok(Value::I64(1)))),
            ("two", helper_fn(|args| Ok(Value::I64(args.len() as i64)))),
        ]);
        assert_eq!(registry.get("one").unwrap()(&[]), Ok(Value::I64(1)));
        assert_eq!(
            registry.get("two").unwrap()(&[Value::Null, Value::Null]),
            Ok(Value::I64(2))
        );
    }

    #[test]
    fn test_fallible() {
        let registry = HelperRegistry::new();
        registry.register_fallible("fail", |_| Err("boom".to_string()));
        assert_eq!(registry.get("fail").unwrap()(&[]), Err("boom".to_string()));
        assert!(registry.remove("fail"));
        assert!(!registry.contains("fail"));
    }
}
