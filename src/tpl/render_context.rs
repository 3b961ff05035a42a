use crate::value::Value;
use std::borrow::Cow;

static NULL: Value = Value::Null;

/// Where an identifier reads its value from.
#[derive(Debug, Clone, PartialEq)]
pub enum Accessor {
    /// Dotted path relative to the current scope item.
    Path(String),
    /// `@data` / `@data.x`: the current scope item itself.
    Data(Option<String>),
    /// `@parent` / `@parent.x`: the item of the enclosing scope.
    Parent(Option<String>),
    /// `@index`: zero-based counter of the innermost loop.
    Index,
}

impl Accessor {
    /// Parses an identifier, treating a leading `@` as a reserved variable.
    pub fn parse(ident: &str) -> Result<Accessor, String> {
        match ident.strip_prefix('@') {
            Some(reserved) => Accessor::reserved(reserved)
                .ok_or_else(|| format!("unknown reserved variable \"@{}\"", reserved)),
            None => Ok(Accessor::Path(ident.to_string())),
        }
    }

    /// Parses a reserved variable name without its `@`.
    pub fn reserved(name: &str) -> Option<Accessor> {
        fn tail(rest: &str) -> Option<Option<String>> {
            if rest.is_empty() {
                return Some(None);
            }
            match rest.strip_prefix('.') {
                Some(path) if !path.is_empty() => Some(Some(path.to_string())),
                _ => None,
            }
        }

        if let Some(rest) = name.strip_prefix("data") {
            tail(rest).map(Accessor::Data)
        } else if let Some(rest) = name.strip_prefix("parent") {
            tail(rest).map(Accessor::Parent)
        } else if name == "index" {
            Some(Accessor::Index)
        } else {
            None
        }
    }
}

struct Frame<'a> {
    item: &'a Value,
    index: Option<usize>,
}

/// The scope path: the root context at the bottom and one frame per loop
/// currently being rendered.
pub struct Scope<'a> {
    frames: Vec<Frame<'a>>,
}

impl<'a> Scope<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self {
            frames: vec![Frame {
                item: root,
                index: None,
            }],
        }
    }

    pub fn push(&mut self, item: &'a Value, index: usize) {
        self.frames.push(Frame {
            item,
            index: Some(index),
        });
    }

    pub fn pop(&mut self) {
        // 根作用域不能弹出
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Number of enclosing loops.
    #[cfg(test)]
    fn loop_depth(&self) -> usize {
        self.frames.len() - 1
    }

    pub fn current(&self) -> &'a Value {
        self.frames.last().map_or(&NULL, |f| f.item)
    }

    fn parent(&self) -> Option<&'a Value> {
        let len = self.frames.len();
        if len < 2 {
            return None;
        }
        Some(self.frames[len - 2].item)
    }

    /// Resolves to a value borrowed from the context. `@index` has no place
    /// in the context and yields `None`, as does a missing path.
    pub fn resolve_ref(&self, accessor: &Accessor) -> Option<&'a Value> {
        match accessor {
            Accessor::Path(path) => self.current().get_path(path),
            Accessor::Data(path) => Self::descend(self.current(), path.as_deref()),
            Accessor::Parent(path) => Self::descend(self.parent()?, path.as_deref()),
            Accessor::Index => None,
        }
    }

    /// Resolves an accessor; anything absent becomes `Null`.
    pub fn resolve(&self, accessor: &Accessor) -> Cow<'a, Value> {
        if let Accessor::Index = accessor {
            return match self.frames.last().and_then(|f| f.index) {
                Some(i) => Cow::Owned(Value::I64(i as i64)),
                None => Cow::Borrowed(&NULL),
            };
        }
        Cow::Borrowed(self.resolve_ref(accessor).unwrap_or(&NULL))
    }

    fn descend(value: &'a Value, path: Option<&str>) -> Option<&'a Value> {
        match path {
            Some(path) => value.get_path(path),
            None => Some(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn map(entries: &[(&str, Value)]) -> Value {
        Value::Map(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<IndexMap<_, _>>(),
        )
    }

    #[test]
    fn test_parse_accessor() {
        assert_eq!(Accessor::parse("a.b"), Ok(Accessor::Path("a.b".into())));
        assert_eq!(Accessor::parse("@data"), Ok(Accessor::Data(None)));
        assert_eq!(
            Accessor::parse("@parent.foo"),
            Ok(Accessor::Parent(Some("foo".into())))
        );
        assert_eq!(Accessor::parse("@index"), Ok(Accessor::Index));
        assert!(Accessor::parse("@dataset").is_err());
        assert!(Accessor::parse("@index.x").is_err());
        assert!(Accessor::parse("@foo").is_err());
    }

    #[test]
    fn test_lookup_simple() {
        let root = map(&[("a", Value::I64(1))]);
        let scope = Scope::new(&root);

        assert_eq!(*scope.resolve(&Accessor::Path("a".into())), Value::I64(1));
        assert_eq!(*scope.resolve(&Accessor::Path("b".into())), Value::Null);
        assert_eq!(*scope.resolve(&Accessor::Index), Value::Null);
        assert_eq!(*scope.resolve(&Accessor::Parent(None)), Value::Null);
    }

    #[test]
    fn test_lookup_nested() {
        let root = map(&[("a", map(&[("b", Value::I64(2))]))]);
        let scope = Scope::new(&root);

        assert_eq!(*scope.resolve(&Accessor::Path("a.b".into())), Value::I64(2));
        assert_eq!(*scope.resolve(&Accessor::Path("a.c".into())), Value::Null);
        assert_eq!(*scope.resolve(&Accessor::Path("x.y".into())), Value::Null);
    }

    #[test]
    fn test_loop_frames() {
        let item = map(&[("name", Value::from("tom"))]);
        let root = map(&[("foo", Value::from("bar"))]);
        let mut scope = Scope::new(&root);

        scope.push(&item, 3);
        assert_eq!(scope.loop_depth(), 1);
        assert_eq!(*scope.resolve(&Accessor::Path("name".into())), Value::from("tom"));
        assert_eq!(*scope.resolve(&Accessor::Path("foo".into())), Value::Null);
        assert_eq!(
            *scope.resolve(&Accessor::Parent(Some("foo".into()))),
            Value::from("bar")
        );
        assert_eq!(*scope.resolve(&Accessor::Index), Value::I64(3));

        scope.pop();
        scope.pop();
        assert_eq!(scope.loop_depth(), 0);
        assert_eq!(*scope.resolve(&Accessor::Data(Some("foo".into()))), Value::from("bar"));
    }
}
