use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

/// Result of a translation lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Translation {
    /// A string leaf, or the requested key itself when the lookup missed.
    Text(String),
    /// A non-string leaf (object, array, number, ...) for structured consumers.
    Structured(Value),
}

impl Translation {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Translation::Text(s) => Some(s),
            Translation::Structured(_) => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Translation::Text(s) => Some(s),
            Translation::Structured(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Translation::Structured(v) => Some(v),
            Translation::Text(_) => None,
        }
    }
}

/// Nested translation and configuration data for one language.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationTree(Value);

impl Default for TranslationTree {
    fn default() -> Self {
        Self::empty()
    }
}

impl TranslationTree {
    pub fn empty() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json).map(Self)
    }

    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Object(map) => map.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Null => true,
            _ => false,
        }
    }

    /// Walk a dotted path. Array segments are numeric indices.
    pub fn get(&self, key: &str) -> Option<&Value> {
        key.split('.').try_fold(&self.0, |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    /// Resolve `key`, interpolating `{name}` placeholders from `vars`.
    ///
    /// A miss at any segment, or an empty tree, yields the key verbatim.
    /// Placeholders without a matching var are left as written.
    pub fn translate(&self, key: &str, vars: &[(&str, &str)]) -> Translation {
        if self.is_empty() {
            return Translation::Text(key.to_string());
        }
        match self.get(key) {
            None => Translation::Text(key.to_string()),
            Some(Value::String(s)) if vars.is_empty() => Translation::Text(s.clone()),
            Some(Value::String(s)) => Translation::Text(interpolate(s, vars)),
            Some(other) => Translation::Structured(other.clone()),
        }
    }
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("Invalid regex pattern"))
}

fn interpolate(template: &str, vars: &[(&str, &str)]) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v).to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_nested_path() {
        let tree = TranslationTree::from_value(json!({"a": {"b": {"c": "X"}}}));
        assert_eq!(tree.translate("a.b.c", &[]), Translation::Text("X".into()));
    }

    #[test]
    fn missing_segment_returns_key() {
        let tree = TranslationTree::from_value(json!({"a": {"b": {}}}));
        assert_eq!(tree.translate("a.b.c", &[]), Translation::Text("a.b.c".into()));
        assert_eq!(tree.translate("a.x.y.z", &[]), Translation::Text("a.x.y.z".into()));
        // Walking through a string leaf is a miss too.
        let tree = TranslationTree::from_value(json!({"a": "leaf"}));
        assert_eq!(tree.translate("a.b", &[]), Translation::Text("a.b".into()));
    }

    #[test]
    fn empty_tree_returns_every_key_unchanged() {
        let tree = TranslationTree::empty();
        for key in ["meta.title", "", "a..b", "greet"] {
            assert_eq!(tree.translate(key, &[("name", "Ana")]), Translation::Text(key.into()));
        }
    }

    #[test]
    fn interpolates_only_when_vars_are_given() {
        let tree = TranslationTree::from_value(json!({"greet": "Hello {name}"}));
        assert_eq!(
            tree.translate("greet", &[("name", "Ana")]),
            Translation::Text("Hello Ana".into())
        );
        assert_eq!(tree.translate("greet", &[]), Translation::Text("Hello {name}".into()));
        assert_eq!(
            tree.translate("greet", &[("other", "x")]),
            Translation::Text("Hello {name}".into())
        );
    }

    #[test]
    fn structured_values_are_returned_as_is() {
        let tree = TranslationTree::from_value(json!({
            "config": {"skills": {"category1": {"items": ["Rust", "SQL"]}}, "years": 7}
        }));
        let items = tree.translate("config.skills.category1.items", &[]);
        assert_eq!(items, Translation::Structured(json!(["Rust", "SQL"])));
        assert_eq!(tree.translate("config.years", &[]).as_value(), Some(&json!(7)));
        assert_eq!(
            tree.translate("config.skills.category1.items.1", &[]),
            Translation::Text("SQL".into())
        );
    }
}
