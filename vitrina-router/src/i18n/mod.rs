//! Localization: translation trees, the active locale and DOM annotation.

pub mod annotate;
pub mod render;
mod store;
mod tree;

pub use store::{ActiveLocale, LocaleStore};
pub use tree::{Translation, TranslationTree};

use regex::Regex;

/// Anything that can resolve a dotted translation key.
pub trait Lookup {
    fn lookup(&self, key: &str) -> Translation;

    /// Inline markup for a named icon, empty when unknown.
    fn icon(&self, _name: &str) -> String {
        String::new()
    }
}

impl Lookup for TranslationTree {
    fn lookup(&self, key: &str) -> Translation {
        self.translate(key, &[])
    }
}

/// Matches the `/<lang>` prefix of a fragment path for the supported set.
#[derive(Debug, Clone)]
pub struct LanguagePrefix {
    pattern: Regex,
}

impl LanguagePrefix {
    pub fn new(supported: &[String]) -> Self {
        let alternatives = supported
            .iter()
            .map(|lang| regex::escape(lang))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!("^/({alternatives})(/.*)?$"))
            .expect("Invalid regex pattern");
        Self { pattern }
    }

    /// Split a fragment path (without `#`) into language and logical path.
    ///
    /// `/es/about` yields `("es", "/about")`, `/en` and `/en/` yield
    /// `("en", "/")`. `/esx/about` and `/fr/about` do not match.
    pub fn split<'a>(&self, path: &'a str) -> Option<(&'a str, &'a str)> {
        let caps = self.pattern.captures(path)?;
        let lang = caps.get(1)?.as_str();
        let rest = caps.get(2).map(|m| m.as_str()).unwrap_or("/");
        Some((lang, rest))
    }

    /// The fragment for the same logical path under `lang`.
    pub fn relocalize(&self, fragment: &str, lang: &str) -> String {
        let hash = fragment.trim_start_matches('#');
        let path = match self.split(hash) {
            Some((_, path)) => path.to_string(),
            None if hash.is_empty() => "/".to_string(),
            None => format!("/{}", hash.trim_start_matches('/')),
        };
        format!("#/{lang}{path}")
    }
}

/// External state consulted once at startup to pick the first language.
#[derive(Debug, Clone, Default)]
pub struct DetectContext<'a> {
    pub stored: Option<&'a str>,
    pub fragment: &'a str,
    pub navigator: Option<&'a str>,
    pub supported: &'a [String],
    pub default: &'a str,
}

/// stored preference -> fragment prefix -> navigator primary subtag -> default
pub fn detect_initial_language(ctx: &DetectContext<'_>) -> String {
    let is_supported = |lang: &str| ctx.supported.iter().any(|s| s == lang);

    if let Some(stored) = ctx.stored.filter(|s| is_supported(s)) {
        return stored.to_string();
    }

    let path = ctx.fragment.trim_start_matches('#');
    if let Some((lang, _)) = LanguagePrefix::new(ctx.supported).split(path) {
        return lang.to_string();
    }

    if let Some(navigator) = ctx.navigator {
        let primary = navigator
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if is_supported(&primary) {
            return primary;
        }
    }

    ctx.default.to_string()
}
