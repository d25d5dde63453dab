//! Marker-attribute passes that write resolved translations into the document.
//!
//! Every pass only writes when the resolved value differs from what the
//! element already holds, so running a pass twice leaves the document's
//! mutation counter untouched.

use tracing::debug;
use vitrina_core::validate;

use super::{LanguagePrefix, Lookup};
use crate::dom::{Document, NodeId};

pub const I18N_ATTR: &str = "data-i18n";
pub const PLACEHOLDER_ATTR: &str = "data-i18n-placeholder";
pub const ARIA_ATTR: &str = "data-i18n-aria";
pub const GUIDE_ATTR: &str = "data-guide";
pub const CONFIG_ATTR: &str = "data-config";
pub const GUIDE_CLASS: &str = "has-guide";

fn marked(doc: &Document, scope: NodeId, attr: &str) -> Vec<(NodeId, String)> {
    doc.query_all(scope, |el| el.has_attr(attr))
        .into_iter()
        .filter_map(|node| Some((node, doc.attr(node, attr)?.to_string())))
        .collect()
}

/// `data-i18n` to text content. Structured results are skipped.
pub fn apply_translations(doc: &mut Document, lookup: &dyn Lookup, scope: NodeId) {
    for (node, key) in marked(doc, scope, I18N_ATTR) {
        match lookup.lookup(&key).into_text() {
            Some(text) => {
                doc.set_text_content(node, &text);
            }
            None => debug!("Non-text value for {}: {}", I18N_ATTR, key),
        }
    }
}

pub fn apply_placeholders(doc: &mut Document, lookup: &dyn Lookup, scope: NodeId) {
    apply_attribute(doc, lookup, scope, PLACEHOLDER_ATTR, "placeholder");
}

pub fn apply_aria_labels(doc: &mut Document, lookup: &dyn Lookup, scope: NodeId) {
    apply_attribute(doc, lookup, scope, ARIA_ATTR, "aria-label");
}

fn apply_attribute(
    doc: &mut Document,
    lookup: &dyn Lookup,
    scope: NodeId,
    marker: &str,
    target: &str,
) {
    for (node, key) in marked(doc, scope, marker) {
        if let Some(text) = lookup.lookup(&key).into_text() {
            doc.set_attr(node, target, &text);
        }
    }
}

/// `data-guide` to `title`, and tag the element with the guide class.
pub fn apply_guides(doc: &mut Document, lookup: &dyn Lookup, scope: NodeId) {
    for (node, key) in marked(doc, scope, GUIDE_ATTR) {
        if let Some(text) = lookup.lookup(&key).into_text() {
            doc.set_attr(node, "title", &text);
            doc.add_class(node, GUIDE_CLASS);
        }
    }
}

/// `data-config` to text, or to `href` for links bound to a `_url` key.
/// Values are validated first and replaced by a placeholder when invalid.
pub fn apply_config(doc: &mut Document, lookup: &dyn Lookup, scope: NodeId) {
    for (node, key) in marked(doc, scope, CONFIG_ATTR) {
        let Some(raw) = lookup.lookup(&format!("config.{key}")).into_text() else {
            debug!("Non-text config value: {}", key);
            continue;
        };
        let value = validate::config_value(&key, &raw);
        if doc.tag(node) == Some("a") && key.contains("_url") {
            doc.set_attr(node, "href", value);
        } else {
            doc.set_text_content(node, value);
        }
    }
}

/// Every marker pass, in a fixed order.
pub fn apply_all(doc: &mut Document, lookup: &dyn Lookup, scope: NodeId) {
    apply_translations(doc, lookup, scope);
    apply_placeholders(doc, lookup, scope);
    apply_aria_labels(doc, lookup, scope);
    apply_config(doc, lookup, scope);
    apply_guides(doc, lookup, scope);
}

/// `<title>` from `meta.title` and `meta[name=description]` from
/// `meta.description`. Missing keys leave the document as it is.
pub fn apply_meta(doc: &mut Document, lookup: &dyn Lookup) {
    if let Some(title) = resolved(lookup, "meta.title") {
        doc.set_title(&title);
    }
    if let Some(description) = resolved(lookup, "meta.description") {
        let head = doc.head();
        let meta = doc.query_first(head, |el| {
            el.tag() == "meta" && el.attr("name") == Some("description")
        });
        if let Some(meta) = meta {
            doc.set_attr(meta, "content", &description);
        }
    }
}

fn resolved(lookup: &dyn Lookup, key: &str) -> Option<String> {
    lookup.lookup(key).into_text().filter(|text| text != key)
}

/// Prefix internal links (`#/path`) under `scope` with the active language.
/// Links that already carry a supported prefix are left alone.
pub fn prefix_internal_links(doc: &mut Document, scope: NodeId, lang: &str, prefix: &LanguagePrefix) {
    let links = doc.query_all(scope, |el| {
        el.tag() == "a" && el.attr("href").is_some_and(|h| h.starts_with("#/"))
    });
    for link in links {
        let Some(href) = doc.attr(link, "href").map(str::to_string) else {
            continue;
        };
        let path = &href[1..];
        if prefix.split(path).is_some() {
            continue;
        }
        let rest = path.trim_start_matches('/');
        doc.set_attr(link, "href", &format!("#/{lang}/{rest}"));
    }
}
