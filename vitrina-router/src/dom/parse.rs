//! Import fetched HTML into a [`Document`] using `scraper`.

use ego_tree::NodeRef;
use scraper::{Html, Node, Selector};

use super::{Document, Element, NodeId};

/// Parse a fetched view resource and import its first `<template id="...">`.
///
/// Returns the template id and the detached template element; its children are
/// the template content. `None` when the body holds no template with an id.
pub fn parse_template(doc: &mut Document, html: &str) -> Option<(String, NodeId)> {
    let source = Html::parse_document(html);
    let selector = Selector::parse("template[id]").ok()?;
    let template = source
        .select(&selector)
        .find(|t| t.value().attr("id").is_some_and(|id| !id.is_empty()))?;
    let id = template.value().attr("id")?.to_string();
    let node = import(doc, *template)?;
    Some((id, node))
}

/// Build a page document from a shell such as `index.html`.
///
/// `<head>` and `<body>` children are imported as-is; the `lang` attribute of
/// `<html>` is kept.
pub fn parse_document(html: &str) -> Document {
    let source = Html::parse_document(html);
    let mut doc = Document::new();
    let root = source.root_element();
    if let Some(lang) = root.value().attr("lang") {
        doc.set_lang(lang);
    }
    for section in root.children() {
        let target = match section.value() {
            Node::Element(el) if el.name() == "head" => doc.head(),
            Node::Element(el) if el.name() == "body" => doc.body(),
            _ => continue,
        };
        for child in section.children() {
            if let Some(id) = import(&mut doc, child) {
                doc.append_child(target, id);
            }
        }
    }
    doc
}

/// Parse a markup snippet (e.g. an inline SVG icon) into detached nodes.
pub fn parse_fragment(doc: &mut Document, html: &str) -> Vec<NodeId> {
    let fragment = Html::parse_fragment(html);
    fragment
        .root_element()
        .children()
        .filter_map(|child| import(doc, child))
        .collect()
}

fn import(doc: &mut Document, node: NodeRef<'_, Node>) -> Option<NodeId> {
    match node.value() {
        Node::Text(text) => Some(doc.create_text(&**text)),
        Node::Element(el) => {
            let mut element = Element::new(el.name());
            for (name, value) in el.attrs() {
                if name == "style" {
                    element.styles.extend(parse_style(value));
                } else {
                    element.attrs.insert(name.to_string(), value.to_string());
                }
            }
            let id = doc.create_from(element);
            import_children(doc, id, node);
            Some(id)
        }
        _ => None,
    }
}

/// `<template>` content sits under a document fragment child; its nodes
/// become direct children of the imported element.
fn import_children(doc: &mut Document, parent: NodeId, node: NodeRef<'_, Node>) {
    for child in node.children() {
        if let Node::Fragment = child.value() {
            import_children(doc, parent, child);
        } else if let Some(child_id) = import(doc, child) {
            doc.append_child(parent, child_id);
        }
    }
}

fn parse_style(style: &str) -> impl Iterator<Item = (String, String)> + '_ {
    style.split(';').filter_map(|decl| {
        let (prop, value) = decl.split_once(':')?;
        let (prop, value) = (prop.trim(), value.trim());
        (!prop.is_empty() && !value.is_empty()).then(|| (prop.to_string(), value.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imports_first_template_with_id() {
        let mut doc = Document::new();
        let html = r#"<!doctype html><html><body>
            <template id="view-about"><section class="about"><h1 data-i18n="about.title">About</h1></section></template>
            <template id="second"><p>ignored</p></template>
        </body></html>"#;

        let (id, node) = parse_template(&mut doc, html).unwrap();
        assert_eq!(id, "view-about");
        assert_eq!(doc.tag(node), Some("template"));
        assert_eq!(
            doc.inner_html(node),
            r#"<section class="about"><h1 data-i18n="about.title">About</h1></section>"#
        );
        assert!(!doc.is_connected(node));
    }

    #[test]
    fn template_content_survives_a_bare_resource() {
        let mut doc = Document::new();
        let (_, node) = parse_template(
            &mut doc,
            r#"<template id="view-home"><h1>Hola</h1><p>one</p></template>"#,
        )
        .unwrap();
        let children = doc.children(node);
        assert_eq!(children.len(), 2);
        assert_eq!(doc.tag(children[0]), Some("h1"));
        assert_eq!(doc.text_content(node), "Holaone");
    }

    #[test]
    fn shell_templates_keep_their_content() {
        let doc = parse_document(
            r#"<html><body><template id="card"><article>x</article></template></body></html>"#,
        );
        let template = doc.element_by_id("card").unwrap();
        assert_eq!(doc.inner_html(template), "<article>x</article>");
    }

    #[test]
    fn rejects_bodies_without_template_id() {
        let mut doc = Document::new();
        assert!(parse_template(&mut doc, "<template><p>x</p></template>").is_none());
        assert!(parse_template(&mut doc, "<html><body>404</body></html>").is_none());
    }

    #[test]
    fn shell_document_keeps_head_body_and_lang() {
        let doc = parse_document(
            r##"<!doctype html><html lang="es"><head><title>Portfolio</title>
            <meta name="description" content="x"></head>
            <body><nav><a href="#/about">About</a></nav><main id="app"></main></body></html>"##,
        );
        assert_eq!(doc.lang(), Some("es"));
        assert_eq!(doc.title(), "Portfolio");
        let app = doc.element_by_id("app").unwrap();
        assert_eq!(doc.parent(app), Some(doc.body()));
    }

    #[test]
    fn fragments_keep_inline_styles() {
        let mut doc = Document::new();
        let nodes = parse_fragment(&mut doc, r#"<span style="color: red; width: 10px">x</span>"#);
        assert_eq!(nodes.len(), 1);
        assert_eq!(doc.style(nodes[0], "color"), Some("red"));
        assert_eq!(doc.style(nodes[0], "width"), Some("10px"));
    }
}
