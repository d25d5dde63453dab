//! Generated content that depends on structured configuration values:
//! project icons, skill bars and lists, and contact links.
//!
//! Unlike the marker passes in [`annotate`](super::annotate), these rebuild
//! the children of their containers on every run.

use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::{debug, trace, warn};
use vitrina_core::validate;

use super::{LocaleStore, Lookup};
use crate::dom::{self, Document, NodeId};
use crate::page::Page;
use crate::signal::SubscriptionId;

pub const PROJECT_ICON_ATTR: &str = "data-project-icon";
pub const ICON_CONTAINER_ATTR: &str = "data-icon-container";
pub const SKILLS_HOME_ATTR: &str = "data-skills-home";
pub const SKILLS_CATEGORY_ATTR: &str = "data-skills-category";
pub const CATEGORY_TITLE_ATTR: &str = "data-category-title";
pub const CATEGORY_ICON_ATTR: &str = "data-category-icon";
pub const CATEGORY_ITEMS_ATTR: &str = "data-category-items";
pub const CONTACT_ATTR: &str = "data-contact";

const HOME_CATEGORY: &str = "category1";

/// Keeps generated content current: re-renders the whole document after
/// every mount and every language change until dropped.
pub struct Renderer {
    page: Rc<Page>,
    mounted: SubscriptionId,
    language: SubscriptionId,
}

impl Renderer {
    pub fn attach(page: Rc<Page>, locale: &Rc<LocaleStore>) -> Self {
        let (weak_page, weak_locale) = (Rc::downgrade(&page), Rc::downgrade(locale));
        let mounted = page.signals.route_mounted.subscribe(move |announcement| {
            trace!("Rendering after mount of {}", announcement.path);
            render_document(&weak_page, &weak_locale);
        });
        let (weak_page, weak_locale) = (Rc::downgrade(&page), Rc::downgrade(locale));
        let language = page.signals.language_changed.subscribe(move |changed| {
            trace!("Rendering for {}", changed.language);
            render_document(&weak_page, &weak_locale);
        });
        Self {
            page,
            mounted,
            language,
        }
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.page.signals.route_mounted.unsubscribe(self.mounted);
        self.page.signals.language_changed.unsubscribe(self.language);
    }
}

fn render_document(page: &Weak<Page>, locale: &Weak<LocaleStore>) {
    let (Some(page), Some(locale)) = (page.upgrade(), locale.upgrade()) else {
        return;
    };
    let mut doc = page.document_mut();
    let root = doc.html();
    render_all(&mut doc, &*locale, root);
}

/// Every generated-content pass over `scope`.
pub fn render_all(doc: &mut Document, lookup: &dyn Lookup, scope: NodeId) {
    render_project_icons(doc, lookup, scope);
    render_skill_bars(doc, lookup, scope);
    render_skill_categories(doc, lookup, scope);
    render_contact_info(doc, lookup, scope);
}

fn structured(lookup: &dyn Lookup, key: &str) -> Option<Value> {
    lookup.lookup(key).as_value().cloned()
}

fn text(lookup: &dyn Lookup, key: &str) -> Option<String> {
    lookup.lookup(key).into_text().filter(|value| value != key)
}

/// Replace the children of `container` with the named icon. Unknown icons
/// leave the container alone.
fn render_icon(doc: &mut Document, lookup: &dyn Lookup, name: &str, container: NodeId) {
    let markup = lookup.icon(name);
    if markup.is_empty() {
        debug!("No markup for icon {}", name);
        return;
    }
    let nodes = dom::parse_fragment(doc, &markup);
    let Some(first) = nodes.iter().copied().find(|n| doc.element(*n).is_some()) else {
        return;
    };
    for node in nodes.into_iter().filter(|n| *n != first) {
        doc.remove(node);
    }
    doc.clear_children(container);
    doc.append_child(container, first);
}

/// Cards marked `data-project-icon` cycle through `config.projects.icons`.
pub fn render_project_icons(doc: &mut Document, lookup: &dyn Lookup, scope: NodeId) {
    let cards = doc.query_all(scope, |el| el.has_attr(PROJECT_ICON_ATTR));
    if cards.is_empty() {
        return;
    }
    let Some(Value::Array(icons)) = structured(lookup, "config.projects.icons") else {
        return;
    };
    let names: Vec<&str> = icons.iter().filter_map(Value::as_str).collect();
    if names.is_empty() {
        return;
    }
    for (index, card) in cards.into_iter().enumerate() {
        let container = doc.query_first(card, |el| el.has_attr(ICON_CONTAINER_ATTR));
        if let Some(container) = container {
            render_icon(doc, lookup, names[index % names.len()], container);
        }
    }
}

/// A skill entry is either a bare name or `{ name, level }`.
fn skill(item: &Value) -> Option<(&str, Option<u64>)> {
    match item {
        Value::String(name) => Some((name, None)),
        Value::Object(map) => {
            let name = map.get("name")?.as_str()?;
            Some((name, map.get("level").and_then(Value::as_u64)))
        }
        _ => None,
    }
}

fn category_items(lookup: &dyn Lookup, category: &str) -> Option<Vec<Value>> {
    match structured(lookup, &format!("config.skills.{category}")) {
        Some(Value::Object(mut map)) => match map.remove("items") {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

/// `[data-skills-home]` gets one bar per leveled skill of its category
/// (the attribute value, `category1` when empty).
pub fn render_skill_bars(doc: &mut Document, lookup: &dyn Lookup, scope: NodeId) {
    for container in doc.query_all(scope, |el| el.has_attr(SKILLS_HOME_ATTR)) {
        let category = doc
            .attr(container, SKILLS_HOME_ATTR)
            .filter(|value| !value.is_empty())
            .unwrap_or(HOME_CATEGORY)
            .to_string();
        let Some(items) = category_items(lookup, &category) else {
            warn!("Skills category not found or invalid: {}", category);
            continue;
        };

        doc.clear_children(container);
        for item in &items {
            let Some((name, Some(level))) = skill(item) else {
                continue;
            };
            if level == 0 {
                continue;
            }
            let bar = skill_bar(doc, name, level);
            doc.append_child(container, bar);
        }
    }
}

fn skill_bar(doc: &mut Document, name: &str, level: u64) -> NodeId {
    let level = level.min(100);
    let bar = doc.create_element("div");
    doc.add_class(bar, "skill-bar");

    let label = doc.create_element("div");
    doc.add_class(label, "skill-bar-label");
    let name_el = doc.create_element("span");
    doc.set_text_content(name_el, name);
    let level_el = doc.create_element("span");
    doc.set_text_content(level_el, &format!("{level}%"));
    doc.append_child(label, name_el);
    doc.append_child(label, level_el);

    let track = doc.create_element("div");
    doc.add_class(track, "skill-bar-track");
    let fill = doc.create_element("div");
    doc.add_class(fill, "skill-bar-fill");
    doc.set_style(fill, "width", &format!("{level}%"));
    doc.append_child(track, fill);

    doc.append_child(bar, label);
    doc.append_child(bar, track);
    bar
}

/// `[data-skills-category=<key>]` blocks: title, icon and one chip per skill.
pub fn render_skill_categories(doc: &mut Document, lookup: &dyn Lookup, scope: NodeId) {
    for block in doc.query_all(scope, |el| el.has_attr(SKILLS_CATEGORY_ATTR)) {
        let Some(key) = doc.attr(block, SKILLS_CATEGORY_ATTR).map(str::to_string) else {
            continue;
        };
        let Some(Value::Object(category)) = structured(lookup, &format!("config.skills.{key}"))
        else {
            warn!("Skills category not found: {}", key);
            continue;
        };

        if let Some(name) = category.get("name").and_then(Value::as_str)
            && let Some(title) = doc.query_first(block, |el| el.has_attr(CATEGORY_TITLE_ATTR))
        {
            doc.set_text_content(title, name);
        }
        if let Some(icon) = category.get("icon").and_then(Value::as_str)
            && let Some(slot) = doc.query_first(block, |el| el.has_attr(CATEGORY_ICON_ATTR))
        {
            render_icon(doc, lookup, icon, slot);
        }
        let Some(list) = doc.query_first(block, |el| el.has_attr(CATEGORY_ITEMS_ATTR)) else {
            continue;
        };
        doc.clear_children(list);
        let items = category.get("items").and_then(Value::as_array);
        for (name, level) in items.into_iter().flatten().filter_map(skill) {
            let chip = doc.create_element("span");
            doc.add_class(chip, "skill-chip");
            doc.set_text_content(chip, name);
            if let Some(level) = level {
                doc.set_attr(chip, "data-level", &level.to_string());
            }
            doc.append_child(list, chip);
        }
    }
}

/// `[data-contact]` links and labels from `config.personal.*`. Links that
/// carry an inline svg keep their content and only get the `href`.
pub fn render_contact_info(doc: &mut Document, lookup: &dyn Lookup, scope: NodeId) {
    for node in doc.query_all(scope, |el| el.has_attr(CONTACT_ATTR)) {
        let Some(kind) = doc.attr(node, CONTACT_ATTR).map(str::to_string) else {
            continue;
        };
        let (href, label) = match kind.as_str() {
            "email" => {
                let Some(email) = text(lookup, "config.personal.email") else {
                    continue;
                };
                let email = validate::config_value("personal.email", &email).to_string();
                (Some(format!("mailto:{email}")), Some(email))
            }
            "github" => (
                contact_url(lookup, "github_url"),
                text(lookup, "config.personal.github_user"),
            ),
            "linkedin" => (
                contact_url(lookup, "linkedin_url"),
                text(lookup, "config.personal.linkedin_name"),
            ),
            "location" => (None, text(lookup, "config.personal.location")),
            other => {
                debug!("Unknown contact kind: {}", other);
                continue;
            }
        };

        if let Some(href) = href {
            doc.set_attr(node, "href", &href);
        }
        let has_icon = doc.query_first(node, |el| el.tag() == "svg").is_some();
        if let Some(label) = label.filter(|_| !has_icon) {
            doc.set_text_content(node, &label);
        }
    }
}

fn contact_url(lookup: &dyn Lookup, field: &str) -> Option<String> {
    let key = format!("personal.{field}");
    let raw = text(lookup, &format!("config.{key}"))?;
    Some(validate::config_value(&key, &raw).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::{Translation, TranslationTree};
    use serde_json::json;

    struct WithIcons(TranslationTree);

    impl Lookup for WithIcons {
        fn lookup(&self, key: &str) -> Translation {
            self.0.lookup(key)
        }

        fn icon(&self, name: &str) -> String {
            match name {
                "code" => r#"<svg class="icon-code"><path d="M0 0"></path></svg>"#.to_string(),
                "db" => r#"<svg class="icon-db"></svg>"#.to_string(),
                _ => String::new(),
            }
        }
    }

    fn lookup() -> WithIcons {
        WithIcons(TranslationTree::from_value(json!({
            "config": {
                "projects": {"icons": ["code", "db"]},
                "skills": {
                    "category1": {
                        "name": "Backend",
                        "icon": "db",
                        "items": [{"name": "Rust", "level": 90}, {"name": "Go", "level": 70}, "SQL"]
                    },
                    "category2": {"name": "Tools", "items": ["Git", "Docker"]}
                },
                "personal": {
                    "email": "ana@example.com",
                    "github_url": "https://github.com/ana",
                    "github_user": "ana",
                    "linkedin_url": "nope",
                    "linkedin_name": "Ana P.",
                    "location": "Lima"
                }
            }
        })))
    }

    fn mount(html: &str) -> (Document, NodeId) {
        let mut doc = Document::new();
        let app = doc.create_element("main");
        doc.append_child(doc.body(), app);
        for node in dom::parse_fragment(&mut doc, html) {
            doc.append_child(app, node);
        }
        (doc, app)
    }

    #[test]
    fn project_cards_cycle_through_icons() {
        let card = r#"<article data-project-icon=""><div data-icon-container="">?</div></article>"#;
        let (mut doc, app) = mount(&card.repeat(3));
        render_project_icons(&mut doc, &lookup(), app);

        let classes: Vec<String> = doc
            .query_all(app, |el| el.tag() == "svg")
            .into_iter()
            .filter_map(|svg| doc.attr(svg, "class").map(str::to_string))
            .collect();
        assert_eq!(classes, ["icon-code", "icon-db", "icon-code"]);
        assert!(!doc.inner_html(app).contains('?'));
    }

    #[test]
    fn home_bars_skip_unleveled_skills() {
        let (mut doc, app) = mount(r#"<div data-skills-home="">old</div>"#);
        render_skill_bars(&mut doc, &lookup(), app);

        let fills = doc.query_all(app, |el| el.has_class("skill-bar-fill"));
        let widths: Vec<_> = fills.iter().map(|f| doc.style(*f, "width").map(str::to_string)).collect();
        assert_eq!(widths, [Some("90%".to_string()), Some("70%".to_string())]);
        let text = doc.text_content(app);
        assert!(text.starts_with("Rust90%Go70%"), "{text}");
        assert!(!text.contains("SQL"));
    }

    #[test]
    fn categories_get_title_icon_and_chips() {
        let (mut doc, app) = mount(
            r#"<section data-skills-category="category1"><h3 data-category-title="">x</h3><span data-category-icon=""></span><div data-category-items=""></div></section><section data-skills-category="category2"><div data-category-items=""><span>stale</span></div></section>"#,
        );
        render_skill_categories(&mut doc, &lookup(), app);

        let title = doc.query_first(app, |el| el.has_attr(CATEGORY_TITLE_ATTR)).unwrap();
        assert_eq!(doc.text_content(title), "Backend");
        assert!(doc.query_first(app, |el| el.has_class("icon-db")).is_some());

        let chips = doc.query_all(app, |el| el.has_class("skill-chip"));
        let names: Vec<String> = chips.iter().map(|c| doc.text_content(*c)).collect();
        assert_eq!(names, ["Rust", "Go", "SQL", "Git", "Docker"]);
        assert_eq!(doc.attr(chips[0], "data-level"), Some("90"));
        assert_eq!(doc.attr(chips[2], "data-level"), None);
        assert!(!doc.text_content(app).contains("stale"));
    }

    #[test]
    fn contact_links_keep_inline_icons() {
        let (mut doc, app) = mount(
            r#"<a data-contact="email">x</a><a data-contact="github"><svg></svg></a><a data-contact="linkedin">x</a><p data-contact="location"></p>"#,
        );
        render_contact_info(&mut doc, &lookup(), app);

        let links = doc.query_all(app, |el| el.has_attr(CONTACT_ATTR));
        assert_eq!(doc.attr(links[0], "href"), Some("mailto:ana@example.com"));
        assert_eq!(doc.text_content(links[0]), "ana@example.com");
        assert_eq!(doc.attr(links[1], "href"), Some("https://github.com/ana"));
        assert!(doc.query_first(links[1], |el| el.tag() == "svg").is_some());
        assert_eq!(doc.attr(links[2], "href"), Some(validate::LINKEDIN_PLACEHOLDER));
        assert_eq!(doc.text_content(links[2]), "Ana P.");
        assert_eq!(doc.text_content(links[3]), "Lima");
    }

    #[test]
    fn rerunning_does_not_grow_the_document() {
        let (mut doc, app) = mount(
            r#"<div data-skills-home=""></div><article data-project-icon=""><i data-icon-container=""></i></article>"#,
        );
        render_all(&mut doc, &lookup(), app);
        let html = doc.inner_html(app);
        let live = doc.live_nodes();
        render_all(&mut doc, &lookup(), app);
        assert_eq!(doc.inner_html(app), html);
        assert_eq!(doc.live_nodes(), live);
    }
}
