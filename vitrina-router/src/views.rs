use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use vitrina_core::SiteConfig;

use crate::dom::NodeId;
use crate::page::Page;

/// Runs after a view has been mounted and annotated, before the announcement.
pub type MountHook = Rc<dyn Fn(&Page, NodeId)>;

#[derive(Clone)]
pub struct ViewDescriptor {
    pub template_id: String,
    /// Fully resolved source location.
    pub source: String,
    on_mount: Option<MountHook>,
}

impl fmt::Debug for ViewDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewDescriptor")
            .field("template_id", &self.template_id)
            .field("source", &self.source)
            .field("on_mount", &self.on_mount.is_some())
            .finish()
    }
}

impl ViewDescriptor {
    pub fn new(template_id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            template_id: template_id.into(),
            source: source.into(),
            on_mount: None,
        }
    }

    pub fn on_mount(&self) -> Option<&MountHook> {
        self.on_mount.as_ref()
    }
}

/// Logical path to view, plus the reserved not-found view.
#[derive(Debug, Clone)]
pub struct ViewRegistry {
    views: HashMap<String, ViewDescriptor>,
    not_found: ViewDescriptor,
}

impl ViewRegistry {
    pub fn from_config(config: &SiteConfig) -> Self {
        let describe = |view: &vitrina_core::site::ViewSource| {
            ViewDescriptor::new(&view.template_id, config.resolve_url(&view.source))
        };
        Self {
            views: config
                .views
                .iter()
                .map(|(path, view)| (path.clone(), describe(view)))
                .collect(),
            not_found: describe(&config.not_found),
        }
    }

    /// Attach a mount hook to `path`. Unknown paths are ignored.
    pub fn with_hook(mut self, path: &str, hook: impl Fn(&Page, NodeId) + 'static) -> Self {
        if let Some(view) = self.views.get_mut(path) {
            view.on_mount = Some(Rc::new(hook));
        }
        self
    }

    pub fn get(&self, path: &str) -> Option<&ViewDescriptor> {
        self.views.get(path)
    }

    pub fn not_found(&self) -> &ViewDescriptor {
        &self.not_found
    }

    /// The view for `path`, or the not-found view.
    pub fn resolve(&self, path: &str) -> &ViewDescriptor {
        self.get(path).unwrap_or(&self.not_found)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.views.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_with_not_found_fallback() {
        let config = SiteConfig::from_yaml(
            r#"
base_url: /portfolio/
i18n: { supported: [es, en], default: es }
views:
  "/": { template_id: view-home, source: views/home.html }
  "/about": { template_id: view-about, source: https://cdn.example.com/about.html }
not_found: { template_id: view-404, source: /views/404.html }
"#,
        )
        .unwrap();
        let registry = ViewRegistry::from_config(&config).with_hook("/about", |_, _| {});

        assert_eq!(registry.resolve("/").source, "/portfolio/views/home.html");
        assert_eq!(registry.resolve("/about").source, "https://cdn.example.com/about.html");
        assert!(registry.resolve("/about").on_mount().is_some());
        assert_eq!(registry.resolve("/nope").template_id, "view-404");
        assert_eq!(registry.not_found().source, "/portfolio/views/404.html");
        assert_eq!(registry.paths().count(), 2);
    }
}
