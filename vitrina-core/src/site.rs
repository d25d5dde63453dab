use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use validator::Validate;

use crate::error::ConfigError;
use crate::yaml;

/// Static description of one site: languages, views, widgets and logging.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SiteConfig {
    /// Prefix for every relative resource location (`/` locally, `/repo/` on a project page).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Id of the element views are mounted into.
    #[serde(default = "default_mount_point")]
    #[validate(length(min = 1))]
    pub mount_point: String,
    #[validate(nested)]
    pub i18n: I18nSettings,
    /// Logical path (`/`, `/about`, ...) to view source.
    pub views: BTreeMap<String, ViewSource>,
    pub not_found: ViewSource,
    /// Template id to the widgets that live inside that view.
    #[serde(default)]
    pub widgets: BTreeMap<String, Vec<WidgetSpec>>,
    /// Widgets that live in the page shell and survive every route change.
    #[serde(default = "default_shell")]
    pub shell: Vec<WidgetSpec>,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct I18nSettings {
    #[validate(length(min = 1))]
    pub supported: Vec<String>,
    #[validate(length(equal = 2))]
    pub default: String,
    #[serde(default = "default_storage_key")]
    #[validate(length(min = 1))]
    pub storage_key: String,
    /// Location of a translation file; `{lang}` is replaced by the language code.
    #[serde(default = "default_locales_path")]
    pub locales_path: String,
    #[serde(default = "default_icons_path")]
    pub icons_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ViewSource {
    pub template_id: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WidgetSpec {
    Modal(ModalSpec),
    Accordion(AccordionSpec),
    LanguageSelector(LanguageSelectorSpec),
    MobileMenu(MobileMenuSpec),
    ContactForm(ContactFormSpec),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModalSpec {
    /// Id of the `<template>` holding the modal markup.
    pub template_id: String,
    pub source: String,
    /// Attribute marking elements that open the modal on click; its value is passed to `open`.
    #[serde(default)]
    pub trigger_attr: Option<String>,
    #[serde(default)]
    pub content: ModalContent,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModalContent {
    /// Markup is translated as-is.
    #[default]
    Static,
    /// Markup is filled from `projects.<id>.*` and `projects.detailed.<id>.*`.
    Project,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccordionSpec {
    pub item_class: String,
    pub header_class: String,
    pub content_class: String,
    #[serde(default)]
    pub single_open: bool,
    #[serde(default)]
    pub initially_open: InitialOpen,
    /// `data-action` value of an expand-all control.
    #[serde(default)]
    pub expand_all: Option<String>,
    #[serde(default)]
    pub collapse_all: Option<String>,
}

/// Dropdown listing every supported language.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LanguageSelectorSpec {
    #[serde(default = "default_lang_button")]
    pub button_id: String,
    #[serde(default = "default_lang_menu")]
    pub menu_id: String,
    #[serde(default = "default_lang_label")]
    pub label_id: String,
}

impl Default for LanguageSelectorSpec {
    fn default() -> Self {
        Self {
            button_id: default_lang_button(),
            menu_id: default_lang_menu(),
            label_id: default_lang_label(),
        }
    }
}

/// Off-canvas navigation toggled by a button.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MobileMenuSpec {
    #[serde(default = "default_mobile_button")]
    pub button_id: String,
    #[serde(default = "default_mobile_menu")]
    pub menu_id: String,
    /// Class present while the menu is off screen.
    #[serde(default = "default_mobile_hidden_class")]
    pub hidden_class: String,
}

impl Default for MobileMenuSpec {
    fn default() -> Self {
        Self {
            button_id: default_mobile_button(),
            menu_id: default_mobile_menu(),
            hidden_class: default_mobile_hidden_class(),
        }
    }
}

/// Contact form handed to the mail client on submit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContactFormSpec {
    #[serde(default = "default_contact_form")]
    pub form_id: String,
    /// Translation key holding the recipient address.
    #[serde(default = "default_contact_email_key")]
    pub email_key: String,
}

impl Default for ContactFormSpec {
    fn default() -> Self {
        Self {
            form_id: default_contact_form(),
            email_key: default_contact_email_key(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialOpen {
    First,
    All,
    #[default]
    None,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Extra `EnvFilter` directives, e.g. `vitrina_router=debug`.
    #[serde(default)]
    pub directives: Option<String>,
    #[serde(default = "default_true")]
    pub console: bool,
    #[serde(default)]
    pub file: bool,
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_log_prefix")]
    pub file_prefix: String,
    #[serde(default)]
    pub max_files: Option<i16>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directives: None,
            console: true,
            file: false,
            dir: default_log_dir(),
            file_prefix: default_log_prefix(),
            max_files: None,
        }
    }
}

fn default_base_url() -> String {
    "/".to_string()
}

fn default_mount_point() -> String {
    "app".to_string()
}

fn default_storage_key() -> String {
    "portfolio_lang".to_string()
}

fn default_locales_path() -> String {
    "i18n/locales/{lang}.json".to_string()
}

fn default_icons_path() -> Option<String> {
    Some("i18n/icons.json".to_string())
}

fn default_shell() -> Vec<WidgetSpec> {
    vec![
        WidgetSpec::LanguageSelector(LanguageSelectorSpec::default()),
        WidgetSpec::MobileMenu(MobileMenuSpec::default()),
    ]
}

fn default_lang_button() -> String {
    "lang-selector-button".to_string()
}

fn default_lang_menu() -> String {
    "lang-selector-menu".to_string()
}

fn default_lang_label() -> String {
    "lang-selector-label".to_string()
}

fn default_mobile_button() -> String {
    "mobile-menu-button".to_string()
}

fn default_mobile_menu() -> String {
    "mobile-menu".to_string()
}

fn default_mobile_hidden_class() -> String {
    "translate-x-full".to_string()
}

fn default_contact_form() -> String {
    "contact-form".to_string()
}

fn default_contact_email_key() -> String {
    "config.personal.email".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "./logs".to_string()
}

fn default_log_prefix() -> String {
    "vitrina.log".to_string()
}

fn default_true() -> bool {
    true
}

impl SiteConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: SiteConfig = yaml::load_from_file(path)?;
        config.check()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: SiteConfig = yaml::load_from_str(content)?;
        config.check()?;
        Ok(config)
    }

    /// Field validation plus the cross-field rules serde cannot express.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;

        if let Some(bad) = self
            .i18n
            .supported
            .iter()
            .find(|code| !is_language_code(code))
        {
            return Err(ConfigError::BadLanguage(bad.clone()));
        }
        if !self.i18n.supported.contains(&self.i18n.default) {
            return Err(ConfigError::DefaultNotSupported(self.i18n.default.clone()));
        }

        let views = self
            .views
            .iter()
            .map(|(path, view)| (path.as_str(), view))
            .chain(std::iter::once(("404", &self.not_found)));
        for (path, view) in views {
            let empty = if view.template_id.is_empty() {
                Some("template_id")
            } else if view.source.is_empty() {
                Some("source")
            } else {
                None
            };
            if let Some(field) = empty {
                return Err(ConfigError::EmptyView {
                    path: path.to_string(),
                    field,
                });
            }
        }

        Ok(())
    }

    /// Absolute locations are kept, everything else is joined onto `base_url`.
    pub fn resolve_url(&self, source: &str) -> String {
        if source.starts_with("http") {
            return source.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        let source = source.trim_start_matches('/');
        format!("{base}/{source}")
    }

    pub fn locale_url(&self, lang: &str) -> String {
        self.resolve_url(&self.i18n.locales_path.replace("{lang}", lang))
    }
}

fn is_language_code(code: &str) -> bool {
    code.len() == 2 && code.bytes().all(|b| b.is_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITE: &str = r#"
base_url: /portfolio/
i18n:
  supported: [es, en]
  default: es
views:
  "/": { template_id: view-home, source: views/home.html }
  "/about": { template_id: view-about, source: views/about.html }
not_found: { template_id: view-404, source: views/404.html }
widgets:
  view-about:
    - kind: accordion
      item_class: experience-accordion-item
      header_class: experience-header
      content_class: experience-content
      single_open: true
      initially_open: first
  view-projects:
    - kind: modal
      template_id: project-modal-template
      source: templates/project-modal.html
      trigger_attr: data-project-id
      content: project
  view-contact:
    - kind: contact_form
"#;

    #[test]
    fn parses_full_site() {
        let config = SiteConfig::from_yaml(SITE).unwrap();
        assert_eq!(config.mount_point, "app");
        assert_eq!(config.i18n.storage_key, "portfolio_lang");
        assert_eq!(config.views.len(), 2);
        assert_eq!(config.not_found.template_id, "view-404");

        let about = &config.widgets["view-about"][0];
        match about {
            WidgetSpec::Accordion(spec) => {
                assert!(spec.single_open);
                assert_eq!(spec.initially_open, InitialOpen::First);
            }
            other => panic!("unexpected widget {other:?}"),
        }
        match &config.widgets["view-projects"][0] {
            WidgetSpec::Modal(spec) => assert_eq!(spec.content, ModalContent::Project),
            other => panic!("unexpected widget {other:?}"),
        }
        match &config.widgets["view-contact"][0] {
            WidgetSpec::ContactForm(spec) => {
                assert_eq!(spec.form_id, "contact-form");
                assert_eq!(spec.email_key, "config.personal.email");
            }
            other => panic!("unexpected widget {other:?}"),
        }
        assert!(config.log.console);
        assert!(!config.log.file);
    }

    #[test]
    fn shell_defaults_to_selector_and_mobile_menu() {
        let config = SiteConfig::from_yaml(SITE).unwrap();
        assert_eq!(
            config.shell,
            vec![
                WidgetSpec::LanguageSelector(LanguageSelectorSpec::default()),
                WidgetSpec::MobileMenu(MobileMenuSpec::default()),
            ]
        );

        let yaml = format!("{SITE}shell:\n  - kind: mobile_menu\n    hidden_class: closed\n");
        let config = SiteConfig::from_yaml(&yaml).unwrap();
        match &config.shell[..] {
            [WidgetSpec::MobileMenu(spec)] => {
                assert_eq!(spec.hidden_class, "closed");
                assert_eq!(spec.menu_id, "mobile-menu");
            }
            other => panic!("unexpected shell {other:?}"),
        }
    }

    #[test]
    fn resolves_urls_against_base() {
        let config = SiteConfig::from_yaml(SITE).unwrap();
        assert_eq!(config.resolve_url("views/home.html"), "/portfolio/views/home.html");
        assert_eq!(
            config.resolve_url("https://cdn.example.com/a.html"),
            "https://cdn.example.com/a.html"
        );
        assert_eq!(config.locale_url("en"), "/portfolio/i18n/locales/en.json");
    }

    #[test]
    fn rejects_default_outside_supported() {
        let yaml = SITE.replace("default: es", "default: fr");
        let err = SiteConfig::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, ConfigError::DefaultNotSupported(code) if code == "fr"));
    }

    #[test]
    fn rejects_malformed_language_code() {
        let yaml = SITE.replace("[es, en]", "[es, EN]");
        let err = SiteConfig::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, ConfigError::BadLanguage(code) if code == "EN"));
    }

    #[test]
    fn rejects_empty_language_list() {
        let yaml = SITE.replace("[es, en]", "[]");
        let err = SiteConfig::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validate(_)));
    }

    #[test]
    fn rejects_empty_view_source() {
        let yaml = SITE.replace("source: views/about.html", "source: \"\"");
        let err = SiteConfig::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyView { path, field: "source" } if path == "/about"));
    }
}
