#![allow(dead_code)]

use std::rc::Rc;

use vitrina_core::SiteConfig;
use vitrina_router::dom::{self, Document, NodeId};
use vitrina_router::{MemoryFetcher, MemoryStorage, Page, Site};

pub const SITE: &str = r##"
i18n:
  supported: [es, en]
  default: es
views:
  "/": { template_id: view-home, source: views/home.html }
  "/about": { template_id: view-about, source: views/about.html }
  "/projects": { template_id: view-projects, source: views/projects.html }
  "/contact": { template_id: view-contact, source: views/contact.html }
not_found: { template_id: view-404, source: views/404.html }
widgets:
  view-about:
    - kind: accordion
      item_class: experience-accordion-item
      header_class: experience-header
      content_class: experience-content
      single_open: true
      initially_open: first
    - kind: accordion
      item_class: skills-accordion-item
      header_class: accordion-header
      content_class: accordion-content
      expand_all: expand-all-skills
      collapse_all: collapse-all-skills
  view-projects:
    - kind: modal
      template_id: project-modal-template
      source: templates/project-modal.html
      trigger_attr: data-project-id
      content: project
  view-contact:
    - kind: contact_form
"##;

pub const SHELL: &str = r##"<!doctype html>
<html>
<head><title>Portfolio</title><meta name="description" content=""></head>
<body>
  <nav>
    <a href="#/es/">Inicio</a>
    <a href="#/es/about">Sobre mí</a>
    <a href="#/en/about">About</a>
  </nav>
  <main id="app"></main>
</body>
</html>"##;

/// Shell with the language selector, the mobile menu and footer contact links.
pub const CHROME_SHELL: &str = r##"<!doctype html>
<html>
<head><title>Portfolio</title><meta name="description" content=""></head>
<body>
  <nav>
    <a href="#/es/">Inicio</a>
    <button id="lang-selector-button" aria-expanded="false"><span id="lang-selector-label">??</span></button>
    <div id="lang-selector-menu" class="hidden">
      <button class="lang-option" data-lang="es">Español <span class="lang-check hidden">✓</span></button>
      <button class="lang-option" data-lang="en">English <span class="lang-check hidden">✓</span></button>
    </div>
    <button id="mobile-menu-button" aria-expanded="false">≡</button>
  </nav>
  <div id="mobile-menu" class="translate-x-full" aria-hidden="true">
    <div class="mobile-panel"><p class="mobile-caption">Menu</p><a class="mobile-link" href="#/es/about">Sobre mí</a></div>
  </div>
  <main id="app"></main>
  <footer>
    <a class="footer-mail" data-contact="email" href="#">mail</a>
    <a class="footer-github" data-contact="github" href="#"><svg class="github-icon"></svg></a>
    <span class="footer-location" data-contact="location"></span>
  </footer>
</body>
</html>"##;

const ES: &str = r#"{
  "meta": {"title": "Portafolio", "description": "Trabajos"},
  "home": {"title": "Hola"},
  "about": {"title": "Sobre mí"},
  "projects": {
    "title": "Proyectos",
    "alpha": {"title": "Proyecto Alfa"},
    "modal": {"image_alt_prefix": "Captura", "challenge": "Reto"},
    "detailed": {
      "alpha": {
        "image": "/img/alpha.png",
        "fullDescription": "Un sitio bilingüe",
        "challenge": "Rutas con idioma",
        "solution": "Un router",
        "results": "Enlaces estables",
        "technologies": ["Rust", "Wasm"],
        "features": ["Rápido"]
      }
    }
  },
  "notfound": {"title": "No encontrado"},
  "contact": {"title": "Contacto"},
  "config": {
    "projects": {"icons": ["code", "db"]},
    "skills": {
      "category1": {"name": "Lenguajes", "icon": "code", "items": [{"name": "Rust", "level": 90}, {"name": "SQL", "level": 60}]},
      "category2": {"name": "Herramientas", "items": ["Git", "Docker"]}
    },
    "personal": {
      "email": "ana@example.com",
      "github_url": "https://github.com/ana",
      "github_user": "ana",
      "linkedin_url": "https://linkedin.com/in/ana",
      "linkedin_name": "Ana",
      "location": "Lima, Perú"
    }
  }
}"#;

const EN: &str = r#"{
  "meta": {"title": "Portfolio", "description": "Work"},
  "home": {"title": "Hello"},
  "about": {"title": "About me"},
  "projects": {
    "title": "Projects",
    "alpha": {"title": "Project Alpha"},
    "modal": {"image_alt_prefix": "Screenshot", "challenge": "Challenge"},
    "detailed": {
      "alpha": {
        "image": "/img/alpha.png",
        "fullDescription": "A bilingual site",
        "challenge": "Language-aware routes",
        "solution": "A router",
        "results": "Stable links",
        "technologies": ["Rust", "Wasm"],
        "features": ["Fast"]
      }
    }
  },
  "notfound": {"title": "Not found"},
  "contact": {"title": "Contact"},
  "config": {
    "projects": {"icons": ["code", "db"]},
    "skills": {
      "category1": {"name": "Languages", "icon": "code", "items": [{"name": "Rust", "level": 90}, {"name": "SQL", "level": 60}]},
      "category2": {"name": "Tools", "items": ["Git", "Docker"]}
    },
    "personal": {
      "email": "ana@example.com",
      "github_url": "https://github.com/ana",
      "github_user": "ana",
      "linkedin_url": "https://linkedin.com/in/ana",
      "linkedin_name": "Ana",
      "location": "Lima, Peru"
    }
  }
}"#;

const HOME: &str = r##"<template id="view-home">
  <section><h1 data-i18n="home.title">Hola</h1><a class="cta" href="#/projects">more</a><div class="home-skills" data-skills-home=""></div></section>
</template>"##;

const ABOUT: &str = r#"<template id="view-about">
  <section>
    <h1 data-i18n="about.title"></h1>
    <div class="experience-accordion-item"><button class="experience-header">One</button><div class="experience-content">1</div></div>
    <div class="experience-accordion-item"><button class="experience-header">Two</button><div class="experience-content">2</div></div>
    <div class="experience-accordion-item"><button class="experience-header">Three</button><div class="experience-content">3</div></div>
    <button data-action="expand-all-skills">+</button>
    <button data-action="collapse-all-skills">-</button>
    <div class="skills-accordion-item"><button class="accordion-header">Lang</button><div class="accordion-content">Rust</div></div>
    <div class="skills-accordion-item"><button class="accordion-header">Tools</button><div class="accordion-content">Cargo</div></div>
    <div class="skill-block" data-skills-category="category2"><h3 data-category-title=""></h3><div data-category-items=""></div></div>
  </section>
</template>"#;

const PROJECTS: &str = r#"<template id="view-projects">
  <section class="grid">
    <h1 data-i18n="projects.title"></h1>
    <article class="card" data-project-id="alpha" data-project-icon=""><h3 data-i18n="projects.alpha.title"></h3><div class="card-icon" data-icon-container=""></div></article>
  </section>
</template>"#;

const CONTACT: &str = r#"<template id="view-contact">
  <section>
    <h1 data-i18n="contact.title"></h1>
    <form id="contact-form">
      <input name="name" type="text">
      <input name="email" type="email">
      <input name="subject" type="text">
      <textarea name="message"></textarea>
      <button type="submit">Send</button>
    </form>
  </section>
</template>"#;

const NOT_FOUND: &str = r#"<template id="view-404"><h1 data-i18n="notfound.title">404</h1></template>"#;

const MODAL: &str = r#"<template id="project-modal-template">
  <div class="modal-overlay">
    <div class="modal-content">
      <button class="modal-close">x</button>
      <h2 class="modal-title"></h2>
      <img class="modal-image">
      <p class="modal-description"></p>
      <section class="modal-section"><h3 data-i18n="projects.modal.challenge"></h3><p class="modal-text"></p></section>
      <section class="modal-section"><p class="modal-text"></p></section>
      <section class="modal-section"><p class="modal-text"></p></section>
      <div id="modal-technologies"></div>
      <ul id="modal-features"></ul>
    </div>
  </div>
</template>"#;

pub fn config() -> SiteConfig {
    SiteConfig::from_yaml(SITE).expect("test site config")
}

pub fn fetcher() -> Rc<MemoryFetcher> {
    let fetcher = MemoryFetcher::new();
    fetcher.insert("/i18n/locales/es.json", ES);
    fetcher.insert("/i18n/locales/en.json", EN);
    fetcher.insert(
        "/i18n/icons.json",
        r#"{"github": "<svg/>", "code": "<svg class=\"icon-code\"></svg>", "db": "<svg class=\"icon-db\"></svg>"}"#,
    );
    fetcher.insert("/views/home.html", HOME);
    fetcher.insert("/views/about.html", ABOUT);
    fetcher.insert("/views/projects.html", PROJECTS);
    fetcher.insert("/views/contact.html", CONTACT);
    fetcher.insert("/views/404.html", NOT_FOUND);
    fetcher.insert("/templates/project-modal.html", MODAL);
    Rc::new(fetcher)
}

pub fn page(fragment: &str, stored: Option<&str>) -> Page {
    page_with(SHELL, fragment, stored)
}

pub fn page_with(shell: &str, fragment: &str, stored: Option<&str>) -> Page {
    let storage = match stored {
        Some(lang) => MemoryStorage::with("portfolio_lang", lang),
        None => MemoryStorage::new(),
    };
    Page::new(dom::parse_document(shell))
        .with_fragment(fragment)
        .with_storage(storage)
}

pub fn site(fragment: &str, stored: Option<&str>, fetcher: &Rc<MemoryFetcher>) -> Site {
    Site::builder(config(), page(fragment, stored), fetcher.clone()).build()
}

/// A site whose shell carries the selector, the mobile menu and a footer.
pub fn chrome_site(fragment: &str, stored: Option<&str>, fetcher: &Rc<MemoryFetcher>) -> Site {
    Site::builder(config(), page_with(CHROME_SHELL, fragment, stored), fetcher.clone()).build()
}

pub fn by_class(doc: &Document, class: &str) -> Vec<NodeId> {
    doc.query_all(doc.html(), |el| el.has_class(class))
}

pub fn text_of_first(doc: &Document, scope: NodeId, class: &str) -> String {
    doc.query_first(scope, |el| el.has_class(class))
        .map(|n| doc.text_content(n))
        .unwrap_or_default()
}
