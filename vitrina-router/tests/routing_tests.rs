mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use common::{config, fetcher, page, site};
use vitrina_router::router::{NOT_FOUND_PATH, RouteOutcome};
use vitrina_router::{MemoryFetcher, Site};

fn mounted(outcome: RouteOutcome) -> (String, String) {
    match outcome {
        RouteOutcome::Mounted(announcement) => (announcement.path, announcement.template_id),
        other => panic!("expected a mounted view, got {other:?}"),
    }
}

fn heading(site: &Site) -> String {
    let doc = site.page().document();
    let app = doc.element_by_id("app").unwrap();
    doc.query_first(app, |el| el.tag() == "h1")
        .map(|h| doc.text_content(h))
        .unwrap_or_default()
}

#[tokio::test]
async fn unprefixed_fragment_is_rewritten_exactly_once() {
    for lang in ["es", "en"] {
        let fetcher = fetcher();
        let site = site("#/about", Some(lang), &fetcher);

        let (path, template) = mounted(site.boot().await.unwrap());

        assert_eq!((path.as_str(), template.as_str()), ("/about", "view-about"));
        let location = site.page().location();
        assert_eq!(location.fragment(), format!("#/{lang}/about"));
        assert_eq!(location.history(), ["#/about".to_string()]);
    }
}

#[tokio::test]
async fn empty_fragment_goes_to_language_root() {
    let fetcher = fetcher();
    let site = site("", None, &fetcher);

    let (path, _) = mounted(site.boot().await.unwrap());
    assert_eq!(path, "/");
    assert_eq!(site.page().fragment(), "#/es/");
    assert_eq!(site.page().location().history().len(), 1);
    assert_eq!(heading(&site), "Hola");
}

#[tokio::test]
async fn unsupported_prefix_is_treated_as_a_path() {
    let fetcher = fetcher();
    let site = site("#/fr/about", Some("en"), &fetcher);

    let (path, template) = mounted(site.boot().await.unwrap());
    assert_eq!(site.page().fragment(), "#/en/fr/about");
    assert_eq!(path, "/fr/about");
    assert_eq!(template, "view-404");
}

#[tokio::test]
async fn unknown_path_renders_not_found_view() {
    let fetcher = fetcher();
    let site = site("#/en/nope", None, &fetcher);

    let (_, template) = mounted(site.boot().await.unwrap());
    assert_eq!(template, "view-404");
    assert_eq!(heading(&site), "Not found");
}

#[tokio::test]
async fn template_failure_falls_back_and_is_never_retried() {
    let fetcher = fetcher();
    fetcher.insert_status("/views/about.html", 500);
    let site = site("#/es/", None, &fetcher);
    site.boot().await.unwrap();

    let (path, template) = mounted(site.navigate("#/es/about").await.unwrap());
    assert_eq!((path.as_str(), template.as_str()), (NOT_FOUND_PATH, "view-404"));

    site.navigate("#/es/").await.unwrap();
    let (_, template) = mounted(site.navigate("#/es/about").await.unwrap());
    assert_eq!(template, "view-404");
    assert_eq!(fetcher.fetch_count("/views/about.html"), 1);
}

#[tokio::test]
async fn loaded_templates_are_not_fetched_again() {
    let fetcher = fetcher();
    let site = site("#/es/", None, &fetcher);
    site.boot().await.unwrap();
    site.navigate("#/es/about").await.unwrap();
    site.navigate("#/es/").await.unwrap();
    site.navigate("#/en/").await.unwrap();

    assert_eq!(fetcher.fetch_count("/views/home.html"), 1);
    assert_eq!(fetcher.fetch_count("/views/about.html"), 1);
    assert_eq!(heading(&site), "Hello");
}

#[tokio::test]
async fn language_prefix_drives_the_active_language() {
    let fetcher = fetcher();
    let site = site("#/es/about", None, &fetcher);
    site.boot().await.unwrap();
    assert_eq!(site.locale().language(), "es");

    site.navigate("#/en/about").await.unwrap();

    let page = site.page();
    assert_eq!(site.locale().language(), "en");
    assert_eq!(page.storage().get("portfolio_lang").as_deref(), Some("en"));
    assert_eq!(page.document().lang(), Some("en"));
    assert_eq!(page.document().title(), "Portfolio");
    assert_eq!(heading(&site), "About me");
}

#[tokio::test]
async fn switching_language_keeps_the_logical_path() {
    let fetcher = fetcher();
    let site = site("#/es/projects", None, &fetcher);
    site.boot().await.unwrap();

    let outcome = site.select_language("en").await.unwrap();
    let (path, _) = mounted(outcome.unwrap());
    assert_eq!(path, "/projects");
    assert_eq!(site.page().fragment(), "#/en/projects");
    assert_eq!(heading(&site), "Projects");

    assert!(site.select_language("de").await.unwrap().is_none());
    assert_eq!(site.locale().language(), "en");
}

#[tokio::test]
async fn navigation_links_track_the_current_route() {
    let fetcher = fetcher();
    let site = site("#/en/about", None, &fetcher);
    site.boot().await.unwrap();

    let doc = site.page().document();
    let nav = doc.query_first(doc.html(), |el| el.tag() == "nav").unwrap();
    let current: Vec<_> = doc
        .query_all(nav, |el| el.attr("aria-current") == Some("page"))
        .into_iter()
        .map(|a| doc.attr(a, "href").unwrap_or_default().to_string())
        .collect();
    assert_eq!(current, vec!["#/en/about".to_string()]);
    let active = doc.query_all(nav, |el| el.has_class("active"));
    assert_eq!(active.len(), 1);
}

#[tokio::test]
async fn mounted_views_get_prefixed_internal_links() {
    let fetcher = fetcher();
    let site = site("#/en/", None, &fetcher);
    site.boot().await.unwrap();

    let doc = site.page().document();
    let cta = doc.query_first(doc.html(), |el| el.has_class("cta")).unwrap();
    assert_eq!(doc.attr(cta, "href"), Some("#/en/projects"));
}

#[tokio::test]
async fn mount_hook_runs_before_the_announcement() {
    let fetcher = fetcher();
    let order = Rc::new(RefCell::new(Vec::new()));
    let site = {
        let order = order.clone();
        Site::builder(config(), page("#/es/about", None), fetcher.clone())
            .on_mount("/about", move |_, _| order.borrow_mut().push("hook"))
            .build()
    };
    {
        let order = order.clone();
        site.page()
            .signals
            .route_mounted
            .subscribe(move |a| order.borrow_mut().push(if a.path == "/about" { "about" } else { "other" }));
    }

    site.boot().await.unwrap();
    assert_eq!(*order.borrow(), vec!["hook", "about"]);
}

#[tokio::test]
async fn mount_scrolls_to_top() {
    let fetcher = fetcher();
    let site = site("#/es/", None, &fetcher);
    site.boot().await.unwrap();
    site.page().scroll_to(800.0);

    site.navigate("#/es/about").await.unwrap();
    assert_eq!(site.page().scroll_y(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn slow_stale_render_never_mounts_over_a_newer_one() {
    let fetcher: Rc<MemoryFetcher> = fetcher();
    fetcher.delay("/views/about.html", Duration::from_millis(500));
    let site = site("#/es/", None, &fetcher);
    site.boot().await.unwrap();

    let announced = Rc::new(Cell::new(0));
    {
        let announced = announced.clone();
        site.page()
            .signals
            .route_mounted
            .subscribe(move |_| announced.set(announced.get() + 1));
    }

    let slow = site.navigate("#/es/about");
    let fast = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        site.navigate("#/es/projects").await
    };
    let (slow, fast) = futures::join!(slow, fast);

    assert_eq!(slow.unwrap(), RouteOutcome::Stale);
    let (path, _) = mounted(fast.unwrap());
    assert_eq!(path, "/projects");
    assert_eq!(heading(&site), "Proyectos");
    assert_eq!(announced.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_language_sync_never_overrides_a_newer_pass() {
    let fetcher: Rc<MemoryFetcher> = fetcher();
    fetcher.delay("/i18n/locales/en.json", Duration::from_millis(500));
    let site = site("#/es/", None, &fetcher);
    site.boot().await.unwrap();

    let slow = site.navigate("#/en/about");
    let fast = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        site.navigate("#/es/projects").await
    };
    let (slow, fast) = futures::join!(slow, fast);

    assert_eq!(slow.unwrap(), RouteOutcome::Stale);
    let (path, _) = mounted(fast.unwrap());
    assert_eq!(path, "/projects");

    let page = site.page();
    assert_eq!(page.fragment(), "#/es/projects");
    assert_eq!(site.locale().language(), "es");
    assert_eq!(heading(&site), "Proyectos");
    assert_eq!(page.storage().get("portfolio_lang").as_deref(), Some("es"));
    assert_eq!(page.document().lang(), Some("es"));
}

#[tokio::test]
async fn every_view_mounts_its_markup() {
    let fetcher = fetcher();
    let site = site("#/en/", None, &fetcher);
    site.boot().await.unwrap();

    for (fragment, title) in [
        ("#/en/", "Hello"),
        ("#/en/about", "About me"),
        ("#/en/projects", "Projects"),
        ("#/en/contact", "Contact"),
        ("#/en/missing", "Not found"),
    ] {
        site.navigate(fragment).await.unwrap();
        let html = site.mounted_html();
        assert!(html.contains("<h1"), "{fragment} mounted {html:?}");
        assert_eq!(heading(&site), title, "{fragment}");
    }
}

#[tokio::test]
async fn repeated_navigation_does_not_grow_the_document() {
    let fetcher = fetcher();
    let site = site("#/es/", None, &fetcher);
    site.boot().await.unwrap();

    let warm = round_trip(&site).await;
    for _ in 0..3 {
        assert_eq!(round_trip(&site).await, warm);
    }
}

/// Visit every view once and come home; returns the live node count.
async fn round_trip(site: &Site) -> usize {
    for fragment in ["#/es/about", "#/es/projects", "#/en/contact", "#/es/"] {
        site.navigate(fragment).await.unwrap();
    }
    site.page().document().live_nodes()
}
