use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use vitrina_core::SiteConfig;
use vitrina_core::site::LogSettings;
use vitrina_logger::LoggerConfig;
use vitrina_router::dom::{self, Document};
use vitrina_router::widget::TimedScheduler;
use vitrina_router::{FsFetcher, MemoryStorage, Page, RouteOutcome, Site};

const FALLBACK_SHELL: &str = r#"<!doctype html>
<html>
<head><title></title><meta name="description" content=""></head>
<body><main id="{mount}"></main></body>
</html>"#;

/// Route a fragment against a site directory without a browser.
#[derive(Debug, Parser)]
#[command(name = "vitrina-preview", version, about)]
struct Args {
    /// Site root; fetched URLs resolve below it.
    #[arg(long, default_value = ".")]
    site: PathBuf,

    /// Defaults to `<site>/site.yaml`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Location fragment to start from, e.g. `#/en/about`.
    #[arg(long, default_value = "")]
    fragment: String,

    /// Fragment to navigate to after boot.
    #[arg(long)]
    navigate: Option<String>,

    /// Browser language preference.
    #[arg(long)]
    lang: Option<String>,

    /// Language already present in local storage.
    #[arg(long)]
    stored: Option<String>,

    /// Print the whole document instead of the mount point.
    #[arg(long)]
    full: bool,

    /// Play widget animations in real time and wait for them before printing.
    #[arg(long)]
    animate: bool,
}

fn logger(settings: &LogSettings) -> LoggerConfig {
    let mut logger = LoggerConfig::new()
        .level(settings.level.clone())
        .enable_console(settings.console)
        .enable_file(settings.file)
        .log_dir(settings.dir.clone())
        .file_prefix(settings.file_prefix.clone());
    if let Some(directives) = &settings.directives {
        logger = logger.directives(directives.clone());
    }
    if let Some(count) = settings.max_files {
        logger = logger.max_files(count);
    }
    logger
}

fn load_shell(site: &Path, mount_point: &str) -> Document {
    let index = site.join("index.html");
    match std::fs::read_to_string(&index) {
        Ok(html) => dom::parse_document(&html),
        Err(e) => {
            warn!("No shell at {} ({e}), using a bare one", index.display());
            dom::parse_document(&FALLBACK_SHELL.replace("{mount}", mount_point))
        }
    }
}

fn describe(outcome: &RouteOutcome) -> String {
    match outcome {
        RouteOutcome::Mounted(a) => format!("mounted {} ({})", a.path, a.template_id),
        RouteOutcome::Redirected(to) => format!("redirected to {to}"),
        RouteOutcome::Stale => "superseded".to_string(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let local = tokio::task::LocalSet::new();
    local.run_until(run(args)).await
}

async fn run(args: Args) -> Result<()> {
    let config_path = args.config.clone().unwrap_or_else(|| args.site.join("site.yaml"));
    let config = SiteConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let _guard = logger(&config.log).init().context("installing logger")?;

    let storage = match &args.stored {
        Some(lang) => MemoryStorage::with(&config.i18n.storage_key, lang),
        None => MemoryStorage::new(),
    };
    let mut page = Page::new(load_shell(&args.site, &config.mount_point))
        .with_fragment(&args.fragment)
        .with_storage(storage);
    if let Some(lang) = &args.lang {
        page = page.with_navigator_language(lang.clone());
    }
    let fetcher = Rc::new(FsFetcher::new(&args.site, config.base_url.clone()));

    let timed = args.animate.then(|| Rc::new(TimedScheduler::new()));
    let mut builder = Site::builder(config, page, fetcher);
    if let Some(scheduler) = &timed {
        builder = builder.scheduler(scheduler.clone());
    }
    let site = builder.build();

    let outcome = site.boot().await.context("booting site")?;
    info!("{}", describe(&outcome));
    if let Some(fragment) = &args.navigate {
        let outcome = site.navigate(fragment).await.context("navigating")?;
        info!("{}", describe(&outcome));
    }
    if let Some(scheduler) = &timed {
        scheduler.idle().await;
    }

    if args.full {
        let doc = site.page().document();
        println!("{}", doc.outer_html(doc.html()));
    } else {
        println!("{}", site.mounted_html());
    }
    info!(
        "Language {}, fragment {}",
        site.locale().language(),
        site.page().fragment()
    );
    Ok(())
}
