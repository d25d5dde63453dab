use log::error;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, time::ChronoLocal},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
};

const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
const DEFAULT_LOG_DIR: &str = "./logs";
const DEFAULT_FILE_PREFIX: &str = "vitrina.log";
const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Logging setup builder.
///
/// Console output and a daily rolling file can be enabled independently. When
/// `max_files` is set a background thread keeps only the newest rolled files.
pub struct LoggerConfig {
    /// Rolled files are named `<prefix>.<date>`.
    file_prefix: String,
    log_dir: PathBuf,
    /// chrono strftime format for timestamps.
    time_format: String,
    /// Base level when no directive matches.
    level: String,
    /// Comma separated `EnvFilter` directives layered over `level`.
    directives: Option<String>,
    console: bool,
    file: bool,
    max_files: Option<i16>,
    cleanup_interval: Duration,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            level: "info".to_string(),
            directives: None,
            console: true,
            file: false,
            max_files: None,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    pub fn time_format(mut self, format: impl Into<String>) -> Self {
        self.time_format = format.into();
        self
    }

    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Per-target overrides such as `vitrina_router=debug,scraper=warn`.
    pub fn directives(mut self, directives: impl Into<String>) -> Self {
        self.directives = Some(directives.into());
        self
    }

    pub fn enable_console(mut self, enable: bool) -> Self {
        self.console = enable;
        self
    }

    pub fn enable_file(mut self, enable: bool) -> Self {
        self.file = enable;
        self
    }

    /// Keep at most `count` rolled files; older ones are deleted periodically.
    pub fn max_files(mut self, count: i16) -> Self {
        self.max_files = Some(count);
        self
    }

    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Build the `EnvFilter` from `level` and `directives`. Unparseable
    /// directives are skipped and returned so they can be reported once a
    /// subscriber exists.
    fn env_filter(&self) -> (EnvFilter, Vec<String>) {
        let mut filter = EnvFilter::try_new(&self.level).unwrap_or_else(|_| EnvFilter::new("info"));
        let mut rejected = Vec::new();
        if let Some(directives) = &self.directives {
            for directive in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                match directive.parse() {
                    Ok(parsed) => filter = filter.add_directive(parsed),
                    Err(e) => rejected.push(format!("{directive}: {e}")),
                }
            }
        }
        (filter, rejected)
    }

    /// Install the global subscriber.
    ///
    /// The returned guard must be held for the life of the program so the
    /// non-blocking file writer flushes on exit. Fails if a global subscriber
    /// is already installed.
    pub fn init(self) -> Result<Option<WorkerGuard>, TryInitError> {
        let time_format = self.time_format.clone();

        let console_layer = self.build_console_layer(&time_format);
        let (file_layer, guard) = self.build_file_layer(&time_format);
        let (filter, rejected) = self.env_filter();

        Registry::default()
            .with(filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()?;

        for directive in rejected {
            error!("Ignoring log directive {}", directive);
        }
        self.spawn_cleanup_task_if_needed();

        Ok(guard)
    }

    fn build_console_layer<S>(&self, time_format: &str) -> Option<impl Layer<S>>
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        self.console.then(|| {
            fmt::layer()
                .with_timer(ChronoLocal::new(time_format.to_string()))
                .with_target(true)
                .with_writer(std::io::stderr)
        })
    }

    fn build_file_layer<S>(&self, time_format: &str) -> (Option<impl Layer<S>>, Option<WorkerGuard>)
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        if !self.file {
            return (None, None);
        }

        let file_appender = tracing_appender::rolling::daily(&self.log_dir, &self.file_prefix);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let layer = fmt::layer()
            .with_timer(ChronoLocal::new(time_format.to_string()))
            .with_ansi(false)
            .with_writer(non_blocking);

        (Some(layer), Some(guard))
    }

    fn spawn_cleanup_task_if_needed(&self) {
        let Some(max_files) = self.max_files else {
            return;
        };
        if !self.file {
            return;
        }

        let log_dir = self.log_dir.clone();
        let file_prefix = self.file_prefix.clone();
        let interval = self.cleanup_interval;
        let keep = usize::try_from(max_files).unwrap_or(0);

        std::thread::spawn(move || {
            loop {
                cleanup_old_logs(&log_dir, &file_prefix, keep);
                std::thread::sleep(interval);
            }
        });
    }
}

/// Delete all but the newest `max_files` files starting with `file_prefix`.
///
/// Relies on the rolling suffix sorting chronologically (`.2024-05-01`).
fn cleanup_old_logs(log_dir: &Path, file_prefix: &str, max_files: usize) {
    if !log_dir.exists() {
        return;
    }

    let read_dir = match std::fs::read_dir(log_dir) {
        Ok(dir) => dir,
        Err(e) => {
            error!("Failed to read log directory: {}", e);
            return;
        }
    };

    let mut log_files: Vec<_> = read_dir
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let file_name = entry.file_name().into_string().ok()?;
            file_name.starts_with(file_prefix).then_some((entry, file_name))
        })
        .collect();

    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    for (entry, _) in log_files.iter().skip(max_files) {
        if let Err(e) = std::fs::remove_file(entry.path()) {
            error!("Failed to remove old log file {:?}: {}", entry.path(), e);
        }
    }
}
