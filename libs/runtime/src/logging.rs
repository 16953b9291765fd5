use crate::config::{LoggingConfig, Section};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    io::{IsTerminal, Write},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{filter::Targets, fmt};

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};

const DEFAULT_SECTION: &str = "default";
const DEFAULT_MAX_SIZE_MB: u64 = 100;
const DEFAULT_MAX_BACKUPS: usize = 3;

fn parse_level(s: &str) -> LevelFilter {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" | "warning" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" | "none" => LevelFilter::OFF,
        // empty file_level inherits console_level at the call site
        _ => LevelFilter::INFO,
    }
}

/// Returns true if target == prefix or target starts with "prefix::"
fn matches_prefix(target: &str, prefix: &str) -> bool {
    target == prefix
        || (target.starts_with(prefix) && target[prefix.len()..].starts_with("::"))
}

fn file_level(section: &Section) -> LevelFilter {
    if section.file_level.trim().is_empty() {
        parse_level(&section.console_level)
    } else {
        parse_level(&section.file_level)
    }
}

// -------- rotating file sink --------

#[derive(Clone)]
struct RotWriter(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl Write for RotWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.lock().flush()
    }
}

/// Writer that may be absent; writes to it are dropped.
struct MaybeWriter(Option<RotWriter>);

impl Write for MaybeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.0 {
            Some(w) => w.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.0 {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

/// Routes each record to the file of the longest matching subsystem prefix,
/// falling back to the default file.
#[derive(Clone, Default)]
struct FileRouter {
    default: Option<RotWriter>,
    by_prefix: Vec<(String, RotWriter)>,
}

impl FileRouter {
    fn resolve(&self, target: &str) -> Option<RotWriter> {
        self.by_prefix
            .iter()
            .filter(|(prefix, _)| matches_prefix(target, prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, w)| w.clone())
            .or_else(|| self.default.clone())
    }

    fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_prefix.is_empty()
    }
}

impl<'a> fmt::MakeWriter<'a> for FileRouter {
    type Writer = MaybeWriter;

    fn make_writer(&'a self) -> Self::Writer {
        MaybeWriter(self.default.clone())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        MaybeWriter(self.resolve(meta.target()))
    }
}

/// Relative paths are joined with `base_dir` (the server home dir).
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn open_rotating_writer(
    log_path: &Path,
    section: &Section,
) -> Result<RotWriter, Box<dyn std::error::Error + Send + Sync>> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) * 1024 * 1024;
    let backups = section.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS);

    let rot = FileRotate::new(
        log_path,
        AppendTimestamp::default(FileLimit::MaxFiles(backups)),
        ContentLimit::BytesSurpassed(max_bytes as usize),
        Compression::None,
        #[cfg(unix)]
        None,
    );

    Ok(RotWriter(Arc::new(Mutex::new(rot))))
}

fn writer_for_section(name: &str, section: &Section, base_dir: &Path) -> Option<RotWriter> {
    if section.file.trim().is_empty() {
        return None;
    }
    let log_path = resolve_log_path(&section.file, base_dir);
    match open_rotating_writer(&log_path, section) {
        Ok(w) => Some(w),
        Err(e) => {
            eprintln!(
                "Failed to open log file for '{}': {} ({})",
                name,
                log_path.to_string_lossy(),
                e
            );
            None
        }
    }
}

// -------- filters --------

struct Plan {
    console: Targets,
    file: Targets,
    router: FileRouter,
}

fn build_plan(cfg: &LoggingConfig, base_dir: &Path) -> Plan {
    let default = cfg.get(DEFAULT_SECTION);

    let mut console = Targets::new().with_default(
        default
            .map(|s| parse_level(&s.console_level))
            .unwrap_or(LevelFilter::OFF),
    );

    let mut router = FileRouter::default();
    let mut file_default = LevelFilter::OFF;
    if let Some(section) = default {
        router.default = writer_for_section(DEFAULT_SECTION, section, base_dir);
        if router.default.is_some() {
            file_default = file_level(section);
        }
    }
    let mut file = Targets::new().with_default(file_default);

    let mut names: Vec<&String> = cfg.keys().filter(|k| *k != DEFAULT_SECTION).collect();
    names.sort();
    for name in names {
        let section = &cfg[name];
        console = console.with_target(name.clone(), parse_level(&section.console_level));

        match writer_for_section(name, section, base_dir) {
            Some(writer) => {
                router.by_prefix.push((name.clone(), writer));
                file = file.with_target(name.clone(), file_level(section));
            }
            // no dedicated file: records go to the default file at the default level
            None => file = file.with_target(name.clone(), file_default),
        }
    }

    Plan {
        console,
        file,
        router,
    }
}

// -------- public init --------

/// Initialize logging from configuration.
/// - `cfg`: subsystem sections, "default" is the catch-all
/// - `base_dir`: resolves relative log file paths (usually server.home_dir)
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

    // Bridge `log` → `tracing` before installing the subscriber
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        init_default_logging();
        return;
    }

    let plan = build_plan(cfg, base_dir);
    let ansi = std::io::stdout().is_terminal();

    let console_layer = fmt::layer()
        .with_ansi(ansi)
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(plan.console);

    if plan.router.is_empty() {
        let _ = Registry::default().with(console_layer).try_init();
        return;
    }

    let file_layer = fmt::layer()
        .json()
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(plan.router)
        .with_filter(plan.file);

    let _ = Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

fn init_default_logging() {
    let _ = fmt()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .try_init();
}

/// Subsystems configured with their own file, for diagnostics output.
pub fn file_subsystems(cfg: &LoggingConfig) -> HashMap<String, PathBuf> {
    cfg.iter()
        .filter(|(_, s)| !s.file.trim().is_empty())
        .map(|(name, s)| (name.clone(), PathBuf::from(&s.file)))
        .collect()
}
