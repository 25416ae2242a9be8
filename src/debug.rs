//! Logging bridge for tabstree.
//!
//! Installs a `log::Log` implementation so every `log::info!()` and friends
//! lands in `tabstree_debug.log` inside the system temp directory. When
//! `RUST_LOG` is set, records are mirrored to stderr as well.
//!
//! Level precedence: `--log-level` on the command line, then `RUST_LOG`,
//! then `log_level` from the config file (applied through [`set_log_level`]
//! once the config is loaded).

use log::{LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Set when the CLI or `RUST_LOG` chose the level; config may not override it
static LEVEL_PINNED: AtomicBool = AtomicBool::new(false);

static LOGGER: OnceLock<DebugLogger> = OnceLock::new();

struct DebugLogger {
    file: Mutex<Option<File>>,
    mirror_stderr: bool,
}

impl DebugLogger {
    fn new(mirror_stderr: bool) -> Self {
        Self {
            file: Mutex::new(None),
            mirror_stderr,
        }
    }

    fn write_line(&self, line: &str) {
        let mut file = self.file.lock();
        if file.is_none() {
            *file = open_log_file();
        }
        if let Some(f) = file.as_mut() {
            let _ = f.write_all(line.as_bytes());
            let _ = f.flush();
        }
    }
}

impl Log for DebugLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "[{}] [{:<5}] [{}] {}\n",
            get_timestamp(),
            record.level(),
            record.target(),
            record.args()
        );
        if self.mirror_stderr {
            eprint!("{}", line);
        }
        self.write_line(&line);
    }

    fn flush(&self) {
        if let Some(f) = self.file.lock().as_mut() {
            let _ = f.flush();
        }
    }
}

/// Path of the debug log file
pub fn log_path() -> PathBuf {
    std::env::temp_dir().join("tabstree_debug.log")
}

fn open_log_file() -> Option<File> {
    // A log file that cannot be opened is not worth failing over
    let mut file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .create(true)
        .open(log_path())
        .ok()?;
    let _ = file.write_all(
        format!(
            "\n{}\ntabstree debug session started at {}\n{}\n",
            "=".repeat(80),
            get_timestamp(),
            "=".repeat(80)
        )
        .as_bytes(),
    );
    Some(file)
}

fn get_timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:06}", now.as_secs(), now.subsec_micros())
}

/// Most verbose level named in a `RUST_LOG`-style value.
///
/// Accepts a bare level (`debug`) and `target=level` directives separated by
/// commas. Unparseable directives are ignored.
pub fn parse_env_level(value: &str) -> Option<LevelFilter> {
    value
        .split(',')
        .filter_map(|directive| {
            let level = directive.rsplit('=').next()?.trim();
            level.parse::<LevelFilter>().ok()
        })
        .max()
}

/// Install the bridge. Safe to call more than once; later calls only
/// adjust the level.
pub fn init_log_bridge(cli_level: Option<LevelFilter>) {
    let env_value = std::env::var("RUST_LOG").ok();
    let env_level = env_value.as_deref().and_then(parse_env_level);
    let level = cli_level.or(env_level);

    let logger = LOGGER.get_or_init(|| DebugLogger::new(env_value.is_some()));
    let _ = log::set_logger(logger);

    LEVEL_PINNED.store(level.is_some(), Ordering::Relaxed);
    log::set_max_level(level.unwrap_or(LevelFilter::Off));
}

/// Apply the level from the config file unless the CLI or `RUST_LOG`
/// already decided it
pub fn set_log_level(level: LevelFilter) {
    if !LEVEL_PINNED.load(Ordering::Relaxed) {
        log::set_max_level(level);
    }
}
