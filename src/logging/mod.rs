use env_logger::{Env, Logger};
use log::{Log, Metadata, Record, SetLoggerError};
use std::sync::Mutex;

type LogHook = Box<dyn Fn(&str) + Send + 'static>;

/// Writes through env_logger and mirrors every formatted line to a hook,
/// e.g. a channel feeding the log pane of the window.
struct HookedLogger {
    inner: Logger,
    hook: Mutex<LogHook>,
}

impl Log for HookedLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.inner.matches(record) {
            return;
        }
        self.inner.log(record);

        let line = format_line(record);
        if let Ok(hook) = self.hook.lock() {
            hook(&line);
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

fn build_logger(default_filter: &str) -> Logger {
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).build()
}

pub fn format_line(record: &Record) -> String {
    format!("[{} {}] {}", record.level(), record.target(), record.args())
}

/// Installs env_logger as the global logger. `RUST_LOG` overrides
/// `default_filter`.
pub fn init(default_filter: &str) -> Result<(), SetLoggerError> {
    let logger = build_logger(default_filter);
    let max_level = logger.filter();
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(max_level);
    Ok(())
}

/// Like [`init`], and also hands each emitted line to `hook`.
pub fn init_with_hook<F>(default_filter: &str, hook: F) -> Result<(), SetLoggerError>
where
    F: Fn(&str) + Send + 'static,
{
    let inner = build_logger(default_filter);
    let max_level = inner.filter();
    log::set_boxed_logger(Box::new(HookedLogger {
        inner,
        hook: Mutex::new(Box::new(hook)),
    }))?;
    log::set_max_level(max_level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::LevelFilter;
    use std::sync::Arc;

    fn collecting_logger(level: LevelFilter) -> (HookedLogger, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let logger = HookedLogger {
            inner: env_logger::Builder::new().filter_level(level).build(),
            hook: Mutex::new(Box::new(move |line: &str| {
                sink.lock().unwrap().push(line.to_owned());
            })),
        };
        (logger, lines)
    }

    #[test]
    fn hook_receives_enabled_lines() {
        let (logger, lines) = collecting_logger(LevelFilter::Info);
        logger.log(
            &Record::builder()
                .args(format_args!("Compression started"))
                .level(log::Level::Info)
                .target("greedy_compress::process")
                .build(),
        );
        assert_eq!(
            *lines.lock().unwrap(),
            vec!["[INFO greedy_compress::process] Compression started".to_owned()]
        );
    }

    #[test]
    fn hook_skips_filtered_lines() {
        let (logger, lines) = collecting_logger(LevelFilter::Info);
        logger.log(
            &Record::builder()
                .args(format_args!("chatty detail"))
                .level(log::Level::Debug)
                .target("greedy_compress::process")
                .build(),
        );
        assert!(lines.lock().unwrap().is_empty());
    }

    #[test]
    fn line_format() {
        let line = format_line(
            &Record::builder()
                .args(format_args!("Loaded {}", "a.png"))
                .level(log::Level::Info)
                .target("greedy_compress::source")
                .build(),
        );
        assert_eq!(line, "[INFO greedy_compress::source] Loaded a.png");
    }
}
