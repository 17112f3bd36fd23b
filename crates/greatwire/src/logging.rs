use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Full filter directives; overrides `--log-level` when set.
pub const LOG_ENV: &str = "GREATWIRE_LOG";

const WORKSPACE_TARGETS: [&str; 4] = [
    "greatwire",
    "greatwire_rpc",
    "greatwire_transport",
    "greatwire_format",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Verbosity of the greatwire crates. Frame dumps are logged at `trace`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    fn shows_targets(self) -> bool {
        matches!(self, LogLevel::Debug | LogLevel::Trace)
    }
}

/// Applies `level` to the greatwire crates; everything else stays at `warn`
/// or quieter.
fn default_directives(level: LogLevel) -> String {
    let others = match level {
        LogLevel::Error => "error",
        _ => "warn",
    };
    let mut directives = others.to_string();
    for target in WORKSPACE_TARGETS {
        directives.push_str(&format!(",{target}={}", level.directive()));
    }
    directives
}

fn filter(level: LogLevel, overrides: Option<String>) -> EnvFilter {
    if let Some(directives) = overrides {
        match EnvFilter::try_new(&directives) {
            Ok(filter) => return filter,
            Err(err) => eprintln!("warning: ignoring {LOG_ENV}={directives:?}: {err}"),
        }
    }
    EnvFilter::new(default_directives(level))
}

/// Install the stderr subscriber. Stdout is reserved for command output.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter(level, std::env::var(LOG_ENV).ok()))
        .with_ansi(false)
        .with_target(level.shows_targets());

    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
