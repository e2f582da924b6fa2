use std::io::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use log::{Level, LevelFilter};

use crate::config::LogFormat;

// What reqwest pulls in underneath; only their warnings are worth showing
const TRANSPORT_TARGETS: [&str; 4] = ["reqwest", "hyper", "hyper_util", "h2"];

// RUST_LOG is read first, then `level` overrides it for this crate and globally.
// Fails if a logger is already installed for the process.
pub fn init_logger(level: LevelFilter, format: LogFormat) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level);
    for target in TRANSPORT_TARGETS {
        builder.filter_module(target, level.min(LevelFilter::Warn));
    }
    builder.filter_module(env!("CARGO_CRATE_NAME"), level);

    builder.format(move |buf, record| {
        let line = match format {
            LogFormat::Json => json_line(Utc::now(), record.level(), record.target(), &record.args().to_string()),
            LogFormat::Plain => format!(
                "{} {:<5} {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.args()
            ),
        };
        writeln!(buf, "{}", line)
    });

    builder.try_init()
}

// One JSON object per line
fn json_line(at: DateTime<Utc>, level: Level, target: &str, msg: &str) -> String {
    serde_json::json!({
        "ts": at.to_rfc3339_opts(SecondsFormat::Millis, true),
        "level": level.as_str(),
        "target": target,
        "msg": msg,
    })
    .to_string()
}
