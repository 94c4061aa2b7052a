use std::{
    path::Path,
    sync::{Arc, LazyLock, Mutex},
};

use chrono::{Datelike, Local, Timelike};
use color_eyre::Result;
use colored::{ColoredString, Colorize};
use log::LevelFilter;

use crate::{model::Model, GenerationSettings};

use super::LogFormat;

pub struct State {
    pub model: Arc<Model>,
    pub settings: GenerationSettings,
}

pub static LOG_LEVEL: LazyLock<Mutex<LevelFilter>> =
    LazyLock::new(|| Mutex::new(LevelFilter::Info));
pub static LOG_FORMAT: LazyLock<Mutex<LogFormat>> = LazyLock::new(|| Mutex::new(LogFormat::Long));

impl State {
    pub fn load(model_path: &Path, settings_path: Option<&Path>) -> Result<Self> {
        let model = Arc::new(Model::from_file(model_path)?);
        let settings = match settings_path {
            Some(path) => GenerationSettings::from_file(path)?,
            None => GenerationSettings::default(),
        };
        Ok(State { model, settings })
    }
}

pub(crate) fn setup_log() -> Result<()> {
    fern::Dispatch::new()
        .filter(|metadata| {
            metadata.level() <= LOG_LEVEL.lock().map_or(LevelFilter::Info, |level| *level)
        })
        // Perform allocation-free log formatting
        .format(|out, message, record| {
            let now = Local::now();
            match LOG_FORMAT.lock().map_or(LogFormat::Long, |format| *format) {
                LogFormat::Long => out.finish(format_args!(
                    "[{}] @{} {}: {}",
                    format!(
                        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:03}",
                        now.year(),
                        now.month(),
                        now.day(),
                        now.hour(),
                        now.minute(),
                        now.second(),
                        now.timestamp_subsec_millis()
                    )
                    .bright_green(),
                    format_target(record.target().into(), record.level()),
                    format_level(record.level()),
                    message
                )),
                LogFormat::Short => out.finish(format_args!(
                    "[{}] {}: {}",
                    format!("{:02}:{:02}:{:02}", now.hour(), now.minute(), now.second())
                        .bright_green(),
                    format_level(record.level()),
                    message
                )),
                LogFormat::Min => out.finish(format_args!(
                    "{}: {}",
                    format_level(record.level()),
                    message
                )),
                LogFormat::None => out.finish(format_args!("{}", message)),
            }
        })
        .chain(std::io::stdout())
        .apply()?;

    Ok(())
}

pub(crate) fn format_level(level: log::Level) -> ColoredString {
    match level {
        log::Level::Error => format!("{:<8}", "ERROR").red(),
        log::Level::Warn => format!("{:<8}", "WARNING").yellow(),
        log::Level::Info => format!("{:<8}", "INFO").into(),
        log::Level::Debug => format!("{:<8}", "DEBUG").bright_black(),
        log::Level::Trace => format!("{:<8}", "TRACE").into(),
    }
}

pub(crate) fn format_target(target: String, level: log::Level) -> ColoredString {
    let split_targets = target.split("::").collect::<Vec<_>>();
    let start = split_targets.len().saturating_sub(2);
    let mut shortened_path = split_targets[start..].join("::");
    if level < log::Level::Debug && shortened_path.len() > 20 {
        shortened_path = format!("{}...", shortened_path.chars().take(17).collect::<String>());
    }
    format!("{:<20}", shortened_path).bright_blue()
}
