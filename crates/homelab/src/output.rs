//! User-facing output
//!
//! Text mode prints human readable lines. JSON mode prints one result record
//! per line on stdout, which is what the helper gateway parses.

use crate::commands::bootstrap::RunFailed;
use clap::ValueEnum;
use colored::Colorize;
use homelab_cloud::{CloudError, Level, ResultRecord};
use homelab_config::ConfigError;
use homelab_core::{CoreError, ErrorKind};
use homelab_iso::IsoError;
use homelab_proxmox::ProxmoxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub struct Reporter {
    format: OutputFormat,
}

impl Reporter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Print `record`; in text mode only the message is shown
    pub fn emit(&self, record: &ResultRecord) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", record.to_line()?),
            OutputFormat::Text => match record.level {
                Level::Info => println!("{}", record.message),
                Level::Debug => println!("{}", record.message.dimmed()),
                Level::Error => eprintln!("{} {}", "Error:".red().bold(), record.message),
            },
        }
        Ok(())
    }

    pub fn info(&self, event: &str, message: impl Into<String>) -> anyhow::Result<()> {
        self.emit(&ResultRecord::new(Level::Info, event, message))
    }

    /// Like [`Reporter::emit`], with a check mark in text mode
    pub fn success(&self, record: &ResultRecord) -> anyhow::Result<()> {
        if self.is_json() {
            return self.emit(record);
        }
        println!("{} {}", "✓".green(), record.message.green());
        Ok(())
    }

    /// Report a fatal error. Never fails itself.
    pub fn failure(&self, kind: ErrorKind, error: &anyhow::Error) {
        let record = ResultRecord::new(Level::Error, kind.event(), format!("{:#}", error));
        match self.format {
            OutputFormat::Json => match record.to_line() {
                Ok(line) => println!("{}", line),
                Err(_) => eprintln!("{:#}", error),
            },
            OutputFormat::Text => eprintln!("{} {:#}", "Error:".red().bold(), error),
        }
    }
}

/// Kind of the first homelab error found in the chain
pub fn error_kind(error: &anyhow::Error) -> ErrorKind {
    for cause in error.chain() {
        if let Some(e) = cause.downcast_ref::<RunFailed>() {
            return e.kind;
        }
        if let Some(e) = cause.downcast_ref::<CoreError>() {
            return e.kind();
        }
        if let Some(e) = cause.downcast_ref::<ConfigError>() {
            return e.kind();
        }
        if let Some(e) = cause.downcast_ref::<CloudError>() {
            return e.kind();
        }
        if let Some(e) = cause.downcast_ref::<ProxmoxError>() {
            return e.kind();
        }
        if let Some(e) = cause.downcast_ref::<IsoError>() {
            return e.kind();
        }
    }
    ErrorKind::Operational
}
