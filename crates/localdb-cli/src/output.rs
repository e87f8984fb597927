//! Human-readable and JSON output.

use anyhow::Result;
use localdb_core::{InstanceInfo, VersionInfo};
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct Message<'a> {
    status: &'a str,
    message: &'a str,
}

pub struct Printer {
    json: bool,
}

impl Printer {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        if self.json {
            serde_json::to_writer_pretty(&mut stdout, value)?;
            writeln!(stdout)?;
        } else {
            writeln!(stdout, "{}", text())?;
        }
        Ok(())
    }

    pub fn list(&self, items: &[String]) -> Result<()> {
        self.emit(&items, || items.join("\n"))
    }

    pub fn value(&self, key: &str, value: &str) -> Result<()> {
        let mut map = serde_json::Map::new();
        map.insert(key.to_string(), value.into());
        self.emit(&map, || value.to_string())
    }

    pub fn done(&self, message: &str) -> Result<()> {
        let body = Message {
            status: "ok",
            message,
        };
        self.emit(&body, || message.to_string())
    }

    pub fn instance(&self, info: &InstanceInfo) -> Result<()> {
        self.emit(info, || format_instance(info))
    }

    pub fn version(&self, info: &VersionInfo) -> Result<()> {
        self.emit(info, || {
            format!(
                "Version:  {}\nExists:   {}\nBuild:    {}.{}.{}.{}",
                info.version,
                yes_no(info.exists),
                info.major,
                info.minor,
                info.build,
                info.revision
            )
        })
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

fn format_instance(info: &InstanceInfo) -> String {
    if !info.exists {
        return format!("Instance {} does not exist", info.instance_name);
    }
    let last_start = info
        .last_start()
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "never".to_string());
    let mut lines = vec![
        format!("Name:               {}", info.instance_name),
        format!("Version:            {}", info.version_string()),
        format!("Shared name:        {}", info.shared_instance_name),
        format!("Owner:              {}", info.owner_sid),
        format!("Auto-create:        {}", yes_no(info.is_automatic)),
        format!("State:              {}", if info.is_running { "Running" } else { "Stopped" }),
        format!("Last start time:    {}", last_start),
        format!("Instance pipe name: {}", info.connection),
    ];
    if info.configuration_corrupted {
        lines.push("Configuration:      CORRUPTED".to_string());
    }
    lines.join("\n")
}
