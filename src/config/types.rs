use std::collections::HashMap;

use anyhow::Result;
use serde::Deserialize;

use crate::dialer::DialerConfig;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub dialer: DialerConfig,
    /// Host name -> literal IP list, consulted before system resolution.
    #[serde(default)]
    pub hosts: HashMap<String, Vec<String>>,
    /// Extra overrides in `/etc/hosts` format. Inline `hosts` win.
    #[serde(default, rename = "hosts-file")]
    pub hosts_file: Option<String>,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.dialer.local_addr()?;
        for (host, addrs) in &self.hosts {
            if host.is_empty() {
                anyhow::bail!("hosts entry with empty name");
            }
            if addrs.iter().any(|a| a.trim().is_empty()) {
                anyhow::bail!("hosts entry '{}' contains an empty address", host);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
