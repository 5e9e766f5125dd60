pub mod types;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::dialer::Dialer;
use crate::dns::{parse_hosts_file, OverrideResolver};

pub use types::{Config, LogConfig};

pub fn load_config(path: &str) -> Result<Config> {
    let content = std::fs::read_to_string(Path::new(path))
        .with_context(|| format!("reading config {}", path))?;
    let config = parse_config(&content)?;
    debug!(path = path, hosts = config.hosts.len(), "config loaded");
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config> {
    // An empty document is a valid, all-default config.
    let config: Config = if content.trim().is_empty() {
        Config::default()
    } else {
        serde_yml::from_str(content)?
    };
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Merge the hosts file (if any) under the inline overrides.
    pub fn override_map(&self) -> Result<HashMap<String, Vec<String>>> {
        let mut hosts = match &self.hosts_file {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("reading hosts file {}", path))?;
                parse_hosts_file(&content)
            }
            None => HashMap::new(),
        };
        for (host, addrs) in &self.hosts {
            hosts.insert(host.clone(), addrs.clone());
        }
        Ok(hosts)
    }

    /// A dialer resolving through the configured overrides, then the system.
    pub fn build_dialer(&self) -> Result<Dialer> {
        let resolver = OverrideResolver::new(self.override_map()?);
        Ok(Dialer::with_resolver(self.dialer.clone(), Arc::new(resolver))?)
    }
}
