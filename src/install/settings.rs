//! Server settings access.
//!
//! The server keeps its mod lists in a flat `Key=value` settings file. Only
//! whole-value reads and writes are needed here.

use super::{InstallError, InstallResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Key/value view of the server's main settings
#[async_trait]
pub trait ServerSettings: Send + Sync {
    async fn get(&self, key: &str) -> InstallResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> InstallResult<()>;
}

/// `Key=value` settings file (`<config_dir>/<server>.ini`).
///
/// Lines other than the rewritten key are preserved verbatim.
#[derive(Debug, Clone)]
pub struct IniSettings {
    path: PathBuf,
}

impl IniSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config_dir>/<server>.ini`
    pub fn for_server(config_dir: &Path, server_name: &str) -> Self {
        Self::new(config_dir.join(format!("{}.ini", server_name)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> InstallResult<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| InstallError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

fn split_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_start();
    if line.starts_with('#') || line.starts_with(';') || line.starts_with('[') {
        return None;
    }
    line.split_once('=').map(|(k, v)| (k.trim(), v.trim()))
}

#[async_trait]
impl ServerSettings for IniSettings {
    async fn get(&self, key: &str) -> InstallResult<Option<String>> {
        let contents = self.read().await?;
        Ok(contents
            .lines()
            .filter_map(split_line)
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> InstallResult<()> {
        let contents = self.read().await?;
        let mut replaced = false;

        let mut lines: Vec<String> = contents
            .lines()
            .map(|line| match split_line(line) {
                Some((k, _)) if k == key && !replaced => {
                    replaced = true;
                    format!("{}={}", key, value)
                }
                _ => line.to_string(),
            })
            .collect();
        if !replaced {
            lines.push(format!("{}={}", key, value));
        }

        let mut output = lines.join("\n");
        output.push('\n');
        tokio::fs::write(&self.path, output)
            .await
            .map_err(|source| InstallError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

/// In-memory settings for tests and dry runs
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, key: &str, value: &str) -> Self {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl ServerSettings for MemorySettings {
    async fn get(&self, key: &str) -> InstallResult<Option<String>> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> InstallResult<()> {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
