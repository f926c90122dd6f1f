//! Installing resolved mods into the server configuration.
//!
//! The server lists installed catalog items in `WorkshopItems` and the
//! internal mod ids to load in `Mods`, both `;`-joined. New entries go to the
//! front of both lists.

pub mod settings;

use crate::catalog::ModMetadata;
use std::path::PathBuf;
use tracing::info;

pub use settings::{IniSettings, MemorySettings, ServerSettings};

pub const WORKSHOP_ITEMS_KEY: &str = "WorkshopItems";
pub const MODS_KEY: &str = "Mods";
const LIST_DELIMITER: char = ';';

/// Result type for install operations
pub type InstallResult<T> = Result<T, InstallError>;

/// Install errors
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Setting error: {0}")]
    Setting(String),
}

/// New values for both server lists plus the catalog ids that were added
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    pub workshop_items: Vec<String>,
    pub mods: Vec<String>,
    pub added: Vec<String>,
}

/// Compute the updated lists for a batch.
///
/// Entries are taken in batch order; each one not already installed (by
/// catalog id) has its catalog id and its internal mod ids put in front of
/// the current lists, its own mod ids keeping their declared order.
pub fn plan_install(
    workshop_items: Vec<String>,
    mods: Vec<String>,
    batch: &[ModMetadata],
) -> InstallPlan {
    let mut workshop_items = workshop_items;
    let mut mods = mods;
    let mut added = Vec::new();

    for metadata in batch {
        if workshop_items.contains(&metadata.catalog_id) {
            continue;
        }
        workshop_items.insert(0, metadata.catalog_id.clone());

        let mut front: Vec<String> = metadata
            .mod_ids
            .iter()
            .filter(|id| !mods.contains(id))
            .cloned()
            .collect();
        front.dedup();
        front.append(&mut mods);
        mods = front;

        added.push(metadata.catalog_id.clone());
    }

    InstallPlan {
        workshop_items,
        mods,
        added,
    }
}

fn split_list(value: Option<String>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(LIST_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn join_list(items: &[String]) -> String {
    items.join(&LIST_DELIMITER.to_string())
}

/// Applies resolved batches to the server configuration
pub struct InstallCoordinator<S: ServerSettings> {
    settings: S,
}

impl<S: ServerSettings> InstallCoordinator<S> {
    pub fn new(settings: S) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }

    /// Catalog ids currently installed
    pub async fn installed(&self) -> InstallResult<Vec<String>> {
        Ok(split_list(self.settings.get(WORKSHOP_ITEMS_KEY).await?))
    }

    pub async fn is_installed(&self, catalog_id: &str) -> InstallResult<bool> {
        Ok(self.installed().await?.iter().any(|id| id == catalog_id))
    }

    /// Install a batch. Returns the catalog ids that were actually added.
    pub async fn install(&self, batch: &[ModMetadata]) -> InstallResult<Vec<String>> {
        let workshop_items = self.installed().await?;
        let mods = split_list(self.settings.get(MODS_KEY).await?);

        let plan = plan_install(workshop_items, mods, batch);
        if plan.added.is_empty() {
            info!("nothing to install, every item is already present");
            return Ok(plan.added);
        }

        self.settings
            .set(WORKSHOP_ITEMS_KEY, &join_list(&plan.workshop_items))
            .await?;
        self.settings.set(MODS_KEY, &join_list(&plan.mods)).await?;

        info!(added = ?plan.added, "installed mods into server config");
        Ok(plan.added)
    }
}
