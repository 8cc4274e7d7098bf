use std::{
    collections::BTreeSet,
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};

use crate::{
    domain::ChatId,
    errors::Error,
    routing::RoutingConfig,
    Result,
};

/// On-disk shape of the routing config.
///
/// `paused` is deliberately absent: every process starts unpaused.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct RoutingRecord {
    #[serde(default)]
    origin_chats: Vec<i64>,
    #[serde(default)]
    destination_chats: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    admins: Option<Vec<String>>,
}

/// Durable JSON persistence for [`RoutingConfig`].
#[derive(Clone, Debug)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted config. Never fails: a missing or unreadable record
    /// yields empty defaults. Super admins are always merged into the admin set.
    pub fn load(&self, super_admins: &[String]) -> RoutingConfig {
        let mut cfg = match self.read_record() {
            Ok(Some(record)) => RoutingConfig {
                origins: record.origin_chats.into_iter().map(ChatId).collect(),
                destinations: record.destination_chats.into_iter().map(ChatId).collect(),
                admins: record
                    .admins
                    .unwrap_or_else(|| super_admins.to_vec())
                    .into_iter()
                    .collect(),
                paused: false,
            },
            Ok(None) => {
                tracing::info!(
                    path = %self.path.display(),
                    "no routing config found, starting with defaults"
                );
                RoutingConfig::default()
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "routing config unreadable, starting with defaults"
                );
                RoutingConfig::default()
            }
        };

        cfg.admins.extend(super_admins.iter().cloned());
        cfg
    }

    fn read_record(&self) -> Result<Option<RoutingRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let txt = fs::read_to_string(&self.path)?;
        if txt.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&txt)?))
    }

    /// Replace the whole record (temp file + rename, never a partial write).
    pub fn save(&self, cfg: &RoutingConfig) -> Result<()> {
        let record = RoutingRecord {
            origin_chats: ids(&cfg.origins),
            destination_chats: ids(&cfg.destinations),
            admins: Some(cfg.admins.iter().cloned().collect()),
        };
        let body = serde_json::to_string_pretty(&record)?;
        write_atomic(&self.path, &format!("{body}\n")).map_err(|reason| Error::Persist {
            path: self.path.clone(),
            reason,
        })
    }
}

fn ids(set: &BTreeSet<ChatId>) -> Vec<i64> {
    set.iter().map(|c| c.0).collect()
}

fn write_atomic(path: &Path, content: &str) -> std::result::Result<(), String> {
    if path.as_os_str().is_empty() {
        return Err("destination path cannot be empty".to_string());
    }
    if path.is_dir() {
        return Err("destination path is a directory".to_string());
    }

    let parent_dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent_dir)
        .map_err(|e| format!("failed to create {}: {e}", parent_dir.display()))?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "config.json".to_string());
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let temp_path = parent_dir.join(format!(
        ".{file_name}.{}.{timestamp}.tmp",
        std::process::id()
    ));

    let written = fs::File::create(&temp_path).and_then(|mut f| {
        f.write_all(content.as_bytes())?;
        f.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(format!(
            "failed to write temporary file {}: {e}",
            temp_path.display()
        ));
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        format!(
            "failed to rename {} to {}: {e}",
            temp_path.display(),
            path.display()
        )
    })
}
