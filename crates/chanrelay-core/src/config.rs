use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, transform::TransformMode, Result};

/// Typed process configuration, read from the environment (and `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    // Credentials
    pub bot_token: String,
    pub super_admins: Vec<String>,

    // Persistence
    pub routing_file: PathBuf,

    // Runtime behaviour
    pub delivery_timeout: Duration,
    /// `None` means pending dialogs never expire.
    pub dialog_timeout: Option<Duration>,
    pub transform_mode: TransformMode,

    // Logging
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(env_str)
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bot_token = get("BOT_TOKEN").unwrap_or_default();
        if bot_token.trim().is_empty() {
            return Err(Error::Config(
                "BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let super_admins = parse_handles(get("SUPER_ADMIN_LIST"));

        let routing_file = get("ROUTING_CONFIG_FILE")
            .and_then(non_empty)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config.json"));

        let delivery_timeout = Duration::from_millis(
            parse_u64(get("DELIVERY_TIMEOUT_MS"))
                .filter(|ms| *ms > 0)
                .unwrap_or(10_000),
        );
        let dialog_timeout = match parse_u64(get("DIALOG_TIMEOUT_SECS")).unwrap_or(300) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let transform_mode = match get("TRANSFORM_MODE").and_then(non_empty) {
            Some(raw) => raw.parse::<TransformMode>()?,
            None => TransformMode::default(),
        };

        let log_file = match get("LOG_FILE") {
            Some(v) => non_empty(v).map(PathBuf::from),
            None => Some(PathBuf::from("bot.log")),
        };

        Ok(Self {
            bot_token,
            super_admins,
            routing_file,
            delivery_timeout,
            dialog_timeout,
            transform_mode,
            log_file,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn parse_u64(v: Option<String>) -> Option<u64> {
    v.and_then(|s| s.trim().parse::<u64>().ok())
}

/// Comma-separated handles; a leading `@` is tolerated and duplicates dropped.
fn parse_handles(v: Option<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for raw in v.unwrap_or_default().split(',') {
        let handle = raw.trim().trim_start_matches('@');
        if handle.is_empty() || out.iter().any(|h| h == handle) {
            continue;
        }
        out.push(handle.to_string());
    }
    out
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn missing_token_is_fatal() {
        let err = Config::from_lookup(lookup(&[("SUPER_ADMIN_LIST", "alice")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::from_lookup(lookup(&[("BOT_TOKEN", "   ")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn defaults_apply() {
        let cfg = Config::from_lookup(lookup(&[("BOT_TOKEN", "t")])).unwrap();
        assert!(cfg.super_admins.is_empty());
        assert_eq!(cfg.routing_file, PathBuf::from("config.json"));
        assert_eq!(cfg.delivery_timeout, Duration::from_secs(10));
        assert_eq!(cfg.dialog_timeout, Some(Duration::from_secs(300)));
        assert_eq!(cfg.transform_mode, TransformMode::Replace);
        assert_eq!(cfg.log_file, Some(PathBuf::from("bot.log")));
    }

    #[test]
    fn super_admin_list_is_trimmed_and_deduped() {
        let cfg = Config::from_lookup(lookup(&[
            ("BOT_TOKEN", "t"),
            ("SUPER_ADMIN_LIST", " alice,@bob,, alice "),
        ]))
        .unwrap();
        assert_eq!(cfg.super_admins, vec!["alice", "bob"]);
    }

    #[test]
    fn zero_dialog_timeout_disables_expiry_and_empty_log_file_disables_sink() {
        let cfg = Config::from_lookup(lookup(&[
            ("BOT_TOKEN", "t"),
            ("DIALOG_TIMEOUT_SECS", "0"),
            ("LOG_FILE", ""),
            ("TRANSFORM_MODE", "bracket"),
        ]))
        .unwrap();
        assert_eq!(cfg.dialog_timeout, None);
        assert_eq!(cfg.log_file, None);
        assert_eq!(cfg.transform_mode, TransformMode::Bracket);
    }

    #[test]
    fn unknown_transform_mode_is_rejected() {
        let err = Config::from_lookup(lookup(&[("BOT_TOKEN", "t"), ("TRANSFORM_MODE", "shout")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
