use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tracing::{debug, info, trace, warn};

use crate::remote;

/// Flat `key = value` configuration: built-in defaults,
/// optionally overlaid by `~/.taskdeckrc`, overlaid again by `rc.key=value`
/// command-line overrides.
#[derive(Debug, Clone)]
pub struct Config {
    map: HashMap<String, String>,
    pub loaded_file: Option<PathBuf>,
}

fn defaults() -> HashMap<String, String> {
    let mut map = HashMap::new();
    map.insert("data.location".to_string(), "~/.taskdeck".to_string());
    map.insert("default.command".to_string(), "list".to_string());
    map.insert("color".to_string(), "on".to_string());
    map.insert("theme".to_string(), "light".to_string());
    map.insert("posts.url".to_string(), remote::DEFAULT_POSTS_URL.to_string());
    map.insert(
        "posts.page.size".to_string(),
        remote::DEFAULT_PAGE_SIZE.to_string(),
    );
    map
}

impl Config {
    #[tracing::instrument(skip(rc_override))]
    pub fn load(rc_override: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = Config {
            map: defaults(),
            loaded_file: None,
        };

        match resolve_rc_path(rc_override)? {
            Some(path) => {
                info!(rc = %path.display(), "loading rc file");
                cfg.load_file(&path)?;
            }
            None => warn!("no rc file found; using defaults"),
        }

        Ok(cfg)
    }

    #[tracing::instrument(skip(self, overrides))]
    pub fn apply_overrides<I>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (k, v) in overrides {
            let key = k.strip_prefix("rc.").unwrap_or(&k).to_string();
            debug!(key = %key, value = %v, "applying override");
            self.map.insert(key, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> anyhow::Result<Option<usize>> {
        self.map
            .get(key)
            .map(|v| {
                v.parse::<usize>()
                    .with_context(|| format!("config key {key} is not a number: {v}"))
            })
            .transpose()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.map.iter()
    }

    #[tracing::instrument(skip(self))]
    fn load_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let path = expand_tilde(path);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        self.loaded_file = Some(path.clone());

        for (line_num, raw_line) in text.lines().enumerate() {
            let mut line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((before, _)) = line.split_once('#') {
                line = before.trim();
            }
            if line.is_empty() {
                continue;
            }

            let (k, v) = line.split_once('=').ok_or_else(|| {
                anyhow!(
                    "invalid config line {}:{}: {}",
                    path.display(),
                    line_num + 1,
                    raw_line
                )
            })?;

            let key = k.trim().to_string();
            let value = v.trim().to_string();
            trace!(key = %key, value = %value, "loaded config key");
            self.map.insert(key, value);
        }

        Ok(())
    }
}

/// Computes the data directory without creating it; the storage layer
/// decides what to do when it cannot be opened.
#[tracing::instrument(skip(cfg, override_dir))]
pub fn resolve_data_dir(cfg: &Config, override_dir: Option<&Path>) -> PathBuf {
    if let Some(path) = override_dir {
        return path.to_path_buf();
    }
    if let Some(cfg_value) = cfg.get("data.location") {
        return expand_tilde(Path::new(&cfg_value));
    }
    default_data_dir()
}

#[tracing::instrument(skip(override_path))]
fn resolve_rc_path(override_path: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = override_path {
        return Ok(Some(path.to_path_buf()));
    }

    if let Ok(rc_env) = std::env::var("TASKDECKRC") {
        if rc_env == "/dev/null" {
            return Ok(None);
        }
        return Ok(Some(PathBuf::from(rc_env)));
    }

    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    let candidate = home.join(".taskdeckrc");
    if candidate.exists() {
        return Ok(Some(candidate));
    }

    Ok(None)
}

fn default_data_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".taskdeck"),
        None => PathBuf::from(".taskdeck"),
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    if let Some(rest) = text.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn rc_file_overlays_defaults_and_overrides_win() {
        let mut file = tempfile::NamedTempFile::new().expect("temp rc");
        writeln!(file, "# comment").expect("write");
        writeln!(file, "theme = dark").expect("write");
        writeln!(file, "posts.page.size = 5  # trailing comment").expect("write");
        file.flush().expect("flush");

        let mut cfg = Config::load(Some(file.path())).expect("load");
        assert_eq!(cfg.get("theme").as_deref(), Some("dark"));
        assert_eq!(cfg.get_usize("posts.page.size").expect("parses"), Some(5));
        assert_eq!(cfg.get("color").as_deref(), Some("on"));

        cfg.apply_overrides(vec![("rc.theme".to_string(), "light".to_string())]);
        assert_eq!(cfg.get("theme").as_deref(), Some("light"));
    }

    #[test]
    fn malformed_line_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp rc");
        writeln!(file, "just some words").expect("write");
        file.flush().expect("flush");

        assert!(Config::load(Some(file.path())).is_err());
    }

    #[test]
    fn data_dir_override_beats_config() {
        let cfg = Config {
            map: defaults(),
            loaded_file: None,
        };
        let dir = resolve_data_dir(&cfg, Some(Path::new("/tmp/deck")));
        assert_eq!(dir, PathBuf::from("/tmp/deck"));
    }
}
