use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone)]
pub struct Config {
    map: HashMap<String, String>,
    pub loaded_files: Vec<PathBuf>,
}

impl Config {
    /// Built-in defaults, before any rc file or override is applied.
    pub fn defaults() -> Self {
        let mut cfg = Config {
            map: HashMap::new(),
            loaded_files: vec![],
        };

        cfg.map.insert(
            "server.url".to_string(),
            "http://localhost:8000/api".to_string(),
        );
        cfg.map
            .insert("default.command".to_string(), "list".to_string());
        cfg.map.insert("color".to_string(), "on".to_string());

        cfg
    }

    #[tracing::instrument(skip(flowrc_override))]
    pub fn load(flowrc_override: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = Config::defaults();

        let flowrc = resolve_flowrc_path(flowrc_override)?;
        if let Some(path) = flowrc {
            info!(flowrc = %path.display(), "loading taskflowrc");
            cfg.load_file(&path)?;
        } else {
            warn!("no taskflowrc found; using defaults");
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

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.map.get(key).map(|v| parse_bool(v))
    }

    #[tracing::instrument(skip(self))]
    fn load_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let path = expand_tilde(path);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        self.loaded_files.push(path.clone());

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

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

            if let Some(include_rest) = line.strip_prefix("include ") {
                let include_path = resolve_include_path(&base_dir, include_rest.trim())?;
                debug!(
                    file = %path.display(),
                    include = %include_path.display(),
                    line = line_num + 1,
                    "processing include"
                );

                if include_path.exists() {
                    self.load_file(&include_path)?;
                } else {
                    warn!(include = %include_path.display(), "include file does not exist; skipping");
                }
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

/// The task server's API root. A `--server` flag wins over `server.url`.
#[tracing::instrument(skip(cfg, override_url))]
pub fn resolve_server_url(cfg: &Config, override_url: Option<&str>) -> anyhow::Result<String> {
    let url = if let Some(url) = override_url {
        url.to_string()
    } else {
        cfg.get("server.url")
            .ok_or_else(|| anyhow!("server.url is not configured"))?
    };

    if url.trim().is_empty() {
        return Err(anyhow!("server.url must not be empty"));
    }

    Ok(url)
}

#[tracing::instrument(skip(override_path))]
fn resolve_flowrc_path(override_path: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = override_path {
        return Ok(Some(path.to_path_buf()));
    }

    if let Ok(flowrc_env) = std::env::var("TASKFLOWRC") {
        if flowrc_env == "/dev/null" {
            return Ok(None);
        }
        return Ok(Some(PathBuf::from(flowrc_env)));
    }

    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    let candidate = home.join(".taskflowrc");
    if candidate.exists() {
        return Ok(Some(candidate));
    }

    Ok(None)
}

fn resolve_include_path(base_dir: &Path, include: &str) -> anyhow::Result<PathBuf> {
    if include.trim().is_empty() {
        return Err(anyhow!("include path cannot be empty"));
    }

    let raw = PathBuf::from(include);
    let expanded = expand_tilde(&raw);
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(base_dir.join(expanded))
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

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "1" | "y" | "yes" | "on" | "true"
    )
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::{Config, parse_bool, resolve_server_url};

    #[test]
    fn rc_file_overrides_defaults_and_follows_includes() {
        let dir = tempdir().expect("tempdir");
        let extra = dir.path().join("extra.rc");
        fs::write(&extra, "color=off\n").expect("write extra");

        let rc = dir.path().join("taskflowrc");
        fs::write(
            &rc,
            "# taskflow settings\n\
             server.url = http://tasks.example:9000/api  # staging\n\
             include extra.rc\n",
        )
        .expect("write rc");

        let mut cfg = Config::defaults();
        cfg.load_file(&rc).expect("load rc");

        assert_eq!(
            cfg.get("server.url").as_deref(),
            Some("http://tasks.example:9000/api")
        );
        assert_eq!(cfg.get_bool("color"), Some(false));
        assert_eq!(cfg.loaded_files.len(), 2);
    }

    #[test]
    fn overrides_strip_rc_prefix_and_win() {
        let mut cfg = Config::defaults();
        cfg.apply_overrides([("rc.color".to_string(), "off".to_string())]);
        assert_eq!(cfg.get_bool("color"), Some(false));
    }

    #[test]
    fn server_url_flag_wins_and_empty_is_rejected() {
        let cfg = Config::defaults();
        assert_eq!(
            resolve_server_url(&cfg, Some("http://other:1234/api")).unwrap(),
            "http://other:1234/api"
        );
        assert_eq!(
            resolve_server_url(&cfg, None).unwrap(),
            "http://localhost:8000/api"
        );
        assert!(resolve_server_url(&cfg, Some("  ")).is_err());
    }

    #[test]
    fn bool_values_parse_leniently() {
        assert!(parse_bool("Yes"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("off"));
    }
}
