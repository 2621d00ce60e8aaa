use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;

pub const CONFIG_FILENAME: &str = "dh-template-bridge.toml";
pub const CONFIG_ENV: &str = "DH_TEMPLATE_BRIDGE_CONFIG";
pub const SHARED_PASS_ENV: &str = "DH_CONFTOOL_SHARED_PASS";

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub conftool: ConfToolSection,
    #[serde(default)]
    pub template: TemplateSection,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ConfToolSection {
    /// REST endpoint, e.g. `https://www.conftool.net/dh2025/rest.php`.
    #[serde(default)]
    pub url: Option<String>,
    /// Shared secret used to sign requests. Prefer the environment variable.
    #[serde(default)]
    pub shared_pass: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct TemplateSection {
    /// Replaces the bundled template. Relative paths resolve against the config file.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct BridgeConfig {
    pub config_path: PathBuf,
    pub conftool_url: Option<String>,
    pub shared_pass: Option<String>,
    pub template_path: Option<PathBuf>,
}

impl BridgeConfig {
    pub fn resolve(config_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let workdir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let cfg_file = config_path
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
            .or_else(|| find_default_config(&workdir, CONFIG_FILENAME));

        let mut file_cfg = AppConfig::default();
        if let Some(p) = cfg_file.as_ref() {
            if p.exists() {
                file_cfg = load_config(p)?;
            }
        }
        let config_path = cfg_file.unwrap_or_else(|| workdir.join(CONFIG_FILENAME));
        let config_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

        let shared_pass = std::env::var(SHARED_PASS_ENV)
            .ok()
            .or(file_cfg.conftool.shared_pass)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let conftool_url = file_cfg
            .conftool
            .url
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let template_path = file_cfg.template.path.map(|p| {
            if p.is_relative() {
                config_dir.join(p)
            } else {
                p
            }
        });

        Ok(Self {
            config_path,
            conftool_url,
            shared_pass,
            template_path,
        })
    }

    /// URL and shared secret, or an error naming what is missing.
    pub fn conftool_credentials(&self) -> anyhow::Result<(&str, &str)> {
        let url = self.conftool_url.as_deref().ok_or_else(|| {
            anyhow!(
                "conftool.url is not configured (config={})",
                self.config_path.display()
            )
        })?;
        let pass = self.shared_pass.as_deref().ok_or_else(|| {
            anyhow!(
                "conftool shared pass is not configured: set {SHARED_PASS_ENV} or conftool.shared_pass (config={})",
                self.config_path.display()
            )
        })?;
        Ok((url, pass))
    }
}

pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    let mut dir = start_dir;
    for _ in 0..=max_levels {
        let candidate = dir.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
    None
}

pub fn find_default_config(workdir: &Path, filename: &str) -> Option<PathBuf> {
    if let Some(p) = find_file_upwards(workdir, filename, 8) {
        return Some(p);
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            if let Some(p) = find_file_upwards(dir, filename, 10) {
                return Some(p);
            }
        }
    }
    None
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: AppConfig = toml::from_str(&text).context("parse config toml")?;
    Ok(cfg)
}

pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;
    let cfg_path = dir.join(CONFIG_FILENAME);
    if cfg_path.exists() && !force {
        return Ok(cfg_path);
    }
    std::fs::write(&cfg_path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;
    Ok(cfg_path)
}

const DEFAULT_CONFIG_TOML: &str = r#"[conftool]
# REST endpoint of the conference's ConfTool installation.
url = "https://www.conftool.net/your-conference/rest.php"
# Shared REST secret. Leave unset and export DH_CONFTOOL_SHARED_PASS instead
# to keep it out of the file.
# shared_pass = ""

[template]
# Uncomment to personalize a different template than the bundled DH_template_v1.
# path = "template/DH_template_v1.ott"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "dh-template-bridge-{name}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).expect("create scratch dir");
        dir
    }

    #[test]
    fn default_config_parses_and_is_not_overwritten() {
        let dir = scratch_dir("init");
        let path = init_default_config(&dir, false).expect("init");
        let cfg = load_config(&path).expect("load");
        assert!(cfg.conftool.url.is_some());
        assert!(cfg.conftool.shared_pass.is_none());
        assert!(cfg.template.path.is_none());

        std::fs::write(&path, "[conftool]\nurl = \"http://x\"\n").expect("write");
        init_default_config(&dir, false).expect("init again");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.conftool.url.as_deref(), Some("http://x"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn resolve_makes_template_path_relative_to_config() {
        let dir = scratch_dir("resolve");
        let path = dir.join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            "[conftool]\nurl = \" http://ct/rest.php \"\n\n[template]\npath = \"t/custom.ott\"\n",
        )
        .expect("write");
        let cfg = BridgeConfig::resolve(Some(path.clone())).expect("resolve");
        assert_eq!(cfg.conftool_url.as_deref(), Some("http://ct/rest.php"));
        assert_eq!(cfg.template_path, Some(dir.join("t/custom.ott")));
        assert_eq!(cfg.config_path, path);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn find_file_upwards_walks_parents() {
        let dir = scratch_dir("upwards");
        let nested = dir.join("a/b/c");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(dir.join("marker.toml"), "").expect("write");
        assert_eq!(
            find_file_upwards(&nested, "marker.toml", 3),
            Some(dir.join("marker.toml"))
        );
        assert_eq!(find_file_upwards(&nested, "marker.toml", 2), None);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
