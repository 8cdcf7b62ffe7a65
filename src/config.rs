//! Service configuration.
//!
//! Layers, lowest to highest precedence: built-in defaults, the TOML file
//! (`~/.config/reelgrab/config.toml` unless a path is given), environment
//! variables, then CLI flags (applied by the command that owns them).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::allowlist::AllowList;
use crate::device::DeviceProfile;
use crate::extract::select::SelectionPolicy;
use crate::extract::Pipeline;
use crate::render::{RenderOptions, RendererKind};

/// Directory served as static assets when present and not configured otherwise.
pub const DEFAULT_STATIC_DIR: &str = "public";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub renderer: RendererKind,
    /// Built-in device profile name (android, iphone, desktop).
    pub device: String,
    pub navigation_timeout_ms: u64,
    pub settle_ms: u64,
    /// Request body limit for `/api/fetch`.
    pub max_body_bytes: usize,
    /// Static asset directory. `None` serves `public/` if it exists.
    pub static_dir: Option<PathBuf>,
    /// Allowed CORS origins; `*` allows any.
    pub cors_origins: Vec<String>,
    pub allow: AllowList,
    pub selection: SelectionPolicy,
    /// Chromium binary; autodetected when unset.
    pub chrome_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            renderer: RendererKind::default(),
            device: "android".to_string(),
            navigation_timeout_ms: 30_000,
            settle_ms: 1_500,
            max_body_bytes: 2 * 1024 * 1024,
            static_dir: None,
            cors_origins: vec!["*".to_string()],
            allow: AllowList::default(),
            selection: SelectionPolicy::default(),
            chrome_path: None,
        }
    }
}

impl Config {
    /// Defaults, then the config file, then the process environment.
    ///
    /// An explicit `path` must exist. The default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
    }

    /// Override fields from environment variables looked up through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = var("PORT") {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port: {port:?}"))?;
        }
        if let Some(host) = var("HOST") {
            self.host = host;
        }
        if let Some(renderer) = var("REELGRAB_RENDERER") {
            self.renderer = renderer
                .parse()
                .map_err(anyhow::Error::msg)
                .context("REELGRAB_RENDERER")?;
        }
        if let Some(device) = var("REELGRAB_DEVICE") {
            self.device = device;
        }
        if let Some(path) = var("REELGRAB_CHROME") {
            self.chrome_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// Reject settings that would make every request fail.
    pub fn validate(&self) -> Result<()> {
        self.device_profile()?;
        if self.navigation_timeout_ms == 0 {
            bail!("navigation_timeout_ms must be greater than zero");
        }
        if self.max_body_bytes == 0 {
            bail!("max_body_bytes must be greater than zero");
        }
        if self.allow.rules().is_empty() {
            bail!("allow-list is empty; no URL could ever be fetched");
        }
        Ok(())
    }

    pub fn device_profile(&self) -> Result<DeviceProfile> {
        DeviceProfile::named(&self.device).with_context(|| {
            format!(
                "unknown device '{}' (expected one of: {})",
                self.device,
                DeviceProfile::BUILTIN.join(", ")
            )
        })
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            navigation_timeout: Duration::from_millis(self.navigation_timeout_ms),
            settle: Duration::from_millis(self.settle_ms),
        }
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(self.selection)
    }

    /// Static directory to serve, if any.
    pub fn resolved_static_dir(&self) -> Option<PathBuf> {
        match &self.static_dir {
            Some(dir) => Some(dir.clone()),
            None => {
                let default = PathBuf::from(DEFAULT_STATIC_DIR);
                default.is_dir().then_some(default)
            }
        }
    }
}

/// `<config_dir>/reelgrab/config.toml`.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("reelgrab").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_service_behavior() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_body_bytes, 2 * 1024 * 1024);
        assert_eq!(config.render_options(), RenderOptions::default());
        assert_eq!(config.selection, SelectionPolicy::Strict);
        assert_eq!(config.cors_origins, vec!["*"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
port = 8080
renderer = "script"
selection = "allow-protocol-relative"

[[allow]]
name = "TikTok"
pattern = "tiktok.com"
match = "suffix"
"#,
        )
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.renderer, RendererKind::Script);
        assert_eq!(config.selection, SelectionPolicy::AllowProtocolRelative);
        assert_eq!(config.allow.describe(), "TikTok");
        assert_eq!(config.settle_ms, 1_500);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<Config>("prot = 1").is_err());
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = Config {
            port: 8080,
            ..Config::default()
        };
        config
            .apply_env(env(&[
                ("PORT", "9000"),
                ("HOST", "127.0.0.1"),
                ("REELGRAB_RENDERER", "script"),
            ]))
            .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.renderer, RendererKind::Script);
    }

    #[test]
    fn bad_port_is_an_error() {
        let mut config = Config::default();
        let err = config.apply_env(env(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn unknown_device_fails_validation() {
        let config = Config {
            device: "toaster".into(),
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("android, iphone, desktop"));
    }

    #[test]
    fn empty_allow_list_fails_validation() {
        let config = Config {
            allow: AllowList::new(Vec::new()),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let path = std::env::temp_dir().join("reelgrab-does-not-exist.toml");
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn loads_config_file() {
        let path = std::env::temp_dir().join(format!("reelgrab-config-{}.toml", std::process::id()));
        std::fs::write(&path, "device = \"iphone\"\nsettle_ms = 0\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.device_profile().unwrap().name, "iphone");
        assert_eq!(config.render_options().settle, Duration::ZERO);
    }
}
