use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::size::ImageSize;

/// Which HTTP API the model service speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// ComfyUI node-graph API (`/prompt`, `/history`, `/view`).
    #[default]
    ComfyUi,
    /// Stable Diffusion WebUI `sdapi` (`/sdapi/v1/txt2img`).
    WebUi,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::ComfyUi => f.write_str("comfyui"),
            BackendKind::WebUi => f.write_str("webui"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "comfyui" | "comfy" => Ok(BackendKind::ComfyUi),
            "webui" | "a1111" | "sdapi" => Ok(BackendKind::WebUi),
            other => Err(anyhow!("unknown backend {other:?} (expected comfyui or webui)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendKind,

    /// Base URL of the model service, e.g. http://127.0.0.1:8188 for ComfyUI.
    pub api_url: String,

    /// Checkpoint the service should sample with.
    pub model_name: String,

    /// Optional dedicated VAE; the checkpoint's own VAE is used otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vae_name: Option<String>,

    pub steps: u32,
    pub cfg_scale: f32,
    pub sampler: String,
    pub scheduler: String,
    pub negative_prompt: String,

    pub request_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,

    /// Longest side, in pixels, of the on-screen copy of a generated image.
    pub display_max: u32,

    /// Size preselected in the size selector.
    pub default_size: ImageSize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::ComfyUi,
            api_url: "http://127.0.0.1:8188".to_string(),
            model_name: "v1-4-pruned-emaonly.safetensors".to_string(),
            vae_name: None,
            steps: 50,
            cfg_scale: 7.5,
            sampler: "euler".to_string(),
            scheduler: "normal".to_string(),
            negative_prompt: String::new(),
            request_timeout_secs: 300,
            poll_interval_ms: 1000,
            max_poll_attempts: 600,
            display_max: 1200,
            default_size: ImageSize::default(),
        }
    }
}

impl AppConfig {
    /// Defaults, then the config file if one exists, then `AIGEN_*`
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// `AIGEN_CONFIG` if set, otherwise `<config_dir>/aigen/config.toml`.
    pub fn config_path() -> Option<PathBuf> {
        if let Ok(raw) = env::var("AIGEN_CONFIG") {
            if !raw.trim().is_empty() {
                return Some(PathBuf::from(raw));
            }
        }
        dirs::config_dir().map(|dir| dir.join("aigen").join("config.toml"))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("parse {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Applies `AIGEN_BACKEND`, `AIGEN_API_URL`, `AIGEN_MODEL` and
    /// `AIGEN_STEPS` as returned by `lookup`. Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|raw| !raw.trim().is_empty());

        if let Some(raw) = get("AIGEN_BACKEND") {
            self.backend = raw.parse()?;
        }
        if let Some(raw) = get("AIGEN_API_URL") {
            self.api_url = raw.trim().to_string();
        }
        if let Some(raw) = get("AIGEN_MODEL") {
            self.model_name = raw.trim().to_string();
        }
        if let Some(raw) = get("AIGEN_STEPS") {
            self.steps = raw
                .trim()
                .parse()
                .with_context(|| format!("AIGEN_STEPS must be a positive integer, got {raw:?}"))?;
        }
        Ok(())
    }

    /// Normalizes the service URL and rejects values the UI cannot work with.
    pub fn validate(&mut self) -> Result<()> {
        self.api_url = sanitize_base_url(&self.api_url)?;
        if self.steps == 0 {
            bail!("steps must be at least 1");
        }
        if self.display_max == 0 {
            bail!("display_max must be at least 1");
        }
        if self.max_poll_attempts == 0 {
            bail!("max_poll_attempts must be at least 1");
        }
        if !self.default_size.is_preset() {
            bail!(
                "default_size {} is not one of the offered sizes",
                self.default_size
            );
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Adds a scheme when missing and strips trailing slashes.
pub fn sanitize_base_url(raw: &str) -> Result<String> {
    let mut base = raw.trim().to_string();
    if base.is_empty() {
        bail!("model service URL is empty");
    }
    if !base.starts_with("http://") && !base.starts_with("https://") {
        base = format!("http://{base}");
    }
    while base.ends_with('/') {
        base.pop();
    }
    let _ = Url::parse(&base).with_context(|| format!("invalid model service URL {base:?}"))?;
    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn defaults_are_valid() {
        let mut config = AppConfig::default();
        config.validate().expect("defaults validate");
        assert_eq!(config.api_url, "http://127.0.0.1:8188");
        assert_eq!(config.default_size, ImageSize::square(256));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            backend = "webui"
            api_url = "localhost:7860/"
            default_size = "512x512"
            steps = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.backend, BackendKind::WebUi);
        assert_eq!(config.default_size, ImageSize::square(512));
        assert_eq!(config.steps, 30);
        assert_eq!(config.sampler, "euler");
        assert_eq!(config.display_max, 1200);
    }

    #[test]
    fn bad_size_in_toml_is_rejected() {
        assert!(AppConfig::from_toml_str(r#"default_size = "big""#).is_err());
    }

    #[test]
    fn overrides_win_over_file_values() {
        let env: HashMap<&str, &str> = [
            ("AIGEN_BACKEND", "a1111"),
            ("AIGEN_API_URL", "http://gpu-box:7860"),
            ("AIGEN_MODEL", " sd-v1-4.ckpt "),
            ("AIGEN_STEPS", ""),
        ]
        .into_iter()
        .collect();
        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.backend, BackendKind::WebUi);
        assert_eq!(config.api_url, "http://gpu-box:7860");
        assert_eq!(config.model_name, "sd-v1-4.ckpt");
        assert_eq!(config.steps, 50);
    }

    #[test]
    fn invalid_override_is_an_error() {
        let mut config = AppConfig::default();
        assert!(config
            .apply_overrides(|key| (key == "AIGEN_STEPS").then(|| "many".to_string()))
            .is_err());
        assert!(config
            .apply_overrides(|key| (key == "AIGEN_BACKEND").then(|| "dalle".to_string()))
            .is_err());
    }

    #[test]
    fn validate_rejects_non_preset_default_size() {
        let mut config = AppConfig {
            default_size: ImageSize::new(640, 480),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn sanitize_adds_scheme_and_trims() {
        assert_eq!(sanitize_base_url("127.0.0.1:8188//").unwrap(), "http://127.0.0.1:8188");
        assert_eq!(sanitize_base_url("https://sd.example.com/").unwrap(), "https://sd.example.com");
        assert!(sanitize_base_url("   ").is_err());
    }

    #[test]
    fn from_file_reads_toml_and_names_the_path_on_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "vae_name = \"vae-ft-mse-840000-ema-pruned.safetensors\"\nnegative_prompt = \"blurry\"\n",
        )
        .expect("write config");
        let loaded = AppConfig::from_file(&path).expect("load");
        assert_eq!(
            loaded,
            AppConfig {
                vae_name: Some("vae-ft-mse-840000-ema-pruned.safetensors".into()),
                negative_prompt: "blurry".into(),
                ..AppConfig::default()
            }
        );

        let missing = dir.path().join("absent.toml");
        let err = AppConfig::from_file(&missing).unwrap_err();
        assert!(format!("{err:#}").contains("absent.toml"));
    }
}
