use std::{collections::BTreeMap, fmt::Debug, path::PathBuf, time::Duration};

use anyhow::Context;
use log::info;
use serde::Deserialize;
use soil_report_utils::fs_json_util::read_toml_or_default;
use url::Url;

use crate::{crop::CropType, lime::LimeParams, query::PUBLIC_USER_NAME};

pub const DEFAULT_CONFIG_PATH: &str = "soil-report-config.toml";
pub const DEFAULT_BASE_URL: &str = "https://psaweb.clemson.edu/";

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: Url,
    pub user_name: String,
    pub admin_auth: u8,
    /// Lab numbers per results page.  `0` fetches the whole range at once.
    pub page_size: u32,
    /// Seconds to wait between report requests.
    pub request_interval: f64,
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub user_agent: String,
    pub targets: BTreeMap<CropType, f64>,
    pub lime: LimeParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL
                .parse()
                .expect("DEFAULT_BASE_URL is a valid URL"),
            user_name: PUBLIC_USER_NAME.to_owned(),
            admin_auth: 0,
            page_size: 0,
            request_interval: 2.0,
            timeout_secs: 30,
            max_retries: 3,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_owned(),
            targets: BTreeMap::new(),
            lime: LimeParams::default(),
        }
    }
}

impl Config {
    /// Loads the config, falling back to defaults when the file does not exist.
    pub fn load<P: Into<PathBuf> + Debug>(path: P) -> anyhow::Result<Self> {
        let path = path.into();
        let (config, found) = read_toml_or_default::<_, Config>(&path)?;
        if found {
            info!("Loaded config from {path:?}.");
        } else {
            info!("Config {path:?} was not found.  Using defaults.");
        }
        config
            .request_interval()
            .with_context(|| format!("Invalid config {path:?}"))?;
        Ok(config)
    }

    pub fn target_ph(&self, crop: CropType) -> f64 {
        self.targets
            .get(&crop)
            .copied()
            .unwrap_or_else(|| crop.default_target_ph())
    }

    /// Fails unless `request_interval` is a finite, non-negative number of seconds.
    pub fn request_interval(&self) -> anyhow::Result<Duration> {
        Duration::try_from_secs_f64(self.request_interval).with_context(|| {
            format!(
                "request_interval must be a non-negative number of seconds, found {}",
                self.request_interval
            )
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::Config;
    use crate::crop::CropType;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.base_url.as_str(), "https://psaweb.clemson.edu/");
        assert_eq!(config.user_name, "AGSRVLB");
        assert_eq!(config.request_interval().unwrap(), Duration::from_secs(2));
        assert_eq!(config.target_ph(CropType::Centipede), 5.5);
    }

    #[test]
    fn parse_toml() {
        let config: Config = toml::from_str(
            r#"
page_size = 10
request_interval = 0.5

[targets]
warm-season = 6.5

[lime]
factor = 5000.0
"#,
        )
        .unwrap();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.request_interval().unwrap(), Duration::from_millis(500));
        assert_eq!(config.target_ph(CropType::WarmSeason), 6.5);
        assert_eq!(config.target_ph(CropType::CoolSeason), 6.2);
        assert_eq!(config.lime.factor, 5000.0);
        assert_eq!(config.lime.buffer_reference, 8.0);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn invalid_request_interval() {
        for text in ["request_interval = inf", "request_interval = nan", "request_interval = -1.0"] {
            let config: Config = toml::from_str(text).unwrap();
            assert!(config.request_interval().is_err(), "{text}");
        }
    }
}
