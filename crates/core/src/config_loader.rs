use crate::asset::AssetRegistry;
use crate::config::EngineConfig;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Json, Toml},
    Figment,
};

pub struct ConfigLoader;

impl ConfigLoader {
    fn base() -> Figment {
        Figment::new().merge(Toml::file("config/Engine.toml"))
    }

    fn finish(figment: Figment) -> Result<EngineConfig> {
        let config: EngineConfig = figment
            .merge(Env::prefixed("RISK_ENGINE_").split("__"))
            .join(Json::file("config/Engine.json"))
            .extract()
            .context("Failed to extract engine configuration")?;

        // Surface bad asset definitions at load time rather than first use
        AssetRegistry::extended(config.assets.clone())
            .context("Invalid asset configuration")?;

        tracing::info!(
            preset = %config.scoring.weights_preset,
            extra_assets = config.assets.len(),
            data_dir = %config.storage.data_dir,
            "Loaded engine configuration"
        );

        Ok(config)
    }

    /// Loads engine configuration by merging TOML, environment variables, and JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be parsed or the
    /// configured assets are invalid.
    pub fn load() -> Result<EngineConfig> {
        Self::finish(Self::base())
    }

    /// Loads engine configuration with a specific profile.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be parsed or the
    /// configured assets are invalid.
    pub fn load_with_profile(profile: &str) -> Result<EngineConfig> {
        Self::finish(Self::base().merge(Toml::file(format!("config/Engine.{profile}.toml"))))
    }

    /// Loads engine configuration from an explicit TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or the configured assets
    /// are invalid.
    pub fn load_from(path: &str) -> Result<EngineConfig> {
        Self::finish(Figment::new().merge(Toml::file(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn empty_configuration_uses_defaults() {
        Jail::expect_with(|_jail| {
            let config = ConfigLoader::load().expect("defaults");
            assert_eq!(config.scoring.weights_preset, "default");
            assert_eq!(config.confidence.outcome_horizon_days, 30);
            assert!((config.confidence.neutral_band_low - 0.45).abs() < f64::EPSILON);
            assert_eq!(config.storage.data_dir, "data");
            assert!(config.assets.is_empty());
            Ok(())
        });
    }

    #[test]
    fn toml_and_env_are_merged() {
        Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/Engine.toml",
                r#"
                [scoring]
                weights_preset = "conservative"

                [confidence]
                outcome_horizon_days = 14
                "#,
            )?;
            jail.set_env("RISK_ENGINE_STORAGE__DATA_DIR", "/var/lib/risk");

            let config = ConfigLoader::load().expect("merged config");
            assert_eq!(config.scoring.weights_preset, "conservative");
            assert_eq!(config.confidence.outcome_horizon_days, 14);
            assert_eq!(config.confidence.rsquared_window, 30);
            assert_eq!(config.storage.data_dir, "/var/lib/risk");
            Ok(())
        });
    }

    #[test]
    fn profile_file_overrides_base() {
        Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/Engine.toml",
                "[confidence]\nflush_interval_secs = 60\n",
            )?;
            jail.create_file(
                "config/Engine.test.toml",
                "[confidence]\nflush_interval_secs = 5\n",
            )?;

            let config = ConfigLoader::load_with_profile("test").expect("profile config");
            assert_eq!(config.confidence.flush_interval_secs, 5);
            Ok(())
        });
    }

    #[test]
    fn invalid_extra_asset_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/Engine.toml",
                r#"
                [[assets]]
                asset_id = "PEPE"
                gecko_id = "pepe"
                binance_symbol = "PEPEUSDT"
                display_name = "Pepe"
                origin_date = "2023-04-17T00:00:00Z"
                deviation_bounds = { low = -1.0, high = 1.5 }
                confidence_level = 3
                "#,
            )?;

            assert!(ConfigLoader::load().is_err());
            Ok(())
        });
    }
}
