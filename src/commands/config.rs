use anyhow::Result;
use colored::Colorize;
use logkeep::config::{self, Config};
use logkeep::store;
use std::path::Path;
use tracing::info;

/// Execute the config show command
///
/// Displays the current configuration with secrets masked
pub fn show(config_path: &Path) -> Result<()> {
    println!("{}", "Loading configuration...".yellow());
    info!("Loading configuration for display");

    let cfg = config::load_config(config_path)?;
    let sanitized = sanitize_secrets(&cfg);

    println!("{}", "Current Configuration:".green().bold());
    println!();

    let toml_string = toml::to_string_pretty(&sanitized)?;
    println!("{}", toml_string);

    info!("Configuration displayed successfully");
    Ok(())
}

/// Execute the config validate command
pub fn validate(config_path: &Path) -> Result<()> {
    println!("{}", "Validating configuration...".yellow());
    info!("Validating configuration file");

    let cfg = config::load_config(config_path)?;

    println!("{}", "✓ Configuration is valid".green());
    println!();
    println!("{}", "Summary:".bold());
    println!("  Listen: {}:{}", cfg.server.host, cfg.server.port);
    println!(
        "  Store: {}",
        store::redact_url(&cfg.database.connection_url()?)
    );
    println!(
        "  Cache: {}",
        if cfg.cache.enabled { "enabled" } else { "disabled" }
    );

    info!("Configuration validation successful");
    Ok(())
}

/// Mask passwords, including one embedded in an explicit database URL
fn sanitize_secrets(cfg: &Config) -> Config {
    let mut sanitized = cfg.clone();

    sanitized.database.password = mask_secret(&sanitized.database.password);
    sanitized.database.url = sanitized.database.url.as_deref().map(store::redact_url);
    sanitized.cache.password = mask_secret(&sanitized.cache.password);

    sanitized
}

/// Empty secrets stay empty so "not set" remains visible
fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("password"), "***");
        assert_eq!(mask_secret(""), "");
    }

    #[test]
    fn test_sanitize_secrets() {
        let mut cfg = Config::default();
        cfg.cache.password = "valkey-secret".to_string();
        cfg.database.url = Some("postgres://app:hunter2@db:5432/logs".to_string());

        let sanitized = sanitize_secrets(&cfg);
        assert_eq!(sanitized.database.password, "***");
        assert_eq!(sanitized.cache.password, "***");
        assert!(!sanitized.database.url.unwrap().contains("hunter2"));

        // the source config is untouched
        assert_eq!(cfg.cache.password, "valkey-secret");
    }
}
