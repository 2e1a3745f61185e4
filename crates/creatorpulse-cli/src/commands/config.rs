//! Implementation of the `creatorpulse config show` and `config validate` commands.

use creatorpulse_core::config::Config;

pub fn show(config: &Config) -> anyhow::Result<()> {
    let rendered = toml::to_string_pretty(config)?;
    println!("{rendered}");
    Ok(())
}

pub fn validate(config_path: &str) -> anyhow::Result<()> {
    match Config::load_and_validate(Some(config_path)) {
        Ok(_) => {
            println!("configuration is valid");
            Ok(())
        }
        Err(errors) => {
            eprintln!("configuration is invalid ({} error(s)):", errors.len());
            for error in &errors {
                eprintln!("  - {error}");
            }
            anyhow::bail!("configuration validation failed");
        }
    }
}
