//! Configuration management commands

use super::ConfigArgs;
use crate::config::Config;
use anyhow::Result;

pub async fn execute(args: ConfigArgs) -> Result<()> {
    if args.show {
        let config = Config::load().await?;
        println!("{}", toml::to_string_pretty(&config)?);
        println!("# data directory: {}", config.data_dir().display());
        return Ok(());
    }

    if args.init {
        Config::init_default().await?;
        println!("Configuration initialized");
        return Ok(());
    }

    if let Some(kv) = args.set {
        let Some((key, value)) = kv.split_once('=') else {
            anyhow::bail!("Invalid format. Use: --set key=value");
        };
        Config::set(key.trim(), value.trim()).await?;
        println!("Set {} = {}", key.trim(), value.trim());
        return Ok(());
    }

    // Default: show help
    println!("Use --show, --init, or --set key=value");
    Ok(())
}
