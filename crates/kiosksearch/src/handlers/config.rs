use kiosksearch_config::SearchConfig;

/// Print the effective configuration
pub fn show(config: &SearchConfig) -> anyhow::Result<()> {
    println!("{}", config.to_toml()?);
    Ok(())
}
