use std::path::Path;

use anyhow::{bail, Result};

use scrollwork_core::SchedulerConfig;

pub fn show(config: &SchedulerConfig) -> Result<()> {
    println!("{}", config.to_toml()?);
    Ok(())
}

pub fn path(explicit: Option<&Path>) -> Result<()> {
    match explicit {
        Some(path) => println!("{}", path.display()),
        None => println!("{}", SchedulerConfig::config_path().display()),
    }
    Ok(())
}

pub fn init(force: bool) -> Result<()> {
    let path = SchedulerConfig::config_path();
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    SchedulerConfig::default().save()?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
