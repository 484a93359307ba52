use super::authority;
use blindvote::{Authority, Config, Error};

pub fn command_health(config: &Config) -> anyhow::Result<()> {
    authority(config)?
        .health()
        .map_err(Error::HealthCheckFailed)?;
    println!("ok");
    Ok(())
}
