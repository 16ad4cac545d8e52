//! `roster list` - dump the host's accounts in config format

use acctkit::DesiredAccount;
use anyhow::{Context as AnyhowContext, Result};
use serde::Serialize;

use crate::Context;
use crate::cli::ListFormat;
use crate::config::RosterConfig;
use crate::engine;
use crate::engine::planner::matches_filter;

/// Same shape as the `users` table of a config file
#[derive(Debug, Serialize)]
struct Listing {
    users: Vec<DesiredAccount>,
}

pub fn run(ctx: &Context, format: ListFormat, target: Option<&str>) -> Result<()> {
    // Listing works without a config; the defaults point at the host databases.
    let config = match RosterConfig::load(ctx.config.as_deref()) {
        Ok((config, _)) => config,
        Err(e) if ctx.config.is_none() => {
            log::debug!("no config, using defaults: {e:#}");
            RosterConfig::default()
        }
        Err(e) => return Err(e),
    };

    let mut pass = engine::open_pass(&config);
    let users = pass
        .observed()
        .context("Failed to read account databases")?
        .into_iter()
        .filter(|u| matches_filter(&u.name, target))
        .collect();

    println!("{}", render(&Listing { users }, format)?);
    Ok(())
}

fn render(listing: &Listing, format: ListFormat) -> Result<String> {
    Ok(match format {
        ListFormat::Toml => toml::to_string_pretty(listing).context("Failed to render TOML")?,
        ListFormat::Json => {
            serde_json::to_string_pretty(listing).context("Failed to render JSON")?
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;
    use acctkit::RawValue;

    fn listing() -> Listing {
        let mut bob = DesiredAccount::new("bob")
            .with_comment("Bob S.")
            .with_groups("wheel,dev")
            .with_gid(1001);
        bob.uid = Some(RawValue::Int(1001));
        Listing { users: vec![bob] }
    }

    #[test]
    fn test_toml_listing_loads_as_config() {
        let text = render(&listing(), ListFormat::Toml).unwrap();
        let config = RosterConfig::parse(&text, ConfigFormat::Toml).unwrap();
        assert_eq!(config.users, listing().users);
    }

    #[test]
    fn test_json_listing() {
        let text = render(&listing(), ListFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["users"][0]["name"], "bob");
        assert_eq!(value["users"][0]["gid"], 1001);
        assert!(value["users"][0].get("password").is_none());
    }
}
