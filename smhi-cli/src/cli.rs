use std::sync::Arc;

use anyhow::{Context, anyhow};
use chrono::Utc;
use clap::{Parser, Subcommand};
use inquire::{CustomType, Text};
use smhi_core::{
    ATTRIBUTION, Config, Coordinator, LocationConfig, LocationRegistry, SetupError, SmhiFetcher,
    daily::local_date, validate_location,
};
use tracing::info;

use crate::render::{render_current, render_forecast};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "smhi", version, about = "SMHI point forecasts in your terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add a forecast location. Missing values are asked for interactively.
    Add {
        /// Name to refer to the location by, e.g. "home".
        name: Option<String>,

        /// Latitude in decimal degrees.
        #[arg(long, allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude in decimal degrees.
        #[arg(long, allow_negative_numbers = true)]
        lon: Option<f64>,
    },

    /// Remove a configured location.
    Remove { name: String },

    /// List configured locations.
    List,

    /// Fetch and show the forecast for a location.
    Show {
        /// Location name; defaults to the first configured one.
        name: Option<String>,

        /// Number of days in the daily forecast.
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u8).range(1..=10))]
        days: u8,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Keep a location refreshed and reprint it after every update.
    Watch {
        /// Location name; defaults to the first configured one.
        name: Option<String>,

        #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=10))]
        days: u8,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load()?;

        match self.command {
            Command::Add { name, lat, lon } => add(&mut config, name, lat, lon).await?,
            Command::Remove { name } => {
                config
                    .remove_location(&name)
                    .ok_or_else(|| anyhow!("No location named '{name}'."))?;
                config.save()?;
                println!("Removed '{name}'.");
            }
            Command::List => list(&config),
            Command::Show { name, days, json } => {
                show(&config, name.as_deref(), usize::from(days), json).await?
            }
            Command::Watch { name, days } => {
                watch(&config, name.as_deref(), usize::from(days)).await?
            }
        }

        Ok(())
    }
}

fn setup_error(err: SetupError) -> anyhow::Error {
    let message = err.user_message();
    anyhow::Error::new(err).context(message)
}

async fn add(
    config: &mut Config,
    name: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
) -> anyhow::Result<()> {
    let name = match name {
        Some(name) => name,
        None => Text::new("Location name:").with_default("home").prompt()?,
    };
    let latitude = match lat {
        Some(lat) => lat,
        None => CustomType::<f64>::new("Latitude:")
            .with_help_message("Decimal degrees, e.g. 59.3293")
            .with_error_message("Please type a number")
            .prompt()?,
    };
    let longitude = match lon {
        Some(lon) => lon,
        None => CustomType::<f64>::new("Longitude:")
            .with_help_message("Decimal degrees, e.g. 18.0686")
            .with_error_message("Please type a number")
            .prompt()?,
    };

    let location = LocationConfig::new(name, latitude, longitude);

    // Check uniqueness before spending a request on it.
    let mut updated = config.clone();
    updated.add_location(location.clone())?;

    let fetcher = SmhiFetcher::from_config(&config.provider)?;
    validate_location(&fetcher, &location)
        .await
        .map_err(setup_error)?;

    updated.save()?;
    *config = updated;

    info!(location = %location.name, "Location added");
    println!(
        "Added '{}' at {}.",
        location.name,
        location.coordinates()
    );
    Ok(())
}

fn list(config: &Config) {
    if config.locations.is_empty() {
        println!("No locations configured.");
        println!("Hint: run `smhi add <name> --lat <latitude> --lon <longitude>`.");
        return;
    }

    for location in &config.locations {
        println!("{:<16} {}", location.name, location.coordinates());
    }
}

async fn show(config: &Config, name: Option<&str>, days: usize, json: bool) -> anyhow::Result<()> {
    let location = config.resolve_location(name)?;
    let tz = config.provider.timezone()?;
    let fetcher = SmhiFetcher::from_config(&config.provider)?;
    let coordinator = Coordinator::new(
        location.name.clone(),
        location.coordinates(),
        tz,
        Arc::new(fetcher),
    );

    coordinator
        .first_refresh()
        .await
        .with_context(|| format!("Failed to fetch forecast for '{}'", location.name))?;

    let current = coordinator.current_conditions();
    let forecast = coordinator.daily_forecast(days);

    if json {
        let out = serde_json::json!({
            "location": location.name,
            "latitude": location.latitude,
            "longitude": location.longitude,
            "timezone": tz.name(),
            "current": current,
            "daily": forecast,
            "attribution": ATTRIBUTION,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let today = local_date(&Utc::now(), &tz);
    println!("{}", render_current(&location.name, current.as_ref(), &tz));
    println!();
    println!("{}", render_forecast(&forecast, today));
    println!();
    println!("{ATTRIBUTION}");
    Ok(())
}

fn print_update(coordinator: &Coordinator, days: usize) {
    let tz = coordinator.timezone();
    let today = local_date(&Utc::now(), &tz);

    if !coordinator.is_available() {
        let reason = coordinator
            .snapshot()
            .last_error
            .as_ref()
            .map(|err| err.to_string())
            .unwrap_or_else(|| "no data yet".to_string());
        println!("[{}] unavailable: {reason}", coordinator.name());
    }

    println!(
        "{}",
        render_current(
            coordinator.name(),
            coordinator.current_conditions().as_ref(),
            &tz
        )
    );
    println!("{}", render_forecast(&coordinator.daily_forecast(days), today));
    println!();
}

async fn watch(config: &Config, name: Option<&str>, days: usize) -> anyhow::Result<()> {
    let location = config.resolve_location(name)?;
    let mut registry = LocationRegistry::from_config(&config.provider)?;

    let id = registry.setup(location).await.map_err(setup_error)?;
    let coordinator = registry
        .get(id)
        .cloned()
        .ok_or_else(|| anyhow!("Location '{}' vanished during setup", location.name))?;

    print_update(&coordinator, days);

    let subscription = {
        let view = coordinator.clone();
        coordinator.subscribe(move || print_update(&view, days))
    };

    println!(
        "Refreshing every {} minutes. Press Ctrl-C to stop.",
        config.provider.refresh_interval().as_secs() / 60
    );
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    subscription.unsubscribe();
    registry.unload(id);
    Ok(())
}
