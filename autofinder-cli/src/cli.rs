use anyhow::{Context, anyhow};
use autofinder_core::{
    CancellationToken, CarSearcher, CityId, Config, Coordinate, Found, SearchOutcome,
    SearchRequest, VehicleTypeFilter, search::API_DATE_FORMAT,
};
use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};
use inquire::{CustomType, Text};
use tokio::sync::oneshot;
use tracing::info;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "autofinder", version, about = "Wait for a shared car to become available nearby")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` overrides it.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set API host, polling cadence and search defaults.
    Configure,

    /// Wait for a free-floating car parked around a point.
    Flex {
        #[command(flatten)]
        area: AreaArgs,
    },

    /// Wait for a bookable station slot around a point.
    Station {
        #[command(flatten)]
        area: AreaArgs,

        /// Reservation start, e.g. 2024-05-01T08:00:00.
        #[arg(long, value_parser = parse_date)]
        start: NaiveDateTime,

        /// Reservation end, e.g. 2024-05-01T18:00:00.
        #[arg(long, value_parser = parse_date)]
        end: NaiveDateTime,

        /// One of: all, family, utility, minivan.
        #[arg(long, default_value = "all")]
        vehicle_type: VehicleTypeFilter,
    },
}

#[derive(Debug, Args)]
pub struct AreaArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,

    /// City id; falls back to the configured default.
    #[arg(long)]
    pub city: Option<CityId>,

    /// Search radius in km; falls back to the configured default.
    #[arg(long)]
    pub margin: Option<f64>,
}

impl AreaArgs {
    fn resolve(&self, config: &Config) -> anyhow::Result<(CityId, Coordinate, f64)> {
        let city = match self.city {
            Some(city) => city,
            None => config.default_city_id()?,
        };
        let margin = self.margin.unwrap_or_else(|| config.margin_km());
        if !(margin.is_finite() && margin > 0.0) {
            return Err(anyhow!("Search margin must be a positive number of km, got {margin}"));
        }

        Ok((city, Coordinate::new(self.lat, self.lon), margin))
    }
}

fn parse_date(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, API_DATE_FORMAT)
        .map_err(|e| format!("expected YYYY-MM-DDTHH:MM:SS ({e})"))
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Flex { area } => {
                let config = Config::load()?;
                let (city, coordinate, margin) = area.resolve(&config)?;
                let request = SearchRequest::flex(city, coordinate, margin);
                report(wait_for_car(&config, request).await?)
            }
            Command::Station { area, start, end, vehicle_type } => {
                if end <= start {
                    return Err(anyhow!("Reservation end ({end}) must be after start ({start})"));
                }
                let config = Config::load()?;
                let (city, coordinate, margin) = area.resolve(&config)?;
                let request =
                    SearchRequest::station(city, coordinate, margin, start, end, vehicle_type);
                report(wait_for_car(&config, request).await?)
            }
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let base_url = Text::new("Availability API base URL:")
        .with_default(config.api_base_url())
        .prompt()
        .context("Configuration aborted")?;

    let poll_interval_secs = CustomType::<f64>::new("Seconds between two API calls:")
        .with_default(config.poll_interval().as_secs_f64())
        .with_error_message("Please type a number")
        .prompt()
        .context("Configuration aborted")?;

    let mut city_prompt = CustomType::<u32>::new("Default city id:")
        .with_error_message("Please type a positive integer");
    if let Some(city) = config.default_city_id {
        city_prompt = city_prompt.with_default(city.0);
    }
    let city = city_prompt.prompt().context("Configuration aborted")?;

    let margin = CustomType::<f64>::new("Default search radius (km):")
        .with_default(config.margin_km())
        .with_error_message("Please type a number")
        .prompt()
        .context("Configuration aborted")?;

    config.api_base_url = Some(base_url);
    config.poll_interval_secs = Some(poll_interval_secs);
    config.default_city_id = Some(CityId(city));
    config.default_margin_km = Some(margin);
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

/// Run the search in the background until it reports, cancelling it on Ctrl-C.
async fn wait_for_car(config: &Config, request: SearchRequest) -> anyhow::Result<SearchOutcome> {
    let searcher = CarSearcher::from_config(config)?;
    let cancel = CancellationToken::new();
    let (tx, rx) = oneshot::channel();

    let Coordinate { latitude, longitude } = request.coordinate;
    println!("Searching around ({latitude}, {longitude})... press Ctrl-C to stop.");

    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, cancelling search");
                cancel.cancel();
            }
        })
    };

    tokio::spawn(async move { searcher.search_task(request, tx, cancel).await });

    let outcome = rx.await.context("Search ended without reporting a result")?;
    interrupt.abort();

    Ok(outcome)
}

fn report(outcome: SearchOutcome) -> anyhow::Result<()> {
    match outcome {
        SearchOutcome::Found(Found::Vehicle { vehicle_id }) => {
            println!("Vehicle {vehicle_id} is available nearby.");
            Ok(())
        }
        SearchOutcome::Found(Found::Stations { count }) => {
            println!("{count} station slot(s) can be booked.");
            Ok(())
        }
        SearchOutcome::Cancelled => {
            println!("Search cancelled.");
            Ok(())
        }
        SearchOutcome::Failed { reason } => Err(anyhow!("Search failed: {reason}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_flex_with_negative_longitude() {
        let cli = Cli::parse_from([
            "autofinder", "flex", "--lat", "45.5", "--lon", "-73.57", "--city", "59",
        ]);

        match cli.command {
            Command::Flex { area } => {
                assert_eq!(area.lon, -73.57);
                assert_eq!(area.city, Some(CityId(59)));
                assert_eq!(area.margin, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_station_dates_and_type() {
        let cli = Cli::parse_from([
            "autofinder",
            "station",
            "--lat",
            "45.5",
            "--lon",
            "-73.57",
            "--start",
            "2024-05-01T08:00:00",
            "--end",
            "2024-05-01T18:00:00",
            "--vehicle-type",
            "minivan",
        ]);

        match cli.command {
            Command::Station { start, end, vehicle_type, .. } => {
                assert_eq!(start.format(API_DATE_FORMAT).to_string(), "2024-05-01T08:00:00");
                assert!(end > start);
                assert_eq!(vehicle_type, VehicleTypeFilter::MiniVan);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_date() {
        let res = Cli::try_parse_from([
            "autofinder", "station", "--lat", "1", "--lon", "2", "--start", "tomorrow", "--end",
            "2024-05-01T18:00:00",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn area_uses_config_defaults() {
        let area = AreaArgs { lat: 45.5, lon: -73.57, city: None, margin: None };
        let config = Config { default_city_id: Some(CityId(59)), ..Config::default() };

        let (city, coordinate, margin) = area.resolve(&config).unwrap();
        assert_eq!(city, CityId(59));
        assert_eq!(coordinate, Coordinate::new(45.5, -73.57));
        assert_eq!(margin, config.margin_km());
    }

    #[test]
    fn area_without_city_errors() {
        let area = AreaArgs { lat: 45.5, lon: -73.57, city: None, margin: Some(1.0) };
        let err = area.resolve(&Config::default()).unwrap_err();
        assert!(err.to_string().contains("No city configured"));
    }

    #[test]
    fn failed_outcome_is_an_error() {
        assert!(report(SearchOutcome::Cancelled).is_ok());
        let err = report(SearchOutcome::Failed { reason: "status 500".into() }).unwrap_err();
        assert!(err.to_string().contains("status 500"));
    }
}
