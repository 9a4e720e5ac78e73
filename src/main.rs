use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use tracing::{debug, info};

use tripsky::amap::{AlongRouteOptions, provinces_along_route};
use tripsky::{
    DisasterClient, DistrictSource, LocationInput, LocationResolver, QWeatherClient,
    TripSkyConfig, TripSkyError, group_by_province, load_amap, load_provinces, make_linear_scale,
};

/// Cold to hot, used to shade route segments by current temperature
const TEMPERATURE_COLORS: [&str; 5] = ["#313695", "#74add1", "#ffffbf", "#f46d43", "#a50026"];

#[derive(Debug, Parser)]
#[command(name = "tripsky", version, about = "Weather and province breakdown along driving routes")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve an address (or pass through "lng,lat") to coordinates
    Geocode { input: String },

    /// Plan a drive and split it by province
    Route {
        from: String,
        to: String,
        /// Fetch current weather at each segment midpoint
        #[arg(long)]
        weather: bool,
    },

    /// Current weather and 3-day forecast
    #[command(allow_negative_numbers = true)]
    Weather { lon: f64, lat: f64 },

    /// Hourly forecast for the next 24 hours
    #[command(allow_negative_numbers = true)]
    Hourly { lon: f64, lat: f64 },

    /// Active disaster warnings
    #[command(allow_negative_numbers = true)]
    Warnings { lon: f64, lat: f64 },

    /// Provinces a drive passes through, from AMap district boundaries
    Provinces { from: String, to: String },

    /// Print the AMap JS loader URL
    ScriptUrl,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = TripSkyConfig::load_from_path(cli.config.clone())
        .context("Failed to load configuration")?;
    tripsky::logging::init(&config.logging, cli.verbose)?;
    debug!(?cli, "Parsed command line");

    let result = run(cli.command, &config).await;
    if let Err(e) = &result
        && let Some(err) = e.downcast_ref::<TripSkyError>()
    {
        eprintln!("{}", err.user_message());
    }
    result
}

async fn run(command: Command, config: &TripSkyConfig) -> Result<()> {
    match command {
        Command::Geocode { input } => geocode(config, &input).await,
        Command::Route { from, to, weather } => route(config, &from, &to, weather).await,
        Command::Weather { lon, lat } => current_weather(config, lon, lat).await,
        Command::Hourly { lon, lat } => hourly(config, lon, lat).await,
        Command::Warnings { lon, lat } => warnings(config, lon, lat).await,
        Command::Provinces { from, to } => provinces(config, &from, &to).await,
        Command::ScriptUrl => script_url(config).await,
    }
}

async fn geocode(config: &TripSkyConfig, input: &str) -> Result<()> {
    let point = match LocationInput::parse(input) {
        LocationInput::Coordinates(point) => point,
        LocationInput::Address(address) => {
            let sdk = load_amap(&config.amap).await?;
            sdk.geocode(&address).await?
        }
    };
    println!("{point}");
    Ok(())
}

async fn route(config: &TripSkyConfig, from: &str, to: &str, with_weather: bool) -> Result<()> {
    let sdk = load_amap(&config.amap).await?;
    let (origin, dest) = LocationResolver::resolve_endpoints(&sdk, from, to).await?;
    let plan = sdk.plan_driving(origin, dest).await?;

    println!(
        "{from} -> {to}: {:.1} km, {:.0} min, {} points",
        plan.distance / 1000.0,
        plan.duration / 60.0,
        plan.path.len()
    );

    let collection = load_provinces(&config.route.provinces_geojson)
        .await
        .with_context(|| format!("Failed to load provinces from {}", config.route.provinces_geojson))?;
    let segments = group_by_province(
        &collection,
        &plan.path,
        config.route.sample_step_meters,
        &config.route.province_name_property,
    )?;
    info!(segments = segments.len(), "Route split by province");

    if !with_weather {
        for segment in &segments {
            println!("  {} ({} samples, mid {})", segment.province, segment.path.len(), segment.mid);
        }
        return Ok(());
    }

    let client = QWeatherClient::new(&config.qweather)?;
    let weather = join_all(
        segments
            .iter()
            .map(|s| client.fetch_weather_by_location(s.mid.lng, s.mid.lat)),
    )
    .await;

    let temps: Vec<f64> = weather
        .iter()
        .filter_map(|w| w.as_ref().and_then(|w| w.now.temperature()))
        .collect();
    let (min, max) = temps
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| (lo.min(*t), hi.max(*t)));
    let scale = if temps.is_empty() {
        None
    } else {
        Some(make_linear_scale(min, max, &TEMPERATURE_COLORS)?)
    };

    for (segment, info) in segments.iter().zip(&weather) {
        match (info, &scale) {
            (Some(info), Some(scale)) => {
                let temp = info.now.temperature().unwrap_or(f64::NAN);
                println!(
                    "  {}: {} {}°C {}",
                    segment.province,
                    info.now.text,
                    info.now.temp,
                    scale.color(temp)
                );
            }
            _ => println!("  {}: no weather", segment.province),
        }
    }
    Ok(())
}

async fn current_weather(config: &TripSkyConfig, lon: f64, lat: f64) -> Result<()> {
    let client = QWeatherClient::new(&config.qweather)?;
    let Some(info) = client.weather_by_location(lon, lat).await? else {
        bail!("No weather available for {lon},{lat}");
    };

    let place = [info.now.province.as_deref(), info.now.city.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    println!("{place}: {} {}°C, humidity {}%", info.now.text, info.now.temp, info.now.humidity);
    for day in &info.daily {
        let date = day
            .date()
            .map_or_else(|| day.fx_date.clone(), |d| d.format("%m-%d %a").to_string());
        println!("  {date} {} {}..{}°C", day.text_day, day.temp_min, day.temp_max);
    }
    Ok(())
}

async fn hourly(config: &TripSkyConfig, lon: f64, lat: f64) -> Result<()> {
    let client = QWeatherClient::new(&config.qweather)?;
    for hour in client.hourly_24h(lon, lat).await? {
        let time = hour
            .forecast_time()
            .map_or_else(|| hour.fx_time.clone(), |t| t.format("%H:%M").to_string());
        println!("{time} {} {}°C", hour.text, hour.temp);
    }
    Ok(())
}

async fn warnings(config: &TripSkyConfig, lon: f64, lat: f64) -> Result<()> {
    let client = DisasterClient::new(&config.qweather)?;
    let warnings = client.warnings(lon, lat).await?;
    if warnings.is_empty() {
        println!("No active warnings");
    }
    for warning in warnings {
        println!("[{}] {} ({})", warning.level, warning.title, warning.kind);
    }
    Ok(())
}

async fn provinces(config: &TripSkyConfig, from: &str, to: &str) -> Result<()> {
    let sdk = load_amap(&config.amap).await?;
    let (origin, dest) = LocationResolver::resolve_endpoints(&sdk, from, to).await?;
    let plan = sdk.plan_driving(origin, dest).await?;

    let search = sdk.district_search();
    let all = search.province_list().await?;
    let hit = provinces_along_route(
        &search,
        &plan.path,
        &all,
        AlongRouteOptions::from(&config.route),
    )
    .await?;

    for province in hit {
        println!("{} ({})", province.name, province.adcode);
    }
    Ok(())
}

async fn script_url(config: &TripSkyConfig) -> Result<()> {
    let sdk = load_amap(&config.amap).await?;
    println!("{}", sdk.script_url());
    if let Some(security) = sdk.security_config() {
        println!("{}", serde_json::to_string(&security)?);
    }
    Ok(())
}
