use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tokio::task::JoinHandle;

use weatherdash_core::App;
use weatherdash_ui::{DashboardController, FilePreferences, UiState, UiStateStore};
use weatherdash_weather::{
    daily_summary, format_last_updated, format_temperature, next_hours, RetryPolicy,
    WeatherCache, WeatherClient, NEXT_DAY_STEPS,
};

const USAGE: &str = "\
Usage: weatherdash <command>

Commands:
  serve                 Run the /api/weather proxy
  fetch [city]          Print current weather and forecast once
  watch [city]          Print, then keep refreshing on the auto-refresh timer
  unit                  Toggle between Celsius and Fahrenheit
  auto-refresh          Toggle the auto-refresh timer";

/// Cache, client, store and controller wired from the app configuration
struct Dashboard {
    store: Arc<UiStateStore>,
    controller: Arc<DashboardController>,
    sweeper: JoinHandle<()>,
}

impl Dashboard {
    fn build(app: &App) -> Result<Self> {
        let config = app.config();

        let cache = Arc::new(WeatherCache::new());
        let sweeper = WeatherCache::spawn_sweeper(
            cache.clone(),
            config.cache.sweep_interval(),
            app.task_token(),
        );

        let client = WeatherClient::new(&config.proxy.base_url, cache)
            .context("Failed to build weather client")?
            .with_retry_policy(RetryPolicy::new(
                config.retry.max_attempts,
                config.retry.base_delay_ms,
            ))
            .with_ttls(config.cache.current_ttl(), config.cache.forecast_ttl());

        let store = Arc::new(UiStateStore::new(
            Arc::new(FilePreferences::new(config.preferences_path())),
            config.refresh.interval(),
            app.task_token(),
        ));
        let controller =
            DashboardController::new(client, store.clone(), &config.refresh.default_city);
        controller.register();

        Ok(Self {
            store,
            controller,
            sweeper,
        })
    }

    fn print(&self) {
        let state = self.store.snapshot();
        render(&self.controller, &state);
    }

    async fn shutdown(self, app: &App) {
        self.store.shutdown();
        app.shutdown();
        if let Err(e) = self.sweeper.await {
            tracing::debug!("Cache sweeper did not exit cleanly: {}", e);
        }
    }
}

fn render(controller: &DashboardController, state: &UiState) {
    if let Some(error) = &state.error {
        println!("Error: {}", error);
        if state.retry_count > 0 {
            println!("  (failed {} time(s))", state.retry_count);
        }
    }

    if let Some(current) = controller.current() {
        let description = current
            .condition()
            .map(|c| c.description.as_str())
            .unwrap_or("");
        println!("{}", current.location_label());
        println!(
            "  {}  {}  (feels like {})",
            format_temperature(current.main.temp, state.unit),
            description,
            format_temperature(current.main.feels_like, state.unit)
        );
        println!(
            "  humidity {}%  wind {} m/s  pressure {} hPa",
            current.main.humidity, current.wind.speed, current.main.pressure
        );
    }

    if let Some(forecast) = controller.forecast() {
        println!("\nNext 24 hours:");
        for entry in next_hours(&forecast, NEXT_DAY_STEPS) {
            let time = entry
                .timestamp()
                .map(|ts| ts.format("%H:%M").to_string())
                .unwrap_or_else(|| entry.dt_txt.clone());
            println!("  {}  {}", time, format_temperature(entry.main.temp, state.unit));
        }

        println!("\nDaily:");
        for day in daily_summary(&forecast) {
            let description = day
                .representative
                .condition()
                .map(|c| c.description.as_str())
                .unwrap_or("");
            println!(
                "  {}  {} / {}  {}",
                day.date.format("%a %b %-d"),
                format_temperature(day.max_temp, state.unit),
                format_temperature(day.min_temp, state.unit),
                description
            );
        }
    }

    println!(
        "\nLast updated: {}  (auto-refresh {})",
        format_last_updated(state.last_updated, Utc::now()),
        if state.auto_refresh { "on" } else { "off" }
    );
}

async fn fetch(app: &App, city: Option<String>, watch: bool) -> Result<()> {
    let dashboard = Dashboard::build(app)?;
    let city = city.unwrap_or_else(|| app.config().refresh.default_city.clone());

    let loaded = dashboard.controller.refresh(&city).await;
    dashboard.print();

    if watch {
        let mut updates = dashboard.store.subscribe();
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = updates.borrow_and_update().clone();
                    if !state.is_loading {
                        println!();
                        render(&dashboard.controller, &state);
                    }
                }
            }
        }
    }

    dashboard.shutdown(app).await;
    if !loaded && !watch {
        bail!("Could not load weather for {}", city);
    }
    Ok(())
}

async fn serve(app: &App) -> Result<()> {
    let (_, server) = weatherdash_proxy::spawn_from_config(app.config(), app.task_token())?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    app.shutdown();
    server.await.context("Proxy task failed")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    weatherdash_core::init()?;

    let mut args = std::env::args().skip(1);
    let command = args.next();
    let argument = args.next();

    let app = App::new()?;
    tracing::info!(
        config_dir = %app.config().config_dir.display(),
        "weatherdash started"
    );

    match command.as_deref() {
        Some("serve") => serve(&app).await,
        Some("fetch") => fetch(&app, argument, false).await,
        Some("watch") => fetch(&app, argument, true).await,
        Some("unit") => {
            let dashboard = Dashboard::build(&app)?;
            let unit = dashboard.store.toggle_unit();
            println!("Temperature unit: {}", unit.as_str());
            dashboard.shutdown(&app).await;
            Ok(())
        }
        Some("auto-refresh") => {
            let dashboard = Dashboard::build(&app)?;
            let enabled = dashboard.store.toggle_auto_refresh();
            println!("Auto-refresh: {}", if enabled { "on" } else { "off" });
            dashboard.shutdown(&app).await;
            Ok(())
        }
        Some(other) => {
            eprintln!("{}", USAGE);
            bail!("Unknown command: {}", other)
        }
        None => {
            println!("{}", USAGE);
            Ok(())
        }
    }
}
