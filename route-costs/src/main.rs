use std::error::Error;

use chrono::NaiveDate;
use tracing::info;
use tracing_subscriber::EnvFilter;

use route_costs::cache::{FileCacheConfig, FileDataCache};
use route_costs::domain::{
    DateRange, DaysOfWeek, LocationSet, Route, RouteId, StationId, TimeRange, TransportMode,
};
use route_costs::repository::{InMemoryNetwork, Repositories};
use route_costs::routes::{RouteConnectivity, RouteMatrixConfig, UNREACHABLE};

/// A small tram and bus network around a city centre.
fn sample_network() -> Result<InMemoryNetwork, Box<dyn Error>> {
    let year = DateRange::new(
        NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("bad start date")?,
        NaiveDate::from_ymd_opt(2024, 12, 31).ok_or("bad end date")?,
    )?;
    let route = |id: &str, name: &str, mode: TransportMode, days: DaysOfWeek| {
        RouteId::new(id).map(|id| Route::new(id, name, mode, year, days))
    };

    Ok(InMemoryNetwork::builder()
        .route(route("BLUE", "Altrincham - Bury", TransportMode::Tram, DaysOfWeek::all())?)
        .route(route("GREEN", "Eccles - Ashton", TransportMode::Tram, DaysOfWeek::all())?)
        .route(route("PINK", "Airport - Victoria", TransportMode::Tram, DaysOfWeek::all())?)
        .route(route("X50", "Trafford - Piccadilly", TransportMode::Bus, DaysOfWeek::weekdays())?)
        .pickup_only("ALTRINCHAM", "BLUE")
        .stop("DEANSGATE", "BLUE")
        .stop("DEANSGATE", "GREEN")
        .stop("DEANSGATE", "X50")
        .dropoff_only("BURY", "BLUE")
        .pickup_only("ECCLES", "GREEN")
        .stop("PICCADILLY", "GREEN")
        .stop("PICCADILLY", "X50")
        .dropoff_only("ASHTON", "GREEN")
        .pickup_only("AIRPORT", "PINK")
        .stop("CORNBROOK", "PINK")
        .stop("CORNBROOK", "BLUE")
        .dropoff_only("VICTORIA", "PINK")
        .pickup_only("TRAFFORD", "X50")
        .neighbours("VICTORIA", "BURY")
        .build())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cache_dir = std::env::var("ROUTE_CACHE_DIR").unwrap_or_else(|_| "cache".to_string());
    let connectivity = RouteConnectivity::start(
        Repositories::from_network(sample_network()?),
        FileDataCache::new(FileCacheConfig::new(cache_dir)),
        RouteMatrixConfig::default(),
    )?;
    let costs = connectivity.costs();
    info!(connections = costs.size(), "route connectivity ready");

    let date = NaiveDate::from_ymd_opt(2024, 3, 15).ok_or("bad query date")?;
    let time_range = TimeRange::parse("08:00", "10:00")?;
    let modes = TransportMode::all();

    for (from, to) in [
        ("ALTRINCHAM", "BURY"),
        ("ALTRINCHAM", "ASHTON"),
        ("AIRPORT", "ASHTON"),
        ("ECCLES", "VICTORIA"),
        ("TRAFFORD", "ASHTON"),
    ] {
        let changes = costs.number_of_changes(
            &StationId::new(from)?,
            &StationId::new(to)?,
            date,
            &time_range,
            &modes,
        )?;
        if changes == UNREACHABLE {
            println!("{from} -> {to}: unreachable");
        } else {
            println!("{from} -> {to}: {changes} change(s)");
        }
    }

    let destinations: LocationSet = [StationId::new("ASHTON")?].into_iter().collect();
    let ranking = costs.lowest_cost_calculator_for(&destinations, date, &time_range, &modes)?;
    let ranked = ranking.sort_by_destinations(connectivity.index().routes().cloned())?;
    println!(
        "Routes by changes to ASHTON: {}",
        ranked
            .iter()
            .map(|route| route.id().as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    connectivity.stop()?;
    Ok(())
}
