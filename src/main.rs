//! routecopilot cli - Replay recorded drives against a route with voice guidance

use std::fs::{self, File};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use argopt::{cmd_group, subcmd};
use csv::Reader;
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use routecopilot::geometry::{format_distance, format_duration};
use routecopilot::sources::{
    builtin_zones, CsvSource, FallbackRoutes, GpxRouteProvider, GpxTrackSource, KmlZoneSource,
};
use routecopilot::{
    ConsoleSpeaker, FieldsConfiguration, GeoZone, GeoZoneSource, LocationSource,
    NavigationOptions, NavigationSession, Route, RouteProvider, SegmentBuilder, SharedSession,
    VehicleClass, ZoneArea,
};

/// CLI of routecopilot - Voice guidance and speed zones for haul roads
#[cmd_group(commands = [segments, simulate, zones])]
fn main() -> Result<(), String> {}

/// Print the legs of a route
#[subcmd]
fn segments(
    /// GPX file with the route, or the id of a built-in fallback route
    route: String,
    /// Route id or name inside the GPX file. Default: the first one
    #[opt(long)]
    route_id: Option<String>,
    /// Fields and navigation configuration. Default: .routecopilot.yaml, ~/.routecopilot.yaml
    #[opt(long)]
    config: Option<String>,
) -> Result<(), String> {
    let conf = setup(config);

    let route = load_route(&route, route_id)?;

    let segments = SegmentBuilder::new(route.name.clone())
        .radius(conf.navigation.arrival_radius_m)
        .warning_distance(conf.navigation.warning_distance_m)
        .build(&route.waypoints);

    println!(
        "{} ({}, {} legs)",
        route.name,
        format_distance(route.total_distance()),
        segments.len()
    );
    for seg in &segments {
        println!(
            "  {}: {} [{}, limit {} km/h]",
            seg.name,
            seg.instruction,
            format_distance(seg.length()),
            seg.speed_limit.unwrap_or_default()
        );
    }

    Ok(())
}

/// Replay a recorded drive against a route and print every announcement
#[subcmd]
fn simulate(
    /// GPX file with the route, or the id of a built-in fallback route
    route: String,
    /// Recorded fixes: a CSV file or a GPX track
    recording: String,
    /// Route id or name inside the GPX file. Default: the first one
    #[opt(long)]
    route_id: Option<String>,
    /// KML file with the speed zones
    #[opt(long)]
    zones: Option<String>,
    /// Use the built-in corridor speed zones
    #[opt(long)]
    corridor_zones: bool,
    /// Only replay the fixes of this device (CSV recordings)
    #[opt(long)]
    device: Option<String>,
    /// Vehicle class picking the zone limits: light, personnel, empty, loaded, hazmat
    #[opt(long)]
    class: Option<String>,
    /// Fields and navigation configuration. Default: .routecopilot.yaml, ~/.routecopilot.yaml
    #[opt(long)]
    config: Option<String>,
) -> Result<(), String> {
    let mut conf = setup(config);

    if let Some(class) = class {
        conf.navigation.vehicle_class =
            VehicleClass::parse(&class).ok_or(format!("Unknown vehicle class: {}", class))?;
    }

    let route = load_route(&route, route_id)?;

    let mut session = NavigationSession::new(conf.navigation, Box::new(ConsoleSpeaker::new("> ")));

    if let Some(path) = zones {
        let mut source = KmlZoneSource::open(path)
            .map_err(|e| format!("Failed on open the KML file: {}", e))?;
        session
            .load_zones_from(&mut source)
            .map_err(|e| format!("Failed on load the zones: {}", e))?;
    } else if corridor_zones {
        session.load_zones(Arc::new(builtin_zones()));
    }

    let mut source: Box<dyn LocationSource> = if is_gpx(&recording) {
        Box::new(
            GpxTrackSource::open(&recording)
                .map_err(|e| format!("Failed on read the GPX track: {}", e))?,
        )
    } else {
        let csv = File::open(&recording)
            .map_err(|e| format!("Failed on open the CSV file: {}", e))?;
        let mut source = CsvSource::new(Reader::from_reader(csv), Some(conf.fields));
        if let Some(device) = device {
            source = source.device(&device);
        }
        Box::new(source)
    };

    let shared = SharedSession::new(session);
    shared.start(&route);

    let running = AtomicBool::new(true);
    let count = shared
        .drive(source.as_mut(), &running)
        .map_err(|e| format!("Failed on replay the recording: {}", e))?;

    let snapshot = shared.watch().latest();
    info!(fixes = count, "Replay finished");

    println!(
        "{} fixes, {}/{} legs, {} left (~{})",
        count,
        snapshot.current_segment_index,
        snapshot.segment_count,
        format_distance(snapshot.remaining_distance_m),
        format_duration(snapshot.estimated_time_remaining_hours)
    );

    Ok(())
}

/// List speed zones
#[subcmd]
fn zones(
    /// KML file with the speed zones. Default: the built-in corridor zones
    #[opt(long)]
    kml: Option<String>,
    /// Vehicle class picking the zone limits: light, personnel, empty, loaded, hazmat
    #[opt(long)]
    class: Option<String>,
    /// Fields and navigation configuration. Default: .routecopilot.yaml, ~/.routecopilot.yaml
    #[opt(long)]
    config: Option<String>,
) -> Result<(), String> {
    let conf = setup(config);

    let class = match class {
        Some(c) => VehicleClass::parse(&c).ok_or(format!("Unknown vehicle class: {}", c))?,
        None => conf.navigation.vehicle_class,
    };

    let zones: Vec<GeoZone> = match kml {
        Some(path) => KmlZoneSource::open(path)
            .and_then(|mut s| s.zones())
            .map_err(|e| format!("Failed on load the zones: {}", e))?,
        None => builtin_zones(),
    };

    for zone in &zones {
        let area = match &zone.area {
            ZoneArea::Polygon(points) => format!("polygon, {} points", points.len()),
            ZoneArea::Circle { radius_m, .. } => {
                format!("circle, radius {}", format_distance(*radius_m))
            }
        };
        let limit = match zone.limit_for(class) {
            Some(l) => format!("{} km/h", l),
            None => "no limit".to_string(),
        };

        println!("{} ({}): {} [{}]", zone.name, zone.id, limit, area);
    }

    Ok(())
}

fn is_gpx(path: &str) -> bool {
    path.to_lowercase().ends_with(".gpx")
}

/// Route from a GPX file, or else from the built-in fallback routes
fn load_route(route: &str, route_id: Option<String>) -> Result<Route, String> {
    if !is_gpx(route) {
        return FallbackRoutes::new()
            .route(route)
            .map_err(|e| e.to_string())?
            .ok_or(format!("Unknown route: {}", route));
    }

    let provider =
        GpxRouteProvider::open(route).map_err(|e| format!("Failed on read the GPX file: {}", e))?;

    match route_id {
        Some(id) => provider
            .route(&id)
            .map_err(|e| e.to_string())?
            .ok_or(format!("Route not found in the GPX file: {}", id)),
        None => provider
            .routes()
            .first()
            .cloned()
            .ok_or("No route in the GPX file".to_string()),
    }
}

/// Install the log subscriber and load the current config
fn setup(provided: Option<String>) -> Configs {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    load_configs(provided)
}

/// Load the current config
fn load_configs(provided: Option<String>) -> Configs {
    let mut options = vec![];

    if let Some(sprovided) = provided {
        options.push(sprovided);
    }

    options.push(".routecopilot.yaml".to_string());

    if let Some(home) = dirs::home_dir() {
        if let Some(shome) = home.to_str() {
            options.push(format!("{}/.routecopilot.yaml", shome));
        }
    }

    for fi in options {
        let Ok(s) = fs::read_to_string(&fi) else {
            continue;
        };

        match serde_yaml::from_str::<Configs>(&s) {
            Ok(conf) => {
                info!("Using config {}", fi);
                return conf;
            }
            Err(e) => warn!("Ignoring invalid config {}: {}", fi, e),
        }
    }

    Configs::default()
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
struct Configs {
    pub fields: FieldsConfiguration,
    pub navigation: NavigationOptions,
}

#[test]
fn parse_configs() -> Result<(), String> {
    let yaml = "\nfields:\nnavigation:";

    let conf: Configs = serde_yaml::from_str(&yaml).map_err(|e| e.to_string())?;

    assert_eq!(Configs::default(), conf);

    let yaml = "\nfields:\n  device_id: truck\nnavigation:\n  announcement_cooldown_secs: 8\n  vehicle_class: loaded";

    let conf: Configs = serde_yaml::from_str(&yaml).map_err(|e| e.to_string())?;

    assert_eq!(
        Configs {
            fields: FieldsConfiguration {
                device_id: "truck".to_string(),
                time: "time".to_string(),
                coordinates: "coordinates".to_string(),
                speed: "speed".to_string(),
                accuracy: "accuracy".to_string(),
                bearing: "bearing".to_string(),
                flip_coordinates: false,
            },
            navigation: NavigationOptions {
                announcement_cooldown_secs: 8.0,
                vehicle_class: VehicleClass::Loaded,
                ..NavigationOptions::default()
            }
        },
        conf
    );

    Ok(())
}
