use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trip_engine::{
    config::{EngineConfig, parse_milestones},
    geo_math::interpolate,
    lifecycle::{CompletionSync, StartRequest, StopRequest, TripLifecycle},
    models::{GeoPoint, TransportMode},
    presentation::{format_elapsed_time, milestone_message, trip_completion_message},
    service::{MockTripService, Operation},
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Walk,
    Bike,
    Bus,
    Subway,
    Car,
}

impl From<Mode> for TransportMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Walk => TransportMode::Walking,
            Mode::Bike => TransportMode::Cycling,
            Mode::Bus => TransportMode::Bus,
            Mode::Subway => TransportMode::Subway,
            Mode::Car => TransportMode::Driving,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Replay a synthetic trip through the tracking state machine"
)]
struct Args {
    #[arg(long, default_value_t = 103.7764)]
    from_lng: f64,
    #[arg(long, default_value_t = 1.2966)]
    from_lat: f64,
    #[arg(long, default_value_t = 103.7850)]
    to_lng: f64,
    #[arg(long, default_value_t = 1.3050)]
    to_lat: f64,

    /// Mode the user selected before starting
    #[arg(long, value_enum, default_value_t = Mode::Walk)]
    mode: Mode,

    /// Modes reported by the classifier, one per leg, in order
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = [Mode::Walk, Mode::Bus])]
    detected: Vec<Mode>,

    /// GPS fixes along the straight line
    #[arg(long, default_value_t = 40)]
    fixes: usize,

    /// Seconds between fixes
    #[arg(long, default_value_t = 15)]
    interval_s: i64,

    /// Comma separated milestones in metres; overrides TRIP_MILESTONES
    #[arg(long)]
    milestones: Option<String>,

    /// Simulated service latency; overrides TRIP_MOCK_LATENCY_MS
    #[arg(long)]
    latency_ms: Option<u64>,

    /// Make the save call fail to show degraded completion
    #[arg(long)]
    fail_save: bool,

    /// Cancel the trip instead of stopping it
    #[arg(long)]
    cancel: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = EngineConfig::from_env()?;
    if let Some(raw) = &args.milestones {
        config.milestones = parse_milestones(raw)?;
    }
    if let Some(ms) = args.latency_ms {
        config.mock_latency = Duration::from_millis(ms);
    }

    let service = MockTripService::shared(config.mock_latency);
    if args.fail_save {
        service.fail(Operation::SaveTrip, "simulated outage");
    }
    let trips = TripLifecycle::with_milestones(
        service.clone(),
        config.user_id.clone(),
        config.milestones.clone(),
    );

    let mut states = trips.subscribe();
    let watcher = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = states.borrow_and_update().clone();
            println!("state: {state:?}");
        }
    });

    let origin = GeoPoint::new(args.from_lng, args.from_lat);
    let destination = GeoPoint::new(args.to_lng, args.to_lat);
    let selected: TransportMode = args.mode.into();
    let trip_id = trips
        .start_tracking(StartRequest {
            origin: Some(origin),
            selected_mode: Some(selected),
            ..StartRequest::default()
        })
        .await?;
    println!("tracking {trip_id} as {}", selected.display_name());

    let fixes = args.fixes.max(1);
    let path = interpolate(origin, destination, fixes);
    let legs = args.detected.len().max(1);
    let mut now_ms = 0;
    for (i, point) in path.iter().enumerate().skip(1) {
        now_ms = i as i64 * args.interval_s * 1000;
        if let Some(mode) = args.detected.get((i - 1) * legs / fixes) {
            trips.record_mode((*mode).into(), 0.85, now_ms);
        }
        if let Some(update) = trips.record_location(*point) {
            if let Some(milestone) = update.milestone {
                println!(
                    "[{}] {}",
                    format_elapsed_time(now_ms),
                    milestone_message(milestone, Some(selected))
                );
            }
        }
    }

    if args.cancel {
        let outcome = trips.cancel_tracking(Some("simulation canceled".into())).await?;
        println!("cancel: {outcome:?}");
    } else {
        let outcome = trips
            .stop_tracking(StopRequest {
                end_point: Some(destination),
                end_location: None,
                now_ms,
            })
            .await?;
        println!("completion: {}", serde_json::to_string_pretty(&outcome.completion)?);
        match &outcome.sync {
            CompletionSync::Saved {
                carbon: Some(carbon),
                ..
            } => println!(
                "{}",
                trip_completion_message(
                    outcome.completion.is_green_trip,
                    carbon.carbon_saved,
                    carbon.green_points
                )
            ),
            other => println!("upload: {}", serde_json::to_string(other)?),
        }
    }

    drop(trips);
    watcher.await?;
    Ok(())
}
