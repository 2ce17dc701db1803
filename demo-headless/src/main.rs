use clap::Parser;
use microclimate_core::{Simulation, SimulationConfig, SimulationToggles, TerrainConfig};
use tracing_subscriber::EnvFilter;

/// Microclimate simulation demo with configurable parameters
#[derive(Parser, Debug)]
#[command(name = "microclimate-demo")]
#[command(about = "Terrain-driven microclimate simulation demo", long_about = None)]
struct Args {
    /// Grid size in cells (square grid)
    #[arg(short, long, default_value_t = 100)]
    size: usize,

    /// Cell size in meters
    #[arg(long, default_value_t = 30.0)]
    cell_size: f32,

    /// Random seed for terrain and weather noise
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Simulated duration in hours
    #[arg(short = 'H', long, default_value_t = 48.0)]
    hours: f32,

    /// Simulated hours per tick
    #[arg(short, long, default_value_t = 1.0)]
    time_factor: f32,

    /// Starting month (1-12)
    #[arg(short, long, default_value_t = 6)]
    month: u32,

    /// Starting hour of day (0-24)
    #[arg(long, default_value_t = 6.0)]
    hour: f32,

    /// Prevailing wind speed in m/s
    #[arg(short, long, default_value_t = 3.0)]
    wind_speed: f32,

    /// Direction the wind blows toward, degrees counter-clockwise from east
    #[arg(long, default_value_t = 0.0)]
    wind_direction: f32,

    /// Gust amplitude (0 = steady wind)
    #[arg(short, long, default_value_t = 0.3)]
    gustiness: f32,

    /// Disable temperature diffusion
    #[arg(long)]
    no_diffusion: bool,

    /// Disable the nocturnal inversion layer
    #[arg(long)]
    no_inversions: bool,

    /// Disable katabatic cooling and föhn warming
    #[arg(long)]
    no_downslope: bool,

    /// Report interval in simulated hours
    #[arg(short, long, default_value_t = 3.0)]
    report_interval: f32,

    /// Print a cell report for this cell at the end ("x,y")
    #[arg(long, value_parser = parse_cell)]
    probe: Option<(usize, usize)>,
}

fn parse_cell(s: &str) -> Result<(usize, usize), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{s}'"))?;
    let x = x.trim().parse().map_err(|e| format!("bad x: {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("bad y: {e}"))?;
    Ok((x, y))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    println!("=== Microclimate Simulation Demo ===\n");

    let config = SimulationConfig {
        seed: args.seed,
        terrain: TerrainConfig {
            size: args.size,
            cell_size: args.cell_size,
            ..Default::default()
        },
        time_factor: args.time_factor,
        start_month: args.month,
        start_hour: args.hour,
        base_wind_speed: args.wind_speed,
        wind_direction: args.wind_direction,
        wind_gustiness: args.gustiness,
        toggles: SimulationToggles {
            diffusion: !args.no_diffusion,
            inversions: !args.no_inversions,
            downslope: !args.no_downslope,
        },
    };

    let mut sim = match Simulation::new(config) {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    let state = sim.state();
    println!(
        "Created {}x{} grid ({:.0}m cells), {} regions",
        state.size,
        state.size,
        state.cell_size,
        state.region_count()
    );
    println!(
        "Wind: {:.1} m/s toward {:.0}°, gustiness {:.2}",
        args.wind_speed, args.wind_direction, args.gustiness
    );
    println!("Start: {}\n", sim.clock());

    if args.time_factor <= 0.0 {
        println!("Time factor is zero, nothing to run");
        return;
    }

    println!("Running simulation...\n");
    println!("Clock                  | Tmin  | Tavg  | Tmax  | Precip | Cloud top | Snow  | Inversion");
    println!("-----------------------|-------|-------|-------|--------|-----------|-------|----------");

    let steps = (args.hours / args.time_factor).ceil() as u64;
    let mut elapsed = 0.0;
    let mut next_report = 0.0;
    for _ in 0..steps {
        let clock = sim.clock();
        let metrics = sim.tick();
        elapsed += args.time_factor;

        if elapsed >= next_report {
            println!(
                "{:22} | {:5.1} | {:5.1} | {:5.1} | {:6.3} | {:8.0}m | {:5.3} | {:6.1}°C",
                clock.to_string(),
                metrics.min_temperature,
                metrics.avg_temperature,
                metrics.max_temperature,
                metrics.avg_precipitation,
                metrics.max_cloud_top,
                metrics.avg_snow_depth,
                sim.state().inversion_strength
            );
            next_report += args.report_interval;
        }
    }

    let metrics = sim.metrics();
    println!("\n=== Simulation Complete ===");
    println!("Ticks: {}, clock: {}", sim.ticks(), sim.clock());
    println!(
        "Temperature: {:.1}°C .. {:.1}°C (avg {:.1}°C)",
        metrics.min_temperature, metrics.max_temperature, metrics.avg_temperature
    );
    println!("Mean precipitation: {:.3}", metrics.avg_precipitation);
    println!("Mean snow depth: {:.3}m", metrics.avg_snow_depth);

    if let Some((x, y)) = args.probe {
        match sim.cell_report(x, y) {
            Some(report) => {
                println!("\nCell ({x}, {y}):");
                println!(
                    "  Elevation: {:.0}m, {:?} on {:?} (region {})",
                    report.elevation, report.land_cover, report.soil_type, report.region_id
                );
                println!(
                    "  Air: {:.1}°C, soil: {:.1}°C, dew point: {:.1}°C",
                    report.air_temperature, report.soil_temperature, report.dew_point
                );
                println!(
                    "  Humidity: {:.0}%, soil moisture: {:.0}%, snow: {:.3}m",
                    report.humidity * 100.0,
                    report.soil_moisture * 100.0,
                    report.snow_depth
                );
                println!(
                    "  Wind: {:.1} m/s ({:.1}, {:.1}), fog: {:.2}",
                    report.wind.speed, report.wind.x, report.wind.y, report.fog_density
                );
                println!(
                    "  Cloud: {:?} ({:.0}%), precipitation: {:?} {:.3}",
                    report.cloud_type,
                    report.cloud_coverage * 100.0,
                    report.precipitation.kind,
                    report.precipitation.rate
                );
            }
            None => println!("\nCell ({x}, {y}) is outside the grid"),
        }
    }
}
