use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use p2psim_abstract::{LinkConfig, Mac48, Packet, Time};
use p2psim_routing::{GlobalRouting, scenario_runner};
use p2psim_simulator::{Network, SimulationReport, Simulator};

#[derive(Parser, Debug)]
#[command(author, version, about = "Point-to-point link and global routing simulator")]
struct Args {
    /// Run a TOML scenario from disk instead of the built-in demo.
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Print every computed forwarding table before traffic runs.
    #[arg(long, default_value_t = false)]
    print_routes: bool,

    /// Write a JSON trace of the finished simulation.
    #[arg(long)]
    trace_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    info!("p2psim-cli starting…");

    let report = if let Some(path) = &args.scenario {
        scenario_runner::run_scenario(path)?
    } else {
        run_demo()?
    };

    if args.print_routes {
        for line in &report.routes {
            println!("{line}");
        }
    }
    info!(
        deliveries = report.deliveries.len(),
        duration_ns = report.duration_ns,
        "simulation complete"
    );

    if let Some(trace_path) = &args.trace_out {
        write_trace(trace_path, &report)?;
    }

    Ok(())
}

/// Three routers in a line, 10 Mb/s links with 2 ms of delay, a couple of
/// timed sends across the first hop.
fn run_demo() -> Result<SimulationReport> {
    let mut net = Network::new();
    let r1 = net.add_node("r1");
    let r2 = net.add_node("r2");
    let r3 = net.add_node("r3");
    let config = LinkConfig::default();
    let (d1, d2a) = net.connect(r1, r2, &config);
    let (d2b, d3) = net.connect(r2, r3, &config);

    let mut routing = GlobalRouting::new();
    for (dev, addr) in [
        (d1, "10.0.1.1/30"),
        (d2a, "10.0.1.2/30"),
        (d2b, "10.0.2.1/30"),
        (d3, "10.0.2.2/30"),
    ] {
        routing.assign_address(dev, addr.parse().context("demo interface prefix")?);
    }
    for node in [r1, r2, r3] {
        routing.add_router(node);
    }
    routing.initialize_routes(&net);

    let mut sim = Simulator::new(net);
    sim.schedule_send(
        Time::from_millis(1),
        d1,
        Packet::of_size(1250),
        Mac48::BROADCAST,
    );
    sim.schedule_send(
        Time::from_millis(2),
        d1,
        Packet::of_size(1250),
        Mac48::BROADCAST,
    );
    info!("starting demo simulation…");
    sim.run_until_complete();
    info!("demo complete at t={}", sim.now());

    Ok(sim.export_report(Some("demo".to_string()), routing.render_routes()))
}

fn write_trace(path: &Path, report: &SimulationReport) -> Result<()> {
    let data = serde_json::to_vec_pretty(report).context("Failed to serialize simulation trace")?;
    fs::write(path, &data)
        .with_context(|| format!("Failed to write trace file {}", path.display()))?;
    Ok(())
}
