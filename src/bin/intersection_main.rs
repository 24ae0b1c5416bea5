// intersection_main.rs
use intersection_controller::monitoring::SnapshotMonitor;
use intersection_controller::{
    IntersectionController, IntersectionSnapshot, Phase, StateObserver, TimingConfiguration,
};
use log::{error, info};
use rand::Rng;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

const DEFAULT_RUN_SECS: u64 = 60;

fn load_timing() -> Option<TimingConfiguration> {
    match std::env::args().nth(1) {
        Some(path) => match TimingConfiguration::from_json_file(&path) {
            Ok(timing) => {
                info!("Loaded timing configuration from {path}");
                Some(timing)
            }
            Err(e) => {
                eprintln!("Invalid timing configuration {path}: {e}");
                None
            }
        },
        None => Some(TimingConfiguration::default()),
    }
}

// Prints one JSON line per phase change and feeds the monitor.
fn console_observer(monitor: Arc<SnapshotMonitor>) -> StateObserver {
    let last_phase: Mutex<Option<Phase>> = Mutex::new(None);
    Arc::new(move |snap: &IntersectionSnapshot| {
        monitor.observe(snap);
        let Ok(mut last) = last_phase.lock() else {
            return;
        };
        if *last != Some(snap.current_phase) {
            *last = Some(snap.current_phase);
            match serde_json::to_string(snap) {
                Ok(line) => println!("{line}"),
                Err(e) => error!("Could not serialize snapshot: {e}"),
            }
        }
    })
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let Some(timing) = load_timing() else {
        std::process::exit(1);
    };
    let run_secs = std::env::var("INTERSECTION_RUN_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_RUN_SECS);

    let monitor = SnapshotMonitor::new();
    let controller =
        match IntersectionController::with_config(Some(console_observer(monitor.clone())), timing) {
            Ok(controller) => controller,
            Err(e) => {
                eprintln!("Could not create intersection controller: {e}");
                std::process::exit(1);
            }
        };

    println!("Starting intersection controller...");
    let runner = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.start().await })
    };

    // Simulated push button at random intervals.
    let button = {
        let controller = controller.clone();
        tokio::spawn(async move {
            loop {
                let wait_secs = rand::rng().random_range(4..15);
                sleep(Duration::from_secs(wait_secs)).await;
                info!("Pedestrian button pressed");
                controller.request_pedestrian();
            }
        })
    };

    if run_secs == 0 {
        let _ = tokio::signal::ctrl_c().await;
    } else {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sleep(Duration::from_secs(run_secs)) => {}
        }
    }

    button.abort();
    if let Err(e) = controller.stop().await {
        eprintln!("Error stopping intersection controller: {e}");
    }
    match runner.await {
        Ok(Err(e)) => eprintln!("Traffic light cycle failed: {e}"),
        Err(e) => eprintln!("Traffic light task aborted: {e}"),
        Ok(Ok(())) => {}
    }
    if let Err(e) = controller.dispose() {
        eprintln!("Error disposing intersection controller: {e}");
    }

    let violations = monitor.violations();
    println!(
        "Observed {} snapshots, {} phase changes, {} safety violations",
        monitor.pushes(),
        monitor.transitions().len(),
        violations.len()
    );
    for violation in violations {
        println!("  {:?}", violation);
    }
}
