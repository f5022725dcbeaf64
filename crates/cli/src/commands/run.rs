//! `run` command implementation.

use std::sync::Arc;
use std::time::Duration;

use acquisition::{Acquisition, SyntheticMicroscope};
use anyhow::{Context, Result};
use contracts::{AcquisitionMode, AcquisitionPlan};
use tracing::{error, info, warn};

use super::{load_plan, resolve_plan};
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::stats::print_summary;

/// Execute the `run` command
pub async fn run_acquisition(args: &RunArgs) -> Result<()> {
    info!(plan = %args.plan.display(), "Loading plan");

    let mut plan = load_plan(&args.plan)?;
    apply_overrides(&mut plan, args);

    let registry = features::builtin_registry();
    let list = resolve_plan(&registry, &plan)?;

    info!(
        version = %plan.version,
        mode = ?plan.acquisition.mode,
        features = plan.features.len(),
        "Plan loaded"
    );

    if args.dry_run {
        info!("Dry run mode - plan resolved, exiting");
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let microscope = Arc::new(SyntheticMicroscope::with_exposure(Duration::from_millis(
        args.exposure_ms,
    )));
    let acquisition = Acquisition::new(microscope, plan.acquisition.clone())
        .with_experiment(plan.experiment.clone());
    let handle = acquisition
        .start(&list)
        .context("Failed to start acquisition")?;

    // Stop requests arrive from signals or the timeout; join runs off the async runtime
    let control = handle.control().clone();
    let shutdown = {
        let control = control.clone();
        tokio::spawn(async move {
            setup_shutdown_signal().await;
            warn!("Received shutdown signal, stopping acquisition...");
            control.request_stop();
        })
    };
    let timeout = (args.timeout > 0).then(|| {
        let control = control.clone();
        let limit = Duration::from_secs(args.timeout);
        tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            warn!(timeout_secs = limit.as_secs(), "Acquisition timeout reached, stopping...");
            control.request_stop();
        })
    });

    info!("Starting acquisition...");
    let joined = tokio::task::spawn_blocking(move || handle.join()).await;

    shutdown.abort();
    if let Some(timer) = timeout {
        timer.abort();
    }

    let report = match joined.context("Acquisition task panicked")? {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Acquisition aborted");
            return Err(CliError::acquisition_failed(e.to_string()).into());
        }
    };

    info!(
        outcome = report.outcome(),
        frames = report.frames_processed,
        duration_secs = report.duration.as_secs_f64(),
        fps = format!("{:.2}", report.fps()),
        "Acquisition completed"
    );
    print_summary(&report);

    info!("Feature Engine finished");
    Ok(())
}

/// Apply CLI overrides to the loaded plan
fn apply_overrides(plan: &mut AcquisitionPlan, args: &RunArgs) {
    if args.live {
        info!("Overriding acquisition mode from CLI: live");
        plan.acquisition.mode = AcquisitionMode::Live;
    }
    if let Some(cycles) = args.cycles {
        info!(cycles, "Overriding live cycles from CLI");
        plan.acquisition.live_cycles = (cycles > 0).then_some(cycles);
    }
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{plan_file, PLAN};

    fn args(plan: std::path::PathBuf) -> RunArgs {
        RunArgs {
            plan,
            live: false,
            cycles: None,
            exposure_ms: 0,
            timeout: 0,
            dry_run: false,
            metrics_port: 0,
        }
    }

    #[test]
    fn test_overrides() {
        let file = plan_file(PLAN);
        let mut plan = load_plan(file.path()).unwrap();
        let mut run = args(file.path().to_path_buf());
        run.live = true;
        run.cycles = Some(4);

        apply_overrides(&mut plan, &run);
        assert_eq!(plan.acquisition.mode, AcquisitionMode::Live);
        assert_eq!(plan.acquisition.max_cycles(), Some(4));

        run.cycles = Some(0);
        apply_overrides(&mut plan, &run);
        assert_eq!(plan.acquisition.max_cycles(), None);
    }

    #[tokio::test]
    async fn test_run_plan_to_completion() {
        let file = plan_file(PLAN);
        run_acquisition(&args(file.path().to_path_buf())).await.unwrap();
    }

    #[tokio::test]
    async fn test_live_run_stopped_by_timeout() {
        let file = plan_file(PLAN);
        let mut run = args(file.path().to_path_buf());
        run.live = true;
        run.exposure_ms = 1;
        run.timeout = 1;
        run_acquisition(&run).await.unwrap();
    }
}
