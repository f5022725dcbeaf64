//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{AcquisitionMode, AcquisitionPlan};
use serde::Serialize;
use tracing::info;

use super::describe::{describe_plan, PlanShape};
use super::load_plan;
use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    plan_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<PlanSummary>,
}

#[derive(Serialize)]
struct PlanSummary {
    version: String,
    mode: AcquisitionMode,
    #[serde(flatten)]
    shape: PlanShape,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(plan = %args.plan.display(), "Validating plan");

    let result = validate_plan(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Plan validation failed")
    }
}

fn validate_plan(args: &ValidateArgs) -> ValidationResult {
    let plan_path = args.plan.display().to_string();

    let checked = load_plan(&args.plan).and_then(|plan| {
        let elements = describe_plan(&features::builtin_registry(), &plan)?;
        Ok((plan, PlanShape::of(&elements)))
    });

    match checked {
        Ok((plan, shape)) => {
            let warnings = collect_warnings(&plan, &shape);
            ValidationResult {
                valid: true,
                plan_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(PlanSummary {
                    version: plan.version.clone(),
                    mode: plan.acquisition.mode,
                    shape,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            plan_path,
            error: Some(format!("{e:#}")),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect plan warnings (non-fatal issues)
fn collect_warnings(plan: &AcquisitionPlan, shape: &PlanShape) -> Vec<String> {
    let mut warnings = Vec::new();
    let acquisition = &plan.acquisition;

    if acquisition.mode == AcquisitionMode::Live && acquisition.live_cycles.is_none() {
        warnings.push("live mode without live_cycles runs until stopped".to_string());
    }
    if acquisition.mode == AcquisitionMode::Single && acquisition.live_cycles.is_some() {
        warnings.push("live_cycles is ignored in single mode".to_string());
    }
    if acquisition.pause_data_on_device_nodes && shape.device_related == 0 {
        warnings.push(
            "pause_data_on_device_nodes is set but no feature is device-related".to_string(),
        );
    }

    let budget_ms = acquisition.frame_wait_ms * u64::from(acquisition.camera_wait_iterations);
    if budget_ms < 1000 {
        warnings.push(format!(
            "camera timeout budget is only {budget_ms}ms (frame_wait_ms x camera_wait_iterations)"
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Plan is valid: {}", result.plan_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Mode: {:?}", summary.mode);
            println!("  Nodes: {}", summary.shape.nodes);
            println!("  Loops: {}", summary.shape.loops);
            println!("  Branches: {}", summary.shape.branches);
            println!("  Device-related nodes: {}", summary.shape.device_related);
            println!("  Response nodes: {}", summary.shape.need_response);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Plan is invalid: {}", result.plan_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
