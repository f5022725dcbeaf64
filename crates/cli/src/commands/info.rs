//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{AcquisitionConfig, AcquisitionPlan, Value};
use serde::Serialize;
use tracing::info;

use super::describe::{describe_plan, print_tree, ElementInfo, PlanShape};
use super::load_plan;
use crate::cli::InfoArgs;

/// Plan info for JSON output
#[derive(Serialize)]
struct PlanInfo {
    version: String,
    acquisition: AcquisitionConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    experiment: Option<Value>,
    shape: PlanShape,
    features: Vec<ElementInfo>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(plan = %args.plan.display(), "Loading plan info");

    let plan = load_plan(&args.plan)?;
    let features = describe_plan(&features::builtin_registry(), &plan)
        .context("Failed to resolve plan features")?;

    if args.json {
        let info = build_plan_info(&plan, features, args);
        let json = serde_json::to_string_pretty(&info).context("Failed to serialize plan info")?;
        println!("{}", json);
    } else {
        print_plan_info(&plan, &features, args);
    }

    Ok(())
}

fn build_plan_info(plan: &AcquisitionPlan, features: Vec<ElementInfo>, args: &InfoArgs) -> PlanInfo {
    PlanInfo {
        version: plan.version.clone(),
        acquisition: plan.acquisition.clone(),
        experiment: args.experiment.then(|| plan.experiment.clone()),
        shape: PlanShape::of(&features),
        features,
    }
}

fn print_plan_info(plan: &AcquisitionPlan, features: &[ElementInfo], args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 Feature Engine Acquisition Plan              ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let acquisition = &plan.acquisition;
    println!("⚙️  Acquisition");
    println!("   ├─ Version: {}", plan.version);
    println!("   ├─ Mode: {:?}", acquisition.mode);
    match acquisition.max_cycles() {
        Some(cycles) => println!("   ├─ Passes: {}", cycles),
        None => println!("   ├─ Passes: until stopped"),
    }
    println!(
        "   ├─ Frame wait: {}ms x {}",
        acquisition.frame_wait_ms, acquisition.camera_wait_iterations
    );
    println!(
        "   └─ Pause data on device nodes: {}",
        acquisition.pause_data_on_device_nodes
    );

    if args.experiment {
        println!("\n🧪 Experiment");
        match &plan.experiment {
            Value::Object(map) if !map.is_empty() => {
                for (i, (key, value)) in map.iter().enumerate() {
                    let prefix = if i == map.len() - 1 { "└─" } else { "├─" };
                    println!("   {} {}: {}", prefix, key, value);
                }
            }
            _ => println!("   └─ (empty)"),
        }
    }

    let shape = PlanShape::of(features);
    println!(
        "\n🌲 Features ({} nodes, {} loops, {} branches)",
        shape.nodes, shape.loops, shape.branches
    );
    print_tree(features, "   ");

    println!();
}
