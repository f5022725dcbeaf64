//! Acquisition summary printing.

use acquisition::AcquisitionReport;

/// Print detailed summary of a finished acquisition
pub fn print_summary(report: &AcquisitionReport) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                   Acquisition Statistics                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📊 Overview");
    println!("   ├─ Outcome: {}", report.outcome());
    println!("   ├─ Duration: {:.2}s", report.duration.as_secs_f64());
    println!("   ├─ Frames triggered: {}", report.frames_triggered);
    println!("   ├─ Frames received: {}", report.frames_received);
    println!("   ├─ Frames processed: {}", report.frames_processed);
    println!("   ├─ Frames skipped: {}", report.frames_skipped);
    println!("   ├─ Passes (signal / data): {} / {}", report.signal_cycles, report.data_cycles);
    println!("   └─ FPS: {:.2}", report.fps());

    let summary = report.metrics.summary();

    println!("\n📈 Step Timing");
    println!("   ├─ Signal ticks: {}", summary.signal_ticks);
    println!("   ├─ Signal tick (ms): {}", summary.tick_ms);
    println!("   ├─ Data steps: {}", summary.data_steps);
    println!("   └─ Data step (ms): {}", summary.step_ms);

    if !summary.node_counts.is_empty() {
        println!("\n🔢 Node Executions");
        let last = summary.node_counts.len() - 1;
        for (i, (node, count)) in summary.node_counts.iter().enumerate() {
            let prefix = if i == last { "└─" } else { "├─" };
            println!("   {} {}: {}", prefix, node, count);
        }
    }

    println!();
}
