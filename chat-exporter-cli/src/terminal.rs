use chat_exporter::{SessionReport, StatusObserver, StatusTone, StatusUpdate};
use colored::*;

/// Prints each status update as one colored line
pub struct TerminalObserver;

#[async_trait::async_trait]
impl StatusObserver for TerminalObserver {
    async fn on_status(&self, update: StatusUpdate) {
        let line = match update.tone {
            StatusTone::Progress => update.message.blue(),
            StatusTone::Success => update.message.green().bold(),
            StatusTone::Failure => update.message.red().bold(),
        };
        println!("{} {}", format!("[{}]", update.state).dimmed(), line);
    }
}

pub fn print_report(report: &SessionReport) {
    println!();
    if report.is_success() {
        println!("{}", "✅ EXPORT COMPLETE".green().bold());
    } else {
        println!("{}", "❌ EXPORT FAILED".red().bold());
    }

    println!(
        "  {} {}",
        "Human messages:".bold(),
        report.human_messages.len()
    );
    println!(
        "  {} {}",
        "Claude messages:".bold(),
        report.assistant_messages.len()
    );
    if let Some(copy) = &report.copy {
        println!(
            "  {} {} found, {} activated, {} skipped, {} failed",
            "Copy controls:".bold(),
            copy.found,
            copy.activated,
            copy.skipped,
            copy.failed
        );
    }
    if let Some(sync) = &report.sync {
        let summary = format!(
            "{}/{} captured in {} ms",
            sync.captured,
            sync.expected,
            sync.elapsed.as_millis()
        );
        let summary = if sync.is_complete() {
            summary.green()
        } else {
            summary.yellow()
        };
        println!("  {} {}", "Sync:".bold(), summary);
    }
    if let Some(path) = &report.path {
        println!("  {} {}", "Saved to:".bold(), path.display());
    }
    if let Some(error) = &report.error {
        println!("  {} {}", "Error:".red().bold(), error);
    }
}
