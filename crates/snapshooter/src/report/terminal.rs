use std::path::Path;
use std::time::Duration;

use snapshooter::SnapshotStatus;

use super::json::CompareReport;

pub fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}

/// Print the result line of a two-file comparison.
pub fn print_compare_line(report: &CompareReport, elapsed: Duration) {
    let time_suffix = format!("  \x1b[2m{}\x1b[0m", format_duration(elapsed));
    let name = report.candidate.display();

    if report.passed {
        println!("  \x1b[32mPASS\x1b[0m  {name}  ({:.4}){time_suffix}", report.score);
    } else if report.reference_size != report.candidate_size {
        println!(
            "  \x1b[31mFAIL\x1b[0m  {name}  (size changed: {} -> {}){time_suffix}",
            report.reference_size, report.candidate_size
        );
    } else {
        println!(
            "  \x1b[31mFAIL\x1b[0m  {name}  ({:.4} < {:.4}){time_suffix}",
            report.score, report.threshold
        );
    }
    if let Some(diff) = &report.difference {
        print_artifact("difference", diff);
    }
}

/// Print a single snapshot result line followed by any artifact paths.
pub fn print_status_line(name: &str, status: &SnapshotStatus, elapsed: Duration) {
    let time_suffix = format!("  \x1b[2m{}\x1b[0m", format_duration(elapsed));

    match status {
        SnapshotStatus::Pass { score } => {
            println!("  \x1b[32mPASS\x1b[0m  {name}  ({score:.4}){time_suffix}");
        }
        SnapshotStatus::Fail {
            score,
            reference,
            artifacts,
            size_mismatch,
        } => {
            if let Some((r, c)) = size_mismatch {
                println!("  \x1b[31mFAIL\x1b[0m  {name}  (size changed: {r} -> {c}){time_suffix}");
            } else {
                println!("  \x1b[31mFAIL\x1b[0m  {name}  ({score:.4}){time_suffix}");
            }
            print_artifact("reference", reference);
            if let Some(diff) = &artifacts.difference {
                print_artifact("difference", diff);
            }
            print_artifact("candidate", &artifacts.candidate);
        }
        SnapshotStatus::New {
            reference,
            artifacts,
        } => {
            println!("  \x1b[33m NEW\x1b[0m  {name}  (no reference){time_suffix}");
            print_artifact("expected at", reference);
            print_artifact("candidate", &artifacts.candidate);
        }
    }
}

fn print_artifact(label: &str, path: &Path) {
    println!("        \x1b[2m{label}:\x1b[0m {}", path.display());
}
