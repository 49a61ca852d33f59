pub mod config;
pub mod simulate;
pub mod watch;

use scrollwork_core::FrameReport;

use crate::scenario::Snapshot;

/// One line per trigger crossing in the frame
pub(crate) fn print_events(report: &FrameReport) {
    for event in &report.events {
        println!(
            "  #{:<5} {:>9.1}ms  pos {:>8.1}  {:<16} {:<10} progress {:.2} ({})",
            report.frame,
            report.time_ms,
            report.scroll.virtual_position,
            event.label,
            event.kind.as_str(),
            event.progress,
            event.direction.as_str(),
        );
    }
}

pub(crate) fn print_snapshot(snapshot: &Snapshot) {
    println!(
        "\nScroll: {:.1}px ({:.0}% of page)",
        snapshot.scroll.virtual_position,
        snapshot.page_progress * 100.0
    );

    if !snapshot.elements.is_empty() {
        println!("\nElements ({}):", snapshot.elements.len());
        for element in &snapshot.elements {
            let pinned = if element.pinned { " [pinned]" } else { "" };
            let text = if element.text.is_empty() {
                String::new()
            } else {
                format!(" \"{}\"", element.text)
            };
            println!(
                "  {} - opacity {:.2}, {}{}{}",
                element.id, element.opacity, element.transform, pinned, text
            );
        }
    }

    if !snapshot.timelines.is_empty() {
        println!("\nTimelines ({}):", snapshot.timelines.len());
        for timeline in &snapshot.timelines {
            println!(
                "  {} - {:.0}% ({:?})",
                timeline.name,
                timeline.progress * 100.0,
                timeline.state
            );
        }
    }

    if !snapshot.pins.is_empty() {
        println!("\nPinned sections ({}):", snapshot.pins.len());
        for pin in &snapshot.pins {
            println!(
                "  {} - range {:.0}px, progress {:.2}, translate {:.1}px{}",
                pin.name,
                pin.range_length,
                pin.progress,
                pin.translate,
                if pin.pinned { " [pinned]" } else { "" }
            );
        }
    }

    if !snapshot.counters.is_empty() {
        println!("\nCounters ({}):", snapshot.counters.len());
        for counter in &snapshot.counters {
            let state = if counter.finished { "done" } else { "running" };
            println!("  {} - {} ({})", counter.name, counter.text, state);
        }
    }
}
