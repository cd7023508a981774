// Console renderer standing in for a graphical frontend
use tracing::info;

use crate::domain::dashboard::DashboardView;

/// Log the latest readouts and status line. A GUI would consume the same
/// `DashboardView`; nothing here is specific to the console.
pub fn render(view: &DashboardView) {
    let readouts = view
        .tiles
        .iter()
        .map(|tile| format!("{} {} Vol%", tile.channel.label(), tile.text))
        .collect::<Vec<_>>()
        .join(" | ");

    let samples = view
        .chart
        .series
        .first()
        .map(|series| series.points.len())
        .unwrap_or(0);
    let range = match (view.chart.ticks.first(), view.chart.ticks.last()) {
        (Some(first), Some(last)) if first.position != last.position => {
            format!(" {} - {}", first.label, last.label)
        }
        (Some(only), _) => format!(" since {}", only.label),
        _ => String::new(),
    };

    info!("{}: {readouts}", view.chart.title);
    info!("[{samples} samples buffered{range}] {}", view.status);
}
