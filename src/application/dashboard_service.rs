// Dashboard service - maps buffered history into a renderable view
use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::domain::buffer::{PlotBuffer, PlotSnapshot};
use crate::domain::connection::ConnectionState;
use crate::domain::dashboard::{AxisTick, ChartData, DashboardView, SeriesData, TileData};
use crate::domain::history::SampleHistory;
use crate::domain::reading::{GasChannel, Reading};
use crate::infrastructure::config::DisplaySettings;

const NO_DATA_PLACEHOLDER: &str = "---";

/// Read-only consumer of the stores the poller maintains. Builds one
/// consistent view per notification; never mutates anything.
pub struct DashboardService {
    plot: Arc<RwLock<PlotBuffer>>,
    history: Arc<RwLock<SampleHistory>>,
    settings: DisplaySettings,
}

impl DashboardService {
    pub fn new(
        plot: Arc<RwLock<PlotBuffer>>,
        history: Arc<RwLock<SampleHistory>>,
        settings: DisplaySettings,
    ) -> Self {
        Self {
            plot,
            history,
            settings,
        }
    }

    /// Build the complete view for one render pass.
    pub fn current_view(&self, state: ConnectionState, log_target: Option<&Path>) -> DashboardView {
        let snapshot = self
            .plot
            .read()
            .expect("plot buffer lock poisoned")
            .snapshot();
        let latest = self
            .history
            .read()
            .expect("history lock poisoned")
            .latest()
            .cloned();

        DashboardView {
            tiles: Self::build_tiles(latest.as_ref()),
            chart: self.build_chart(&snapshot),
            status: Self::build_status(state, log_target),
        }
    }

    fn build_tiles(latest: Option<&Reading>) -> Vec<TileData> {
        GasChannel::ALL
            .iter()
            .map(|&channel| {
                let text = latest
                    .and_then(|reading| reading.value(channel))
                    .map(|value| format!("{value:.2}"))
                    .unwrap_or_else(|| NO_DATA_PLACEHOLDER.to_string());
                TileData { channel, text }
            })
            .collect()
    }

    fn build_chart(&self, snapshot: &PlotSnapshot) -> ChartData {
        let series = GasChannel::ALL
            .iter()
            .map(|&channel| {
                let values = snapshot.channel(channel);
                // x is the 0-based sample index. If the sequences ever
                // disagree in length, drop the surplus from the oldest end.
                let len = values.len().min(snapshot.timestamps.len());
                let values = &values[values.len() - len..];
                let points = values
                    .iter()
                    .enumerate()
                    .map(|(i, &value)| (i as f64, value))
                    .collect();
                SeriesData { channel, points }
            })
            .collect();

        ChartData {
            title: self.settings.title.clone(),
            series,
            ticks: self.build_ticks(snapshot),
        }
    }

    fn build_ticks(&self, snapshot: &PlotSnapshot) -> Vec<AxisTick> {
        if snapshot.is_empty() || self.settings.tick_count == 0 {
            return Vec::new();
        }
        let step = (snapshot.len() / self.settings.tick_count).max(1);
        snapshot
            .timestamps
            .iter()
            .enumerate()
            .filter(|(position, _)| position % step == 0)
            .map(|(position, timestamp)| AxisTick {
                position,
                label: timestamp.format("%H:%M:%S").to_string(),
            })
            .collect()
    }

    fn build_status(state: ConnectionState, log_target: Option<&Path>) -> String {
        match state {
            ConnectionState::Disconnected => "Status: Ready".to_string(),
            ConnectionState::Connecting => "Connecting...".to_string(),
            ConnectionState::Connected => match log_target {
                Some(path) => format!("Acquiring - data will be saved to: {}", path.display()),
                None => "Acquiring - no data will be saved.".to_string(),
            },
            ConnectionState::Lost => "Connection lost. Webdriver session closed.".to_string(),
        }
    }
}
