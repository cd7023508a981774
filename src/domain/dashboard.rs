// Dashboard view models produced by the presentation adapter
use crate::domain::reading::GasChannel;

/// Latest-value readout for one channel, already formatted for display
/// ("20.95", or "---" when there is no data yet).
#[derive(Debug, Clone)]
pub struct TileData {
    pub channel: GasChannel,
    pub text: String,
}

/// One plotted series. Points are (sample index, Vol%); x and y are always
/// equal in length.
#[derive(Debug, Clone)]
pub struct SeriesData {
    pub channel: GasChannel,
    pub points: Vec<(f64, f64)>,
}

/// An x-axis label at a sample-index position, formatted HH:MM:SS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisTick {
    pub position: usize,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct ChartData {
    pub title: String,
    pub series: Vec<SeriesData>,
    pub ticks: Vec<AxisTick>,
}

/// Everything one render pass needs, assembled from a single buffer snapshot
/// so the view is internally consistent.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub tiles: Vec<TileData>,
    pub chart: ChartData,
    pub status: String,
}
