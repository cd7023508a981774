use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub connection: ConnectionSettings,
    #[serde(default)]
    pub polling: PollingSettings,
    #[serde(default)]
    pub display: DisplaySettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Path to the chromedriver executable.
    pub driver_path: String,
    pub driver_port: u16,
    /// Login page of the analyzer's embedded web interface.
    pub login_url: String,
    /// Sub-frame carrying the measurement display.
    pub frame: String,
    /// XPath of the status line element.
    pub status_locator: String,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            driver_path: "chromedriver".to_string(),
            driver_port: 9515,
            login_url: "http://192.168.1.88/login.htm".to_string(),
            frame: "unten".to_string(),
            status_locator: r#"//td[@id="btmline"]"#.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollingSettings {
    pub interval_secs: u64,
    pub fetch_timeout_secs: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_secs: 1,
            fetch_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DisplaySettings {
    pub plot_capacity: usize,
    pub tick_count: usize,
    pub title: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            plot_capacity: 1000,
            tick_count: 10,
            title: "Gas Concentrations Over Time".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageSettings {
    pub save_directory: String,
    pub save_to_csv: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            save_directory: ".".to_string(),
            save_to_csv: true,
        }
    }
}

pub fn load_analyzer_config() -> anyhow::Result<AnalyzerConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/analyzer").required(false))
        .build()?;

    Ok(settings.try_deserialize()?)
}
