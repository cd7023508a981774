// WebDriver gateway - scripted-browser access to the analyzer page
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::application::analyzer_gateway::{AnalyzerGateway, GatewayError};
use crate::infrastructure::config::{ConnectionSettings, PollingSettings};

// W3C WebDriver element identifier key
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(250);
const DRIVER_STARTUP_ATTEMPTS: u32 = 40;

struct Session {
    driver: Child,
    session_id: String,
}

/// Drives a Chrome instance through the chromedriver REST protocol. One
/// session is the singly-owned connection resource: created in `connect`,
/// released on fatal transport failure or explicit shutdown.
pub struct WebDriverGateway {
    http: reqwest::Client,
    base_url: String,
    settings: ConnectionSettings,
    fetch_timeout: Duration,
    session: Mutex<Option<Session>>,
}

impl WebDriverGateway {
    /// Spawn the driver executable, create a browser session and navigate
    /// to the login page. The operator then logs in by hand before `open`
    /// is called.
    pub async fn connect(
        settings: ConnectionSettings,
        polling: &PollingSettings,
    ) -> Result<Self, GatewayError> {
        let driver = Command::new(&settings.driver_path)
            .arg(format!("--port={}", settings.driver_port))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                GatewayError::Setup(format!(
                    "failed to launch webdriver '{}': {e}",
                    settings.driver_path
                ))
            })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| GatewayError::Setup(e.to_string()))?;
        let base_url = format!("http://127.0.0.1:{}", settings.driver_port);

        Self::await_driver_ready(&http, &base_url).await?;

        let body: Value = http
            .post(format!("{base_url}/session"))
            .json(&json!({
                "capabilities": { "alwaysMatch": { "browserName": "chrome" } }
            }))
            .send()
            .await
            .map_err(|e| GatewayError::Setup(e.to_string()))?
            .json()
            .await
            .map_err(|e| GatewayError::Setup(e.to_string()))?;

        let session_id = body["value"]["sessionId"]
            .as_str()
            .ok_or_else(|| GatewayError::Setup("no session id in webdriver reply".to_string()))?
            .to_string();
        info!("webdriver session {session_id} created");

        let gateway = Self {
            http,
            base_url,
            fetch_timeout: Duration::from_secs(polling.fetch_timeout_secs),
            session: Mutex::new(Some(Session { driver, session_id })),
            settings,
        };

        gateway
            .post("url", json!({ "url": gateway.settings.login_url }))
            .await
            .map_err(|e| GatewayError::Setup(format!("navigation failed: {e}")))?;

        Ok(gateway)
    }

    async fn await_driver_ready(
        http: &reqwest::Client,
        base_url: &str,
    ) -> Result<(), GatewayError> {
        for _ in 0..DRIVER_STARTUP_ATTEMPTS {
            if let Ok(response) = http.get(format!("{base_url}/status")).send().await {
                if let Ok(body) = response.json::<Value>().await {
                    if body["value"]["ready"].as_bool().unwrap_or(false) {
                        return Ok(());
                    }
                }
            }
            sleep(ELEMENT_POLL_INTERVAL).await;
        }
        Err(GatewayError::Setup(
            "webdriver did not become ready".to_string(),
        ))
    }

    async fn session_url(&self, suffix: &str) -> Result<String, GatewayError> {
        let session = self.session.lock().await;
        let session = session
            .as_ref()
            .ok_or_else(|| GatewayError::Transport("session already released".to_string()))?;
        Ok(format!(
            "{}/session/{}/{suffix}",
            self.base_url, session.session_id
        ))
    }

    async fn post(&self, suffix: &str, body: Value) -> Result<Value, GatewayError> {
        let url = self.session_url(suffix).await?;
        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Self::unwrap_value(response).await
    }

    async fn get(&self, suffix: &str) -> Result<Value, GatewayError> {
        let url = self.session_url(suffix).await?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Self::unwrap_value(response).await
    }

    /// Unwrap the `value` envelope; non-2xx replies carry an error code and
    /// message inside it.
    async fn unwrap_value(response: reqwest::Response) -> Result<Value, GatewayError> {
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !status.is_success() {
            let code = body["value"]["error"].as_str().unwrap_or("unknown error");
            let message = body["value"]["message"].as_str().unwrap_or("");
            return Err(GatewayError::Transport(format!("{code}: {message}")));
        }
        Ok(body["value"].clone())
    }

    async fn find_element(&self, using: &str, selector: &str) -> Result<String, GatewayError> {
        let value = self
            .post("element", json!({ "using": using, "value": selector }))
            .await?;
        value[ELEMENT_KEY]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| GatewayError::Transport("malformed element reply".to_string()))
    }

    async fn element_text(&self, element: &str) -> Result<String, GatewayError> {
        let value = self.get(&format!("element/{element}/text")).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| GatewayError::Transport("malformed text reply".to_string()))
    }
}

#[async_trait]
impl AnalyzerGateway for WebDriverGateway {
    async fn open(&self) -> Result<(), GatewayError> {
        // The manual login may have redirected; reload whatever page we
        // landed on, then enter the measurement frame.
        let current = self
            .get("url")
            .await
            .map_err(|e| GatewayError::Setup(e.to_string()))?;
        let current = current
            .as_str()
            .ok_or_else(|| GatewayError::Setup("malformed url reply".to_string()))?
            .to_string();
        self.post("url", json!({ "url": current }))
            .await
            .map_err(|e| GatewayError::Setup(e.to_string()))?;

        let frame_selector = format!("frame[name='{}']", self.settings.frame);
        let frame = self
            .find_element("css selector", &frame_selector)
            .await
            .map_err(|e| GatewayError::Setup(format!("frame '{}': {e}", self.settings.frame)))?;

        let mut reference = serde_json::Map::new();
        reference.insert(ELEMENT_KEY.to_string(), Value::String(frame));
        self.post("frame", json!({ "id": reference }))
            .await
            .map_err(|e| GatewayError::Setup(e.to_string()))?;

        debug!("entered frame '{}'", self.settings.frame);
        Ok(())
    }

    async fn fetch_status_line(&self) -> Result<String, GatewayError> {
        let deadline = Instant::now() + self.fetch_timeout;

        loop {
            match self
                .find_element("xpath", &self.settings.status_locator)
                .await
            {
                Ok(element) => {
                    let text = self.element_text(&element).await?;
                    return Ok(text.trim().to_string());
                }
                // Element not rendered yet: keep polling until the deadline.
                Err(GatewayError::Transport(message))
                    if message.starts_with("no such element") =>
                {
                    if Instant::now() >= deadline {
                        return Err(GatewayError::Timeout(self.fetch_timeout));
                    }
                    sleep(ELEMENT_POLL_INTERVAL).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn release(&self) {
        let mut session = self.session.lock().await;
        let Some(mut session) = session.take() else {
            return;
        };

        let url = format!("{}/session/{}", self.base_url, session.session_id);
        if let Err(e) = self.http.delete(url).send().await {
            warn!("failed to delete webdriver session: {e}");
        }
        if let Err(e) = session.driver.kill().await {
            warn!("failed to stop webdriver process: {e}");
        }
        info!("webdriver session released");
    }
}
