use std::time::Duration;

/// Connection settings for one client session. The library never reads the
/// environment; binaries and tests construct this explicitly.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the REST API, e.g. `http://localhost:3001/api`.
    pub api_base: String,
    /// Push-channel endpoint, e.g. `ws://localhost:3001/ws`.
    pub ws_url: String,
    /// How often the reconciler re-fetches authoritative room state.
    pub poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:3001/api".to_string(),
            ws_url: "ws://localhost:3001/ws".to_string(),
            poll_interval: Duration::from_secs(5),
        }
    }
}
