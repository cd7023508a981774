// Connection session lifecycle
/// State of the analyzer session. `Lost` is terminal for the current
/// session; leaving it requires a full reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Lost,
}
