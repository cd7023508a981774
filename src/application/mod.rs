// Application layer - Use cases built around the injected gateway
pub mod analyzer_gateway;
pub mod dashboard_service;
pub mod poller;
