// Domain layer - Core models and pure logic
pub mod buffer;
pub mod connection;
pub mod dashboard;
pub mod history;
pub mod reading;
