/// Liveness and version endpoints
pub mod health;
