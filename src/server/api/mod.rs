pub mod health_controller;
pub mod provider_controller;
pub mod proxy_controller;
pub mod route_controller;
