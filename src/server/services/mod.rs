pub mod cdnlive_services;
pub mod channel_router_services;
pub mod fallback_services;
pub mod numeric_tv_services;
pub mod ppv_services;
pub mod provider_services;
pub mod relay_services;
pub mod stream_proxy_services;

pub use channel_router_services::ChannelRouter;
pub use fallback_services::FallbackOrchestrator;
pub use provider_services::{DynProviderService, ProviderRegistry};
pub use relay_services::RelayServices;
