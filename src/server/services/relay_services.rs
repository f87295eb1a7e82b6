use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

use crate::config::AppConfig;

use super::{
    cdnlive_services::CdnliveService,
    channel_router_services::ChannelRouter,
    fallback_services::FallbackOrchestrator,
    ppv_services::PpvService,
    provider_services::{DynProviderService, ProviderRegistry},
    stream_proxy_services::StreamProxyService,
    numeric_tv_services::NumericTvService,
};

/// everything the handlers need, cloned into each request through an Extension
///
/// nothing in here is mutable after startup
#[derive(Clone)]
pub struct RelayServices {
    pub router: Arc<ChannelRouter>,
    pub providers: Arc<ProviderRegistry>,
    pub fallback: Arc<FallbackOrchestrator>,
    pub cdnlive: Arc<CdnliveService>,
    pub ppv: Arc<PpvService>,
    pub proxy: Arc<StreamProxyService>,
    pub metrics: Option<PrometheusHandle>,
    pub config: Arc<AppConfig>,
}

impl RelayServices {
    pub fn new(config: Arc<AppConfig>, metrics: Option<PrometheusHandle>) -> Self {
        info!("starting relay services...");

        let routing = config.routing();
        let settings = config.providers();

        info!(
            "provider priority: {:?}, numeric range {}-{}",
            routing.priority.order(),
            routing.numeric_min,
            routing.numeric_max
        );

        let cdnlive = Arc::new(CdnliveService::new(&settings));
        let ppv = Arc::new(PpvService::new(&settings));

        // the concrete adapters are shared with the provider specific endpoints
        let providers = Arc::new(ProviderRegistry::from_adapters(vec![
            Arc::new(NumericTvService::new(&settings)) as DynProviderService,
            cdnlive.clone() as DynProviderService,
            ppv.clone() as DynProviderService,
        ]));

        let router = Arc::new(ChannelRouter::new(routing.clone()));
        let fallback = Arc::new(FallbackOrchestrator::new(providers.clone(), &routing));
        let proxy = Arc::new(StreamProxyService::new(config.proxy_timeout()));

        info!("relay services ok");

        Self {
            router,
            providers,
            fallback,
            cdnlive,
            ppv,
            proxy,
            metrics,
            config,
        }
    }
}
