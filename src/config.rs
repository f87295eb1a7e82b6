use std::time::Duration;

use crate::models::{ProviderKind, ProviderPriority};

#[derive(clap::ValueEnum, Clone, Debug, Copy)]
pub enum CargoEnv {
    Development,
    Production,
}

#[derive(clap::Parser, Clone, Debug)]
pub struct AppConfig {
    // production or development
    #[clap(long, env, value_enum)]
    pub cargo_env: CargoEnv,

    // port that the app will bind to
    #[clap(long, env, default_value = "5000")]
    pub port: u16,

    // this should be either * for allowing everything, or a comma seperated list of domains like
    // example.com,something.com. the stream proxy ignores this and is always open because video
    // elements fetch it cross origin
    #[clap(long, env, default_value = "*")]
    pub cors_origin: String,

    // optional sentry integration
    #[clap(long, env)]
    pub sentry_dsn: Option<String>,

    // order providers are tried in when a channel has more than one, anything left out gets
    // appended in the default order
    #[clap(
        long,
        env,
        value_enum,
        value_delimiter = ',',
        default_value = "event-based,ppv,numeric-tv"
    )]
    pub provider_priority: Vec<ProviderKind>,

    // numeric ids in this range route to the numeric provider even without a table entry
    #[clap(long, env, default_value = "1")]
    pub numeric_channel_min: u32,

    #[clap(long, env, default_value = "850")]
    pub numeric_channel_max: u32,

    // player route the numeric provider hands back, the channel number gets appended
    #[clap(long, env, default_value = "/tv/?channel=")]
    pub numeric_tv_route: String,

    // mirror domains, tried in the order given
    #[clap(
        long,
        env,
        value_delimiter = ',',
        default_value = "https://cdnlivetv.tv,https://cdnlive.me"
    )]
    pub cdnlive_domains: Vec<String>,

    #[clap(
        long,
        env,
        value_delimiter = ',',
        default_value = "https://ppv.to,https://ppvs.su"
    )]
    pub ppv_domains: Vec<String>,

    // embed page fetches (including the single iframe hop)
    #[clap(long, env, default_value = "20")]
    pub provider_timeout_secs: u64,

    // one manifest or segment fetch through the proxy
    #[clap(long, env, default_value = "15")]
    pub proxy_timeout_secs: u64,

    // pause between fallback attempts so we don't hammer upstreams back to back, 0 disables it
    #[clap(long, env, default_value = "250")]
    pub fallback_delay_ms: u64,
}

impl AppConfig {
    /// the routing half of the config, built once at startup and shared read only
    pub fn routing(&self) -> RoutingConfig {
        RoutingConfig {
            priority: ProviderPriority::new(self.provider_priority.clone()),
            numeric_min: self.numeric_channel_min,
            numeric_max: self.numeric_channel_max,
            fallback_delay: Duration::from_millis(self.fallback_delay_ms),
        }
    }

    pub fn providers(&self) -> ProviderSettings {
        ProviderSettings {
            numeric_tv_route: self.numeric_tv_route.clone(),
            numeric_min: self.numeric_channel_min,
            numeric_max: self.numeric_channel_max,
            cdnlive_domains: normalize_domains(&self.cdnlive_domains),
            ppv_domains: normalize_domains(&self.ppv_domains),
            timeout: Duration::from_secs(self.provider_timeout_secs),
        }
    }

    pub fn proxy_timeout(&self) -> Duration {
        Duration::from_secs(self.proxy_timeout_secs)
    }
}

impl Default for AppConfig {
    // defaults aren't really needed here but it's here as a bad fallback
    fn default() -> Self {
        Self {
            cargo_env: CargoEnv::Development,
            port: 5000,
            cors_origin: "*".to_string(),
            sentry_dsn: None,
            provider_priority: ProviderKind::DEFAULT_PRIORITY.to_vec(),
            numeric_channel_min: 1,
            numeric_channel_max: 850,
            numeric_tv_route: "/tv/?channel=".to_string(),
            cdnlive_domains: vec![
                "https://cdnlivetv.tv".to_string(),
                "https://cdnlive.me".to_string(),
            ],
            ppv_domains: vec!["https://ppv.to".to_string(), "https://ppvs.su".to_string()],
            provider_timeout_secs: 20,
            proxy_timeout_secs: 15,
            fallback_delay_ms: 250,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RoutingConfig {
    pub priority: ProviderPriority,
    pub numeric_min: u32,
    pub numeric_max: u32,
    pub fallback_delay: Duration,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        AppConfig::default().routing()
    }
}

#[derive(Clone, Debug)]
pub struct ProviderSettings {
    pub numeric_tv_route: String,
    pub numeric_min: u32,
    pub numeric_max: u32,
    pub cdnlive_domains: Vec<String>,
    pub ppv_domains: Vec<String>,
    pub timeout: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        AppConfig::default().providers()
    }
}

// trailing slashes and blanks sneak in from env files
fn normalize_domains(domains: &[String]) -> Vec<String> {
    domains
        .iter()
        .map(|d| d.trim().trim_end_matches('/').to_string())
        .filter(|d| !d.is_empty())
        .collect()
}
