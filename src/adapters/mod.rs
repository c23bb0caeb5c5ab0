pub mod api_source;
pub mod browser_source;

use std::future::Future;
use std::num::NonZeroU32;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::models::StagedMatch;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

#[derive(Debug, Clone)]
pub struct DiscoveredEvent {
    pub source_event_id: String,
    pub name: String,
    pub event_type_hint: Option<String>,
}

pub struct StandingRow {
    pub team_name: String,
    pub wins: i32,
    pub losses: i32,
    pub draws: i32,
}

/// Per-adapter rate limit and retry/backoff schedule, consumed at every
/// outbound request. Adapters that hit shared infrastructure set this
/// conservatively; the engine never overrides it with a global default.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    pub requests_per_period: u32,
    pub period: Duration,
    /// Floor and ceiling on the jittered backoff delay between retries.
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Extra pacing delay applied between events, on top of the token-bucket wait.
    pub inter_event_delay: Duration,
    pub max_retries: u32,
    /// Base delay the exponential backoff ladder multiplies by 2^attempt.
    pub backoff_base: Duration,
    /// Cooldown used when a 429 response carries no `Retry-After` header.
    pub rate_limit_cooldown: Duration,
    /// Cooldown applied before retrying a 5xx response.
    pub server_error_cooldown: Duration,
}

impl RateLimitPolicy {
    /// Rate limit tuned by request budget alone, with spec-default
    /// retry/backoff/cooldown values -- the common case for adapters that
    /// don't need bespoke tuning.
    pub fn new(requests_per_period: u32, period: Duration) -> Self {
        Self {
            requests_per_period,
            period,
            min_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
            inter_event_delay: Duration::from_millis(100),
            max_retries: 3,
            backoff_base: Duration::from_millis(500),
            rate_limit_cooldown: Duration::from_secs(30),
            server_error_cooldown: Duration::from_secs(10),
        }
    }

    pub fn governor(&self) -> RateLimiter<NotKeyed, InMemoryState, DefaultClock> {
        let burst = NonZeroU32::new(self.requests_per_period.max(1)).unwrap();
        let quota = Quota::with_period(self.period / self.requests_per_period.max(1))
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);
        RateLimiter::direct(quota)
    }
}

/// Shared, cheaply cloneable handle passed into every adapter call. Owning
/// it by value (rather than by reference) lets `discover_events`/`scrape_event`
/// return `'static` futures without lifetime gymnastics on the function-pointer
/// fields below.
#[derive(Clone)]
pub struct AdapterContext {
    pub http: reqwest::Client,
    pub credential: Option<Arc<String>>,
}

impl AdapterContext {
    pub fn new(credential: Option<String>) -> Self {
        Self { http: reqwest::Client::new(), credential: credential.map(Arc::new) }
    }
}

/// Declarative description of a scraper source. Not a trait: adapters are
/// plain data plus function pointers so a new source can be registered
/// without introducing a new type for the engine to dispatch over.
pub struct Adapter {
    pub id: &'static str,
    pub source_platform: &'static str,
    pub rate_limit: RateLimitPolicy,
    pub discover_events: fn(AdapterContext) -> BoxFuture<Result<Vec<DiscoveredEvent>>>,
    pub scrape_event: fn(AdapterContext, DiscoveredEvent) -> BoxFuture<Result<Vec<StagedMatch>>>,
    pub standings: Option<fn(AdapterContext, DiscoveredEvent) -> BoxFuture<Result<Vec<StandingRow>>>>,
}

pub fn registry() -> Vec<Adapter> {
    vec![api_source::adapter(), browser_source::adapter()]
}

pub fn find(id: &str) -> Option<Adapter> {
    registry().into_iter().find(|a| a.id == id)
}
