//! # FarmAI Core
//!
//! Provider adapters, TTL cache and fallback routing behind the FarmAI data
//! gateway.
//!
//! ## Overview
//!
//! - **Normalized domain models** for weather, soil readings and crop-model output
//! - **Provider adapters** over an injectable HTTP transport
//! - **Source router** trying the primary provider first, then fallbacks
//! - **Aggregator** caching every use case with its own TTL and coalescing
//!   concurrent misses into one upstream call
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | OpenWeatherMap, Weatherstack, Google AI, Sensoterra |
//! | [`aggregate`] | Cache-first resolution and request coalescing |
//! | [`cache`] | In-memory TTL cache |
//! | [`clock`] | Injectable time source |
//! | [`data_source`] | Adapter traits, use cases and `SourceError` |
//! | [`domain`] | Domain models and validated requests |
//! | [`error`] | Input validation errors |
//! | [`extract`] | JSON recovery from generative-model prose |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`routing`] | Provider chains and fallback |
//! | [`source`] | Provider identifiers |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐
//! │   Aggregator    │────▶│   Cache Store    │
//! └────────┬────────┘     └──────────────────┘
//!          │ miss
//!          ▼
//! ┌─────────────────┐
//! │  Source Router  │  primary, then fallback
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Provider        │────▶│ HTTP Client      │
//! │ (Adapter Trait) │     │ (reqwest/fixture)│
//! └─────────────────┘     └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use farmai_core::{Aggregator, CacheStore, Coordinates, SourceRouterBuilder};
//!
//! let router = SourceRouterBuilder::new()
//!     .with_openweather_key(std::env::var("OPENWEATHER_API_KEY").ok())
//!     .build();
//! let aggregator = Aggregator::new(CacheStore::default(), router);
//!
//! let london = Coordinates::new(51.5, -0.09)?;
//! let weather = aggregator.current_weather(london).await?;
//! println!("{} °C (cached: {})", weather.data.temperature, weather.cached);
//! ```

pub mod adapters;
pub mod aggregate;
pub mod cache;
pub mod clock;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod extract;
pub mod http_client;
pub mod routing;
pub mod source;

pub use adapters::{GoogleAiAdapter, OpenWeatherMapAdapter, SensoterraAdapter, WeatherstackAdapter};
pub use aggregate::{Aggregator, FetchError, Resolved};
pub use cache::{CacheKey, CacheStats, CacheStore, DEFAULT_TTL};
pub use clock::{Clock, ManualClock, SystemClock};
pub use data_source::{
    CapabilitySet, CropAdvisor, DataSource, SoilSource, SourceError, SourceErrorKind, UseCase,
    WeatherSource,
};
pub use domain::*;
pub use error::ValidationError;
pub use extract::{parse_embedded, ExtractError};
pub use http_client::{
    FixtureHttpClient, HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse,
    ReqwestHttpClient,
};
pub use routing::{
    FailureKind, RouteFailure, RouteResult, RouteSuccess, SourceRouter, SourceRouterBuilder,
};
pub use source::ProviderId;
