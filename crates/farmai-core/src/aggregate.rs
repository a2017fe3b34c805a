//! Cache-first resolution of use cases over the [`SourceRouter`].
//!
//! Every cached use case goes through [`Aggregator::resolve`]: a live cache
//! entry is returned as-is, otherwise the router chain runs once per key no
//! matter how many callers miss at the same time. The upstream fetch runs on
//! its own task so a caller that goes away does not cancel it; its result is
//! still cached.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::{CacheKey, CacheStore};
use crate::clock::iso_date;
use crate::data_source::UseCase;
use crate::domain::{
    Coordinates, DiseaseDetection, DiseaseRequest, ForecastRequest, SensorId, SensorLocation,
    SoilReading, WeatherAlert, WeatherForecast, WeatherObservation, YieldPrediction, YieldRequest,
};
use crate::routing::{RouteFailure, RouteResult, SourceRouter};
use crate::ProviderId;

/// Resolved use case together with where the data came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub data: T,
    pub cached: bool,
    /// Provider that produced the data; `None` for cache hits.
    pub source: Option<ProviderId>,
}

#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error(transparent)]
    Route(#[from] RouteFailure),
    #[error("failed to encode provider result: {0}")]
    Encode(String),
    #[error("upstream fetch aborted: {0}")]
    Aborted(String),
}

#[derive(Debug)]
struct Fetched {
    body: String,
    source: ProviderId,
}

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<Fetched>, FetchError>>>;

/// Cache decorator and request coalescer in front of the router.
#[derive(Clone)]
pub struct Aggregator {
    cache: CacheStore,
    router: Arc<SourceRouter>,
    in_flight: Arc<Mutex<HashMap<String, SharedFetch>>>,
}

impl Aggregator {
    pub fn new(cache: CacheStore, router: SourceRouter) -> Self {
        Self {
            cache,
            router: Arc::new(router),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn router(&self) -> &SourceRouter {
        &self.router
    }

    pub async fn current_weather(
        &self,
        at: Coordinates,
    ) -> Result<Resolved<WeatherObservation>, FetchError> {
        let key = CacheKey::new(UseCase::CurrentWeather)
            .with(at.latitude())
            .with(at.longitude());
        self.resolve(UseCase::CurrentWeather, key, move |router| async move {
            router.current_weather(at).await
        })
        .await
    }

    pub async fn weather_forecast(
        &self,
        req: ForecastRequest,
    ) -> Result<Resolved<WeatherForecast>, FetchError> {
        let key = CacheKey::new(UseCase::WeatherForecast)
            .with(req.at.latitude())
            .with(req.at.longitude())
            .with(req.days);
        self.resolve(UseCase::WeatherForecast, key, move |router| async move {
            router.weather_forecast(req).await
        })
        .await
    }

    pub async fn weather_alerts(
        &self,
        at: Coordinates,
    ) -> Result<Resolved<Vec<WeatherAlert>>, FetchError> {
        let key = CacheKey::new(UseCase::WeatherAlerts)
            .with(at.latitude())
            .with(at.longitude());
        self.resolve(UseCase::WeatherAlerts, key, move |router| async move {
            router.weather_alerts(at).await
        })
        .await
    }

    pub async fn soil_reading(&self, sensor: SensorId) -> Result<Resolved<SoilReading>, FetchError> {
        let key = CacheKey::new(UseCase::SoilReading).with(&sensor);
        self.resolve(UseCase::SoilReading, key, move |router| async move {
            router.soil_reading(sensor).await
        })
        .await
    }

    pub async fn sensor_locations(&self) -> Result<Resolved<Vec<SensorLocation>>, FetchError> {
        let key = CacheKey::new(UseCase::SensorLocations);
        self.resolve(UseCase::SensorLocations, key, |router| async move {
            router.sensor_locations().await
        })
        .await
    }

    /// Predictions are bucketed per field and calendar day.
    pub async fn yield_prediction(
        &self,
        req: YieldRequest,
    ) -> Result<Resolved<YieldPrediction>, FetchError> {
        let key = CacheKey::new(UseCase::YieldPrediction)
            .with(&req.field.field_id)
            .with(iso_date(self.cache.clock().today()));
        self.resolve(UseCase::YieldPrediction, key, move |router| async move {
            router.yield_prediction(req).await
        })
        .await
    }

    /// Every image is unique, so detections bypass the cache.
    pub async fn disease_detection(
        &self,
        req: DiseaseRequest,
    ) -> Result<Resolved<DiseaseDetection>, FetchError> {
        let success = self.router.disease_detection(req).await?;
        Ok(Resolved {
            data: success.data,
            cached: false,
            source: Some(success.selected_source),
        })
    }

    /// Return the cached value under `key`, or run `fetch` once for all
    /// concurrent callers and cache its result with the use-case TTL.
    pub async fn resolve<T, F, Fut>(
        &self,
        use_case: UseCase,
        key: CacheKey,
        fetch: F,
    ) -> Result<Resolved<T>, FetchError>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce(Arc<SourceRouter>) -> Fut,
        Fut: Future<Output = RouteResult<T>> + Send + 'static,
    {
        if let Some(raw) = self.cache.get(key.as_str()) {
            match serde_json::from_str(&raw) {
                Ok(data) => {
                    debug!(key = %key, "cache hit");
                    return Ok(Resolved {
                        data,
                        cached: true,
                        source: None,
                    });
                }
                Err(error) => {
                    warn!(key = %key, error = %error, "dropping undecodable cache entry");
                    self.cache.delete(key.as_str());
                }
            }
        }

        let shared = self.join_or_start(use_case, &key, fetch);
        let fetched = shared.await?;
        let data = serde_json::from_str(&fetched.body)
            .map_err(|error| FetchError::Encode(error.to_string()))?;

        Ok(Resolved {
            data,
            cached: false,
            source: Some(fetched.source),
        })
    }

    fn join_or_start<T, F, Fut>(&self, use_case: UseCase, key: &CacheKey, fetch: F) -> SharedFetch
    where
        T: Serialize + Send + 'static,
        F: FnOnce(Arc<SourceRouter>) -> Fut,
        Fut: Future<Output = RouteResult<T>> + Send + 'static,
    {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(existing) = in_flight.get(key.as_str()) {
            debug!(key = %key, "joining in-flight fetch");
            return existing.clone();
        }

        debug!(key = %key, use_case = use_case.as_str(), "cache miss");
        let upstream = fetch(Arc::clone(&self.router));
        let cache = self.cache.clone();
        let registry = Arc::clone(&self.in_flight);
        let owned_key = key.as_str().to_owned();

        let task = tokio::spawn(async move {
            let result = match upstream.await {
                Ok(success) => serde_json::to_string(&success.data)
                    .map(|body| Fetched {
                        body,
                        source: success.selected_source,
                    })
                    .map_err(|error| FetchError::Encode(error.to_string())),
                Err(failure) => Err(FetchError::Route(failure)),
            };

            if let (Ok(fetched), Some(ttl)) = (&result, use_case.cache_ttl()) {
                cache.set(owned_key.as_str(), fetched.body.as_str(), Some(ttl));
            }
            registry
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .remove(&owned_key);

            result.map(Arc::new)
        });

        let shared = async move {
            task.await
                .map_err(|error| FetchError::Aborted(error.to_string()))?
        }
        .boxed()
        .shared();

        in_flight.insert(key.as_str().to_owned(), shared.clone());
        shared
    }
}
