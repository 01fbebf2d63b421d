//! API key middleware
//!
//! Gates ingest and query routes on a pre-shared key: the `X-API-Key` header
//! must name a key that exists in Redis under the configured prefix. Missing
//! key → 401, unknown key → 403. The check runs before anything reaches the
//! engine. When `require_api_key` is off (dev mode) requests pass through.

use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures_util::future::LocalBoxFuture;
use reco_core::RecoError;
use std::{
    future::{ready, Ready},
    rc::Rc,
};

#[derive(Clone)]
pub struct ApiKeyAuth {
    client: Option<redis::Client>,
    prefix: String,
}

impl ApiKeyAuth {
    /// Enforcing middleware backed by a Redis key-existence lookup.
    pub fn new(redis_url: &str, prefix: impl Into<String>) -> reco_core::Result<Self> {
        let client = redis::Client::open(redis_url).map_err(RecoError::redis)?;
        Ok(Self {
            client: Some(client),
            prefix: prefix.into(),
        })
    }

    /// Pass-through middleware for deployments without API key gating.
    pub fn disabled() -> Self {
        Self {
            client: None,
            prefix: String::new(),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ApiKeyAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ApiKeyAuthService<S>;
    type Future = Ready<std::result::Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ApiKeyAuthService {
            service: Rc::new(service),
            client: self.client.clone(),
            prefix: self.prefix.clone(),
        }))
    }
}

pub struct ApiKeyAuthService<S> {
    service: Rc<S>,
    client: Option<redis::Client>,
    prefix: String,
}

impl<S, B> Service<ServiceRequest> for ApiKeyAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    actix_web::dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let client = self.client.clone();
        let prefix = self.prefix.clone();

        Box::pin(async move {
            let Some(client) = client else {
                return service.call(req).await;
            };

            let api_key = req
                .headers()
                .get("X-API-Key")
                .and_then(|h| h.to_str().ok())
                .filter(|k| !k.is_empty())
                .ok_or_else(|| Error::from(RecoError::Unauthorized))?
                .to_string();

            let mut conn = client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| Error::from(RecoError::redis(e)))?;
            let known: bool = redis::AsyncCommands::exists(&mut conn, format!("{prefix}{api_key}"))
                .await
                .map_err(|e| Error::from(RecoError::redis(e)))?;
            if !known {
                return Err(Error::from(RecoError::Forbidden));
            }

            service.call(req).await
        })
    }
}
