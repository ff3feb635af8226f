use super::AuthenticatedFid;
use crate::error::ApiError;
use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use std::task::{Context, Poll};

/// Extracts and validates the `x-user-fid` header. Routes that carry the fid
/// in the body (or none at all) are excluded.
pub struct FidAuthentication {
    exclude_routes: Vec<String>,
}

impl FidAuthentication {
    pub fn new() -> Self {
        Self {
            exclude_routes: vec![
                "/health".to_string(),
                "/metrics".to_string(),
                "/api/check-play-status".to_string(),
                "/api/players".to_string(),
            ],
        }
    }
}

impl Default for FidAuthentication {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, B> Transform<S, ServiceRequest> for FidAuthentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = FidAuthenticationService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(FidAuthenticationService {
            service,
            exclude_routes: self.exclude_routes.clone(),
        })
    }
}

pub struct FidAuthenticationService<S> {
    service: S,
    exclude_routes: Vec<String>,
}

impl<S, B> Service<ServiceRequest> for FidAuthenticationService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let path = req.path().to_string();

        if self.exclude_routes.contains(&path) || !path.starts_with("/api") {
            let fut = self.service.call(req);
            return Box::pin(async move {
                let res = fut.await?;
                Ok(res)
            });
        }

        let fid = req
            .headers()
            .get("x-user-fid")
            .and_then(|h| h.to_str().ok())
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|fid| *fid > 0);

        let fid = match fid {
            Some(fid) => fid,
            None => {
                return Box::pin(async move {
                    Err(ApiError::Unauthorized("Missing or invalid x-user-fid header".into()).into())
                });
            }
        };

        req.extensions_mut().insert(AuthenticatedFid(fid));

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res)
        })
    }
}
