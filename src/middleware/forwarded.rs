//! Trust policy for proxy-supplied headers.
//!
//! actix-web derives the client address and scheme (`ConnectionInfo`) from
//! `Forwarded` and `X-Forwarded-*` headers whenever they are present. This
//! stage runs before anything reads them and removes the ones that must not
//! be believed: all of them outside production, and everything except
//! `X-Forwarded-For`/`X-Forwarded-Proto` behind the production proxy.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::{ready, Ready};

const ALWAYS_UNTRUSTED: [&str; 2] = ["forwarded", "x-forwarded-host"];
const PROXY_HEADERS: [&str; 2] = ["x-forwarded-for", "x-forwarded-proto"];

#[derive(Debug, Clone, Copy)]
pub struct ForwardedHeaders {
    trusted: bool,
}

impl ForwardedHeaders {
    /// `trusted` should be `true` only when running behind a known proxy.
    pub fn new(trusted: bool) -> Self {
        Self { trusted }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ForwardedHeaders
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = ForwardedHeadersService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ForwardedHeadersService {
            service,
            trusted: self.trusted,
        }))
    }
}

pub struct ForwardedHeadersService<S> {
    service: S,
    trusted: bool,
}

impl<S, B> Service<ServiceRequest> for ForwardedHeadersService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = S::Future;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let headers = req.headers_mut();
        for name in ALWAYS_UNTRUSTED {
            headers.remove(name);
        }
        if !self.trusted {
            for name in PROXY_HEADERS {
                headers.remove(name);
            }
        }
        self.service.call(req)
    }
}
