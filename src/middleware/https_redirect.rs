use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpResponse,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;

/// Redirects plain-HTTP requests to HTTPS with `307 Temporary Redirect`.
///
/// Disabled when no HTTPS port is configured. The scheme is read from
/// `ConnectionInfo`, so it honours `X-Forwarded-Proto` only when the
/// forwarded-header stage let it through. Paths under an exempt prefix are
/// served over either scheme.
#[derive(Debug, Clone)]
pub struct HttpsRedirect {
    https_port: Option<u16>,
    exempt: Vec<String>,
}

impl HttpsRedirect {
    pub fn new(https_port: Option<u16>) -> Self {
        Self {
            https_port,
            exempt: Vec::new(),
        }
    }

    /// Serves everything under `prefix` without redirecting.
    pub fn exempt(mut self, prefix: impl Into<String>) -> Self {
        self.exempt.push(prefix.into());
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for HttpsRedirect
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = HttpsRedirectService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(HttpsRedirectService {
            service,
            https_port: self.https_port,
            exempt: Rc::new(self.exempt.clone()),
        }))
    }
}

pub struct HttpsRedirectService<S> {
    service: S,
    https_port: Option<u16>,
    exempt: Rc<Vec<String>>,
}

impl<S> HttpsRedirectService<S> {
    fn is_exempt(&self, path: &str) -> bool {
        self.exempt.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }
}

impl<S, B> Service<ServiceRequest> for HttpsRedirectService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let https_port = self.https_port.filter(|_| !self.is_exempt(req.path()));
        if let Some(location) = https_port.and_then(|port| redirect_target(&req, port)) {
            let response = HttpResponse::TemporaryRedirect()
                .insert_header((header::LOCATION, location))
                .finish();
            return Box::pin(ready(Ok(req.into_response(response).map_into_right_body())));
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
    }
}

/// The HTTPS URL for `req`, or `None` when it already arrived over HTTPS.
fn redirect_target(req: &ServiceRequest, https_port: u16) -> Option<String> {
    let info = req.connection_info();
    if info.scheme() == "https" {
        return None;
    }
    let host = strip_port(info.host());
    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    Some(match https_port {
        443 => format!("https://{}{}", host, path),
        port => format!("https://{}:{}{}", host, port, path),
    })
}

fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port))
            if !name.is_empty() && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) =>
        {
            name
        }
        _ => host,
    }
}
