//! The single boundary where errors become responses.
//!
//! Everything wrapped by [`ErrorHandling`] may fail in three ways: a handler
//! or inner stage returns a response with an error attached, an inner stage
//! returns `Err`, or a handler panics. All three are rendered here, so the
//! body shape and redaction rules hold no matter where the failure happened.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::InternalError,
    http::header,
    Error, HttpResponse,
};
use futures::future::{ready, FutureExt, LocalBoxFuture, Ready};
use std::any::Any;
use std::panic::AssertUnwindSafe;

use crate::error::{AppError, Diagnostics, ErrorBody, INTERNAL_ERROR_MESSAGE};

/// Converts any error escaping downstream handling into a structured response.
#[derive(Debug, Clone, Copy)]
pub struct ErrorHandling {
    diagnostics: Diagnostics,
}

impl ErrorHandling {
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self { diagnostics }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ErrorHandling
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = ErrorHandlingService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ErrorHandlingService {
            service,
            diagnostics: self.diagnostics,
        }))
    }
}

pub struct ErrorHandlingService<S> {
    service: S,
    diagnostics: Diagnostics,
}

impl<S, B> Service<ServiceRequest> for ErrorHandlingService<S>
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
        let diagnostics = self.diagnostics;
        let fut = AssertUnwindSafe(self.service.call(req)).catch_unwind();

        Box::pin(async move {
            match fut.await {
                Ok(Ok(res)) => {
                    let mut response = match res.response().error() {
                        Some(error) => translate(error, diagnostics),
                        None => return Ok(res.map_into_left_body()),
                    };
                    carry_headers(&res, &mut response);
                    Ok(res.into_response(response).map_into_right_body())
                }
                // The request was consumed downstream, so the rendered response
                // travels inside the error and actix writes it out.
                Ok(Err(error)) => {
                    let response = translate(&error, diagnostics);
                    Err(InternalError::from_response(error.to_string(), response).into())
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    log::error!("Handler panicked: {}", message);
                    let response = internal_response(&message, diagnostics);
                    Err(InternalError::from_response(message, response).into())
                }
            }
        })
    }
}

/// Keeps what outer layers and inner stages added (CORS, `Vary`, caching)
/// on the rewritten response. The body headers belong to the new body.
fn carry_headers<B>(original: &ServiceResponse<B>, rewritten: &mut HttpResponse) {
    let headers = rewritten.headers_mut();
    for (name, value) in original.response().headers() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            headers.append(name.clone(), value.clone());
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

fn internal_response(detail: &str, diagnostics: Diagnostics) -> HttpResponse {
    let body = ErrorBody::new(INTERNAL_ERROR_MESSAGE);
    let body = match diagnostics {
        Diagnostics::Verbose => body.with_detail(detail),
        Diagnostics::Redacted => body,
    };
    HttpResponse::InternalServerError().json(body)
}

/// Classifies `error` and renders the matching response.
///
/// Application errors render themselves. Framework rejections with a 4xx
/// status (malformed JSON, unparsable path segments) keep their status. Any
/// other failure is an internal fault.
pub fn translate(error: &Error, diagnostics: Diagnostics) -> HttpResponse {
    if let Some(app_error) = error.as_error::<AppError>() {
        if app_error.is_unanticipated() {
            log::error!("Unhandled error: {}", app_error);
        } else {
            log::debug!("Request failed: {}", app_error);
        }
        return app_error.to_response(diagnostics);
    }

    let status = error.as_response_error().status_code();
    if status.is_client_error() {
        log::debug!("Request rejected ({}): {}", status, error);
        return HttpResponse::build(status).json(ErrorBody::new(error.to_string()));
    }

    log::error!("Unhandled error: {}", error);
    internal_response(&error.to_string(), diagnostics)
}
