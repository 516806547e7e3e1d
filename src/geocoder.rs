//! Seam between the lookup controller and whatever resolves postal codes.

use futures::future::BoxFuture;

use crate::types::LocationResult;

/// Failure while talking to the geocoding service
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeocodeError {
    /// The service answered with a non-2xx status
    #[error("geocoding service responded with status {0}")]
    Status(u16),

    /// The request never produced a response (DNS, connect, TLS, body read)
    #[error("{0}")]
    Transport(String),

    /// The body was not a valid location document
    #[error("{0}")]
    Parse(String),
}

/// A geocoding provider that resolves a postal code to a location.
///
/// Implementations must not retry or cache; every call is one request.
pub trait Geocoder: Send + Sync {
    fn lookup<'a>(&'a self, postal_code: &'a str)
    -> BoxFuture<'a, Result<LocationResult, GeocodeError>>;
}

impl<G: Geocoder + ?Sized> Geocoder for std::sync::Arc<G> {
    fn lookup<'a>(
        &'a self,
        postal_code: &'a str,
    ) -> BoxFuture<'a, Result<LocationResult, GeocodeError>> {
        (**self).lookup(postal_code)
    }
}
