use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::*;

use sse::error::{Error as SseError, ErrorKind as SseErrorKind};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(SseError);

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.0)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{}", self.0)
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.0.error_kind {
            SseErrorKind::UnsupportedTransport(ref kind) => {
                error!("Unable to start event stream: {kind:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
            }
            // A closed stream has no response left to write into; surface it
            // as gone if a handler lets one escape.
            SseErrorKind::ClientClosed => (StatusCode::GONE, "GONE").into_response(),
        }
    }
}

impl<E> From<E> for Error
where
    E: Into<SseError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sse::error::{client_closed, unsupported_transport, TransportErrorKind};

    #[test]
    fn test_unsupported_transport_is_internal_server_error() {
        for kind in [TransportErrorKind::Flush, TransportErrorKind::CloseNotify] {
            let response = Error::from(unsupported_transport(kind)).into_response();

            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_client_closed_is_gone() {
        let response = Error::from(client_closed()).into_response();

        assert_eq!(response.status(), StatusCode::GONE);
    }
}
