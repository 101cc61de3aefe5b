//! JSON-over-HTTP helper shared by the provider crates.

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use crate::ports::PortError;

/// Send a request and decode its JSON body.
///
/// Transport failures and non-success statuses map to [`PortError::Unavailable`],
/// bodies that do not fit `T` map to [`PortError::Decode`]. Request URLs are stripped
/// from transport errors since providers carry their API keys in them.
///
/// # Errors
///
/// Returns a [`PortError`] as described above.
pub async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, PortError> {
    let body = req
        .send()
        .await
        .map_err(unavailable)?
        .error_for_status()
        .map_err(unavailable)?
        .bytes()
        .await
        .map_err(unavailable)?;

    serde_json::from_slice(&body).map_err(PortError::from)
}

fn unavailable(err: reqwest::Error) -> PortError {
    PortError::Unavailable(err.without_url())
}
