//! JSON request body binding.
//!
//! Decoding failures come back as traced [`Failure`]s whose [`Cause`] the
//! classifier understands, so a handler can simply propagate them with `?`:
//!
//! - malformed JSON becomes `400 invalid json`
//! - a value of the wrong type becomes `400 invalid value for field <path>`
//! - an empty body becomes `400 missing request body`
//! - failed [`Validate`] checks become `422` with every field message

use crate::types::Request;
use aegis_core::{Cause, Failure, Traced, Validate};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;

const BIND_CONTEXT: &str = "failed to bind request body as JSON";
const VALIDATE_CONTEXT: &str = "request body failed validation";

/// Reads the request body and deserializes it as JSON.
///
/// # Errors
///
/// Returns a traced failure carrying [`Cause::Syntax`],
/// [`Cause::TypeMismatch`] (with the dotted field path) or [`Cause::Eof`].
pub async fn bind_json<T: DeserializeOwned>(request: Request) -> Result<T, Failure> {
    let bytes = match request.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(never) => match never {},
    };

    decode(&bytes).map_err(|cause| Traced::wrap(cause, BIND_CONTEXT).into())
}

/// Like [`bind_json`], then runs the value's [`Validate`] checks.
///
/// # Errors
///
/// Everything [`bind_json`] returns, plus a traced [`Cause::Validation`]
/// listing every failed field.
pub async fn bind_validated_json<T>(request: Request) -> Result<T, Failure>
where
    T: DeserializeOwned + Validate,
{
    let value: T = bind_json(request).await?;
    value
        .validate()
        .map_err(|errors| Failure::from(Traced::wrap(errors, VALIDATE_CONTEXT)))?;
    Ok(value)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, Cause> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    let value = serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
        let field = field_path(error.path());
        Cause::from_json(error.into_inner(), field)
    })?;
    deserializer.end()?;
    Ok(value)
}

/// Renders the path to a failing value, empty for the document root.
fn field_path(path: &serde_path_to_error::Path) -> String {
    let rendered = path.to_string();
    if rendered == "." {
        String::new()
    } else {
        rendered
    }
}
