use super::{ExecutorError, RawQueryResult};
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<RemoteError>>,
}

#[derive(Deserialize)]
struct RemoteError {
    message: Option<String>,
}

/// Validates a GraphQL response body and extracts its `data` payload.
pub fn classify(body: &str) -> Result<RawQueryResult, ExecutorError> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| ExecutorError::MalformedResponse(e.to_string()))?;

    if let Some(first) = envelope.errors.as_ref().and_then(|errors| errors.first()) {
        let message = first
            .message
            .clone()
            .unwrap_or_else(|| "Unknown error occurred".to_string());
        return Err(ExecutorError::RemoteQueryError(message));
    }

    match envelope.data {
        None | Some(Value::Null) => Err(ExecutorError::EmptyResponse),
        Some(data) => RawQueryResult::try_from(data),
    }
}
