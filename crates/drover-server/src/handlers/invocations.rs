//! Inference handler

use crate::{
    error::{ServerError, ServerResult},
    server::ServerState,
};
use axum::{body::Bytes, extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Fields of an invocation body the server interprets; everything else is
/// passed through to the models untouched
#[derive(Debug, Clone, Deserialize)]
pub struct InvocationRequest {
    pub models: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvocationResponse {
    /// Models that served the request, duplicates removed
    pub models: Vec<String>,
    /// Output of each model keyed by identifier
    pub predictions: Map<String, Value>,
}

/// Make the requested models resident, then run each of them on the body
pub async fn invocations(
    State(state): State<ServerState>,
    body: Bytes,
) -> ServerResult<Json<InvocationResponse>> {
    let body: Value = serde_json::from_slice(&body)?;
    if !body.is_object() {
        return Err(ServerError::InvalidRequest(
            "Request body must be a JSON object".to_string(),
        ));
    }
    let request = InvocationRequest::deserialize(&body)?;

    let lease = state.cache.ensure_loaded(request.models.as_slice()).await?;

    let mut predictions = Map::new();
    for (id, model) in lease.iter() {
        debug!(model = %id, kind = %model.kind(), "Running inference");
        let output = model.infer(&body).await?;
        predictions.insert(id.to_string(), output);
    }

    Ok(Json(InvocationResponse {
        models: lease.ids().map(str::to_string).collect(),
        predictions,
    }))
}
