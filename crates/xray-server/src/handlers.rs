use alloy::primitives::Address;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use xray_abi::parse_index;
use xray_analysis::{records, TransactionRecord};

use crate::error::ApiError;
use crate::AppState;

pub async fn health() -> Json<&'static str> {
    Json("ok")
}

/// `GET /block/{height}`: annotated transactions of one block.
pub async fn block(
    State(state): State<Arc<AppState>>,
    Path(height): Path<String>,
) -> Result<Json<Vec<TransactionRecord>>, ApiError> {
    let height: u64 = height
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid block height `{height}`")))?;

    match state.analyzer.analyze_block(height).await {
        Ok(transactions) => Ok(Json(records(&transactions))),
        Err(err) => {
            tracing::warn!(block_number = height, error = %err, "block analysis failed");
            Err(ApiError::Internal("failed to load block"))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ContractQuery {
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub index: Option<String>,
    pub height: Option<String>,
}

/// `GET /contract/{address}/{field}?type=<abi type>[&index=<n>][&height=<h>]`
pub async fn contract_field(
    State(state): State<Arc<AppState>>,
    Path((address, field)): Path<(String, String)>,
    Query(query): Query<ContractQuery>,
) -> Result<Json<Value>, ApiError> {
    let contract = Address::from_str(&address)
        .map_err(|_| ApiError::BadRequest(format!("invalid contract address `{address}`")))?;
    let type_name = query
        .type_name
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("missing `type` query parameter".to_string()))?;
    let at = query
        .height
        .as_deref()
        .map(|height| {
            height
                .parse::<u64>()
                .map_err(|_| ApiError::BadRequest(format!("invalid block height `{height}`")))
        })
        .transpose()?;

    let value = match query.index.as_deref() {
        Some(index) => {
            let index = parse_index(index).map_err(|e| ApiError::BadRequest(e.to_string()))?;
            state
                .reader
                .read_indexed(contract, &field, index, type_name, at)
                .await?
        }
        None => state.reader.read_field(contract, &field, type_name, at).await?,
    };

    Ok(Json(json!({ "value": value.to_json() })))
}
