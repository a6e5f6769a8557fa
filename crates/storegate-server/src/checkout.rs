//! Checkout workflow
//!
//! Creates, in order: the shipping address, the order, one document per line
//! item, and one file per attachment. Every successful write is tracked; if
//! any step fails the tracked writes are deleted newest first and the
//! original error is returned to the client.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use storegate_core::{Error, Result, Store};
use storegate_ingress::{IngressError, IngressResult, ResolvedStore};
use storegate_storage::TrackedWrites;
use tracing::{error, info, warn};

use crate::app::AppState;
use crate::pages::resolve_store;

pub const ADDRESSES_COLLECTION: &str = "addresses";
pub const ORDERS_COLLECTION: &str = "orders";
pub const ORDER_ITEMS_COLLECTION: &str = "order_items";
pub const ATTACHMENTS_BUCKET: &str = "order-attachments";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Shipping address, stored as given
    pub address: Value,
    pub lines: Vec<LineItem>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price_cents: u64,
}

/// Text attachment (gift note, engraving text, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub order_id: String,
    pub address_id: String,
    pub item_ids: Vec<String>,
    pub attachment_ids: Vec<String>,
}

fn default_content_type() -> String {
    "text/plain".to_string()
}

pub async fn checkout(
    State(state): State<AppState>,
    Path(subdomain): Path<String>,
    resolved: Option<Extension<ResolvedStore>>,
    Json(request): Json<CheckoutRequest>,
) -> IngressResult<(StatusCode, Json<CheckoutResponse>)> {
    let store = resolve_store(&state, &subdomain, resolved).await?;

    // Detached from the request future: a client disconnect must not stop
    // the workflow between writes or cut a rollback short.
    let workflow = tokio::spawn(run_checkout(state, store, request));
    let response = workflow.await.map_err(|e| {
        error!("Checkout task did not finish: {}", e);
        IngressError::Internal(format!("checkout task failed: {}", e))
    })??;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Place the order and commit, or roll back every tracked write
pub async fn run_checkout(
    state: AppState,
    store: Store,
    request: CheckoutRequest,
) -> IngressResult<CheckoutResponse> {
    let mut writes = TrackedWrites::new(state.documents.clone(), state.files.clone());

    match place_order(&mut writes, &store, request).await {
        Ok(response) => {
            writes.commit();
            info!(store_id = %store.id, order_id = %response.order_id, "Order placed");
            Ok(response)
        }
        Err(e) => {
            let tracked = writes.ledger().len();
            let (e, report) = writes.abort_with_report(e).await;
            if report.attempted > 0 {
                state.metrics.record_rollback(
                    "checkout",
                    report.deleted,
                    report.already_gone,
                    report.failed.len(),
                );
            }
            warn!(
                store_id = %store.id,
                tracked,
                rolled_back = report.deleted + report.already_gone,
                left_behind = report.failed.len(),
                "Checkout failed: {}",
                e
            );

            Err(match e {
                Error::InvalidRequest(msg) => IngressError::WorkflowFailed(msg),
                other => {
                    error!("Checkout backend failure: {}", other);
                    IngressError::WorkflowFailed("checkout could not be completed".to_string())
                }
            })
        }
    }
}

/// Run the checkout steps, tracking each write
///
/// Line items and attachments are validated as they are reached, so a bad
/// entry fails the workflow after earlier writes succeeded.
pub async fn place_order(
    writes: &mut TrackedWrites,
    store: &Store,
    request: CheckoutRequest,
) -> Result<CheckoutResponse> {
    let Value::Object(mut address) = request.address else {
        return Err(Error::InvalidRequest("address must be an object".to_string()));
    };
    if request.lines.is_empty() {
        return Err(Error::InvalidRequest("order has no line items".to_string()));
    }

    address.insert("store_id".to_string(), json!(store.id));
    let address_id = writes
        .create_document(ADDRESSES_COLLECTION, Value::Object(address))
        .await?;

    let total_cents = request.lines.iter().fold(0u64, |total, line| {
        total.saturating_add(line.unit_price_cents.saturating_mul(line.quantity as u64))
    });
    let order_id = writes
        .create_document(
            ORDERS_COLLECTION,
            json!({
                "store_id": store.id,
                "address_id": address_id,
                "status": "pending",
                "line_count": request.lines.len(),
                "total_cents": total_cents,
            }),
        )
        .await?;

    let mut item_ids = Vec::with_capacity(request.lines.len());
    for (index, line) in request.lines.iter().enumerate() {
        if line.quantity == 0 {
            return Err(Error::InvalidRequest(format!(
                "line {}: quantity must be at least 1",
                index + 1
            )));
        }
        if line.product_id.trim().is_empty() {
            return Err(Error::InvalidRequest(format!(
                "line {}: product_id is required",
                index + 1
            )));
        }

        let item_id = writes
            .create_document(
                ORDER_ITEMS_COLLECTION,
                json!({
                    "order_id": order_id,
                    "product_id": line.product_id,
                    "quantity": line.quantity,
                    "unit_price_cents": line.unit_price_cents,
                }),
            )
            .await?;
        item_ids.push(item_id);
    }

    let mut attachment_ids = Vec::with_capacity(request.attachments.len());
    for attachment in request.attachments {
        if attachment.name.trim().is_empty() {
            return Err(Error::InvalidRequest(
                "attachment name is required".to_string(),
            ));
        }

        let file_id = writes
            .upload_file(
                ATTACHMENTS_BUCKET,
                &attachment.name,
                &attachment.content_type,
                Bytes::from(attachment.content),
            )
            .await?;
        attachment_ids.push(file_id);
    }

    Ok(CheckoutResponse {
        order_id,
        address_id,
        item_ids,
        attachment_ids,
    })
}
