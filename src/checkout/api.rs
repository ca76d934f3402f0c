use axum::{
    Json,
    extract::{Path, State},
    routing::post,
};
use serde::Serialize;
use tracing::instrument;

use crate::{
    checkout::{CheckoutErrorResponse, Result},
    gateway::{mask, redirect::RedirectFields},
    state::AppState,
};

/// Everything the storefront needs to render the auto-submitting form
/// that sends the customer to the hosted payment page.
#[derive(Debug, Serialize)]
pub struct RedirectHandoff {
    pub url: String,
    pub method: &'static str,
    pub fields: RedirectFields,
}

#[instrument(skip_all, fields(order_id = order_id))]
async fn pay(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<Json<RedirectHandoff>> {
    let order = state
        .db
        .get_order(order_id)
        .await
        .map_err(|e| CheckoutErrorResponse::internal(e.to_string()))?
        .ok_or_else(|| CheckoutErrorResponse::not_found(format!("order {order_id} not found")))?;

    let billing = state
        .db
        .get_address(order.billing_address_id)
        .await
        .map_err(|e| CheckoutErrorResponse::internal(e.to_string()))?;
    let shipping = match order.shipping_address_id {
        Some(id) => state
            .db
            .get_address(id)
            .await
            .map_err(|e| CheckoutErrorResponse::internal(e.to_string()))?,
        None => None,
    };

    let fields =
        RedirectFields::assemble(&state.settings, &order, billing.as_ref(), shipping.as_ref());
    let handoff = RedirectHandoff {
        url: state.gateway.payment_url(&state.settings),
        method: "POST",
        fields,
    };
    tracing::debug!(
        data = %mask::secure_serializable(&handoff),
        "Checkout handoff to the hosted payment page"
    );
    Ok(Json(handoff))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/checkout/{order_id}/pay", post(pay))
}
