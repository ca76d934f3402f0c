use std::convert::Infallible;

use axum::{
    Form,
    extract::{Query, Request, State},
    response::Redirect,
    routing::get,
};
use tracing::instrument;

use crate::{
    checkout::settlement::{self, SettlementOutcome},
    gateway::{error::GatewayError, verify::Verification},
    state::AppState,
};

/// Parameters the gateway appends to the browser return. Untrusted input:
/// nothing here changes order state without an independent verification
/// call.
#[derive(Debug, Default, serde::Deserialize)]
pub struct CallbackParams {
    #[serde(rename = "transactionKey")]
    pub transaction_key: Option<String>,
    pub rvar_order_id: Option<String>,
}

/// The gateway puts the values in the form body on a POST return and in
/// the query string on a GET one, so both are read, form data first.
impl<S> axum::extract::FromRequest<S> for CallbackParams
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let query = Query::try_from_uri(req.uri()).map(|Query(q)| q).ok();
        let form = Form::from_request(req, state).await.map(|Form(f)| f).ok();
        Ok(Self::merged(query, form))
    }
}

impl CallbackParams {
    fn merged(query: Option<CallbackParams>, form: Option<CallbackParams>) -> Self {
        let query = query.unwrap_or_default();
        let form = form.unwrap_or_default();
        Self {
            transaction_key: non_empty(form.transaction_key).or(non_empty(query.transaction_key)),
            rvar_order_id: non_empty(form.rvar_order_id).or(non_empty(query.rvar_order_id)),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Every way the success return can end. One event is emitted per
/// category; the payer always lands on a storefront page and never sees
/// verification detail.
#[derive(Debug)]
enum Termination {
    MissingParameter,
    VerificationFailed(GatewayError),
    Declined { response_code: String },
    BadOrderReference(String),
    OrderNotFound(i64),
    OrderNotEligible(i64),
    SettlementFailed(sqlx::Error),
    Settled { order_id: i64 },
}

#[instrument(skip_all)]
async fn success_callback(State(state): State<AppState>, params: CallbackParams) -> Redirect {
    let termination = handle_success(&state, params).await;
    conclude(&state, termination)
}

async fn handle_success(state: &AppState, params: CallbackParams) -> Termination {
    let (Some(transaction_key), Some(order_reference)) =
        (params.transaction_key, params.rvar_order_id)
    else {
        return Termination::MissingParameter;
    };

    let values = match state.gateway.verify(&state.settings, &transaction_key).await {
        Ok(Verification::Approved(values)) => values,
        Ok(Verification::Declined(values)) => {
            return Termination::Declined {
                response_code: values.response_code().unwrap_or_default().to_string(),
            };
        }
        Err(e) => return Termination::VerificationFailed(e),
    };

    let order_id = match order_reference.parse::<i64>() {
        Ok(id) if id > 0 => id,
        _ => return Termination::BadOrderReference(order_reference),
    };

    match settlement::settle(&state.db, order_id, &values).await {
        Ok(SettlementOutcome::Settled) => Termination::Settled { order_id },
        Ok(SettlementOutcome::NotFound) => Termination::OrderNotFound(order_id),
        Ok(SettlementOutcome::NotEligible) => Termination::OrderNotEligible(order_id),
        Err(e) => Termination::SettlementFailed(e),
    }
}

/// The gateway is trusted here only for the fact that it chose the fail
/// route. Nothing to verify, nothing to update.
#[instrument(skip_all)]
async fn fail_callback(State(state): State<AppState>) -> Redirect {
    tracing::info!("Payment failed or was abandoned on the hosted page");
    Redirect::to(&state.settings.store_url)
}

fn conclude(state: &AppState, termination: Termination) -> Redirect {
    use Termination::*;

    match &termination {
        MissingParameter => {
            tracing::debug!("Callback without transactionKey or order reference, ignoring")
        }
        VerificationFailed(e) => tracing::error!("Transaction verification failed: {e}"),
        Declined { response_code } => {
            tracing::info!(%response_code, "Transaction declined by the gateway")
        }
        BadOrderReference(reference) => {
            tracing::warn!(%reference, "Callback order reference is not an order id")
        }
        OrderNotFound(order_id) => tracing::warn!(order_id, "Order in callback does not exist"),
        OrderNotEligible(order_id) => {
            tracing::info!(order_id, "Order is not awaiting payment, leaving it untouched")
        }
        SettlementFailed(e) => tracing::error!("Failed to settle order: {e}"),
        Settled { order_id } => tracing::info!(order_id, "Order marked as paid"),
    }

    match termination {
        Termination::Settled { order_id } => {
            Redirect::to(&state.settings.order_completed_url(order_id))
        }
        _ => Redirect::to(&state.settings.store_url),
    }
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/success", get(success_callback).post(success_callback))
        .route("/fail", get(fail_callback).post(fail_callback))
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use axum::{
        body::Body,
        http::{Request, header},
    };
    use tower::ServiceExt;

    use crate::{
        db::{Address, Db, PaymentStatus},
        gateway::MonerisGateway,
        settings::Settings,
        state::AppState,
    };

    const APPROVED: &str =
        "<response><response_code>0</response_code><txn_num>123456</txn_num></response>";
    const DECLINED: &str = "<response><response_code>99</response_code></response>";

    fn address() -> Address {
        Address {
            id: 0,
            first_name: "Ann".into(),
            last_name: "Chovey".into(),
            email: "ann@example.ca".into(),
            company: "".into(),
            address1: "100 King St W".into(),
            address2: "".into(),
            city: "Toronto".into(),
            postal_code: "M5X 1A9".into(),
            phone: "".into(),
            fax: "".into(),
            state_or_province: None,
            country: None,
        }
    }

    /// Loopback server answering every verification with `xml`, plus a
    /// counter of how often it was asked.
    async fn stub_gateway(xml: &'static str) -> (MonerisGateway, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let stub = axum::Router::new().route(
            "/verifyTxn.php",
            axum::routing::post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    xml
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, stub).await.unwrap() });
        (
            MonerisGateway::with_base_url(format!("http://{addr}")),
            hits,
        )
    }

    async fn state_with_order(gateway: MonerisGateway) -> (AppState, i64) {
        let db = Db::in_memory().await.unwrap();
        let billing = db.insert_address(&address()).await.unwrap();
        let order_id = db.insert_order(42, 4999, billing, None).await.unwrap();
        (
            AppState::new(db, gateway, Settings::for_tests()),
            order_id,
        )
    }

    fn app(state: AppState) -> axum::Router {
        axum::Router::new()
            .nest("/moneris", super::router())
            .with_state(state)
    }

    fn success_post(order_reference: &str) -> Request<Body> {
        Request::post("/moneris/success")
            .header(
                header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(Body::from(format!(
                "transactionKey=A1B2C3D4E5F6&rvar_order_id={order_reference}"
            )))
            .unwrap()
    }

    fn location(response: &axum::response::Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
    }

    #[tokio::test]
    async fn approved_callback_settles_and_completes_the_checkout() {
        let (gateway, _) = stub_gateway(APPROVED).await;
        let (state, order_id) = state_with_order(gateway).await;

        let response = app(state.clone())
            .oneshot(success_post(&order_id.to_string()))
            .await
            .unwrap();
        assert!(response.status().is_redirection());
        assert_eq!(
            location(&response),
            format!("http://store.test/checkout/completed/{order_id}")
        );

        let order = state.db.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(order.transaction_id.as_deref(), Some("123456"));
    }

    #[tokio::test]
    async fn query_string_parameters_are_accepted() {
        let (gateway, _) = stub_gateway(APPROVED).await;
        let (state, order_id) = state_with_order(gateway).await;

        let uri = format!(
            "/moneris/success?transactionKey=A1B2C3D4E5F6&rvar_order_id={order_id}"
        );
        let response = app(state.clone())
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_redirection());

        let order = state.db.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn missing_parameters_never_reach_the_gateway() {
        let (gateway, hits) = stub_gateway(APPROVED).await;
        let (state, order_id) = state_with_order(gateway).await;

        for uri in [
            "/moneris/success",
            "/moneris/success?transactionKey=A1B2C3D4E5F6",
            "/moneris/success?rvar_order_id=1",
            "/moneris/success?transactionKey=&rvar_order_id=1",
        ] {
            let response = app(state.clone())
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(location(&response), "http://store.test");
        }

        assert_eq!(hits.load(Ordering::SeqCst), 0, "no verification calls");
        let order = state.db.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn declined_callback_leaves_the_order_pending() {
        let (gateway, hits) = stub_gateway(DECLINED).await;
        let (state, order_id) = state_with_order(gateway).await;

        let response = app(state.clone())
            .oneshot(success_post(&order_id.to_string()))
            .await
            .unwrap();
        assert_eq!(location(&response), "http://store.test");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let order = state.db.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.transaction_id, None);
    }

    #[tokio::test]
    async fn unreachable_gateway_fails_closed() {
        let gateway = MonerisGateway::with_base_url("http://127.0.0.1:1");
        let (state, order_id) = state_with_order(gateway).await;

        let response = app(state.clone())
            .oneshot(success_post(&order_id.to_string()))
            .await
            .unwrap();
        assert_eq!(location(&response), "http://store.test");

        let order = state.db.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn unparseable_order_reference_touches_nothing() {
        let (gateway, _) = stub_gateway(APPROVED).await;
        let (state, order_id) = state_with_order(gateway).await;

        for reference in ["not-a-number", "-3", "0"] {
            let response = app(state.clone())
                .oneshot(success_post(reference))
                .await
                .unwrap();
            assert_eq!(location(&response), "http://store.test");
        }

        let order = state.db.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn duplicate_callback_is_a_silent_no_op() {
        let (gateway, _) = stub_gateway(APPROVED).await;
        let (state, order_id) = state_with_order(gateway).await;

        let first = app(state.clone())
            .oneshot(success_post(&order_id.to_string()))
            .await
            .unwrap();
        assert!(location(&first).contains("completed"));

        let second = app(state.clone())
            .oneshot(success_post(&order_id.to_string()))
            .await
            .unwrap();
        assert_eq!(location(&second), "http://store.test");

        let order = state.db.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.transaction_id.as_deref(), Some("123456"));
    }

    #[tokio::test]
    async fn fail_callback_redirects_home_without_verification() {
        let (gateway, hits) = stub_gateway(APPROVED).await;
        let (state, order_id) = state_with_order(gateway).await;

        let response = app(state.clone())
            .oneshot(Request::get("/moneris/fail").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(location(&response), "http://store.test");

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        let order = state.db.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Pending);
    }
}
