use crate::{
    db::{Db, PaymentStatus},
    gateway::verify::VerificationValues,
};

/// What applying a verified approval to an order amounted to.
#[derive(Debug, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// The order moved from pending to paid.
    Settled,
    NotFound,
    /// Already paid or cancelled. Duplicate and late callbacks end here.
    NotEligible,
}

/// Marks the order as paid, exactly once, and records the provider
/// transaction number when the verification reported one.
///
/// The eligibility check and the transition are a single conditional
/// update keyed on the current payment status, so two near-simultaneous
/// callbacks for the same order cannot both settle it. The lookup ahead
/// of it only classifies the no-op cases.
pub async fn settle(
    db: &Db,
    order_id: i64,
    values: &VerificationValues,
) -> sqlx::Result<SettlementOutcome> {
    let Some(order) = db.get_order(order_id).await? else {
        return Ok(SettlementOutcome::NotFound);
    };
    if order.payment_status != PaymentStatus::Pending {
        return Ok(SettlementOutcome::NotEligible);
    }
    let settled = db.mark_paid(order_id, values.txn_num()).await?;
    Ok(if settled {
        SettlementOutcome::Settled
    } else {
        SettlementOutcome::NotEligible
    })
}
