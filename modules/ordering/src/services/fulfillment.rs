use framework::now_time;
use framework::processor::Processor;
use framework::sqlx::DatabaseProcessor;
use tracing::instrument;
use uuid::Uuid;

use crate::config::OrderingConfig;
use crate::entities::order::{FindOrderById, MarkOrderDelivered, MarkOrderPaid, Order};
use crate::services::payment::PaymentGateway;

#[derive(Clone)]
pub struct FulfillmentService {
    pub db: DatabaseProcessor,
    /// When absent the payment transition trusts the caller; production
    /// deployments configure a gateway.
    pub gateway: Option<PaymentGateway>,
    pub config: OrderingConfig,
}

#[derive(Debug, Clone)]
pub struct MarkPaid {
    pub order_id: Uuid,
    /// Charge reference from the payment widget, verified against the
    /// provider when a gateway is configured.
    pub payment_reference: Option<String>,
}

#[derive(Debug)]
pub enum MarkPaidResult {
    Paid(Order),
    AlreadyPaid,
    NotFound,
    /// The provider did not confirm the charge (or no reference was given
    /// while verification is required).
    Unverified,
}

impl Processor<MarkPaid> for FulfillmentService {
    type Output = MarkPaidResult;
    type Error = framework::Error;
    #[instrument(skip_all, err)]
    async fn process(&self, input: MarkPaid) -> Result<MarkPaidResult, framework::Error> {
        if let Some(gateway) = &self.gateway {
            let Some(reference) = input.payment_reference.as_deref() else {
                return Ok(MarkPaidResult::Unverified);
            };
            if !gateway.is_settled(reference).await? {
                return Ok(MarkPaidResult::Unverified);
            }
        }
        let updated = self
            .db
            .process(MarkOrderPaid {
                id: input.order_id,
                paid_at: now_time(),
            })
            .await?;
        if let Some(order) = updated {
            return Ok(MarkPaidResult::Paid(order));
        }
        // The conditional update matched nothing: either the order is gone
        // or it was already paid.
        match self.db.process(FindOrderById { id: input.order_id }).await? {
            Some(_) => Ok(MarkPaidResult::AlreadyPaid),
            None => Ok(MarkPaidResult::NotFound),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MarkDelivered {
    pub order_id: Uuid,
}

/// Delivery policy: with `require_paid` off (the default) an unpaid order
/// may still be delivered.
pub fn delivery_allowed(is_paid: bool, require_paid: bool) -> bool {
    is_paid || !require_paid
}

#[derive(Debug)]
pub enum MarkDeliveredResult {
    Delivered(Order),
    AlreadyDelivered,
    NotFound,
    /// Only reachable with `require_paid_before_delivery` enabled.
    NotPaidYet,
}

impl Processor<MarkDelivered> for FulfillmentService {
    type Output = MarkDeliveredResult;
    type Error = framework::Error;
    #[instrument(skip_all, err)]
    async fn process(&self, input: MarkDelivered) -> Result<MarkDeliveredResult, framework::Error> {
        let require_paid = self.config.require_paid_before_delivery;
        let updated = self
            .db
            .process(MarkOrderDelivered {
                id: input.order_id,
                delivered_at: now_time(),
                require_paid,
            })
            .await?;
        if let Some(order) = updated {
            return Ok(MarkDeliveredResult::Delivered(order));
        }
        match self.db.process(FindOrderById { id: input.order_id }).await? {
            Some(order) if order.is_delivered => Ok(MarkDeliveredResult::AlreadyDelivered),
            Some(order) if !delivery_allowed(order.is_paid, require_paid) => {
                Ok(MarkDeliveredResult::NotPaidYet)
            }
            // The order changed between the two statements; report the
            // conservative answer.
            Some(_) => Ok(MarkDeliveredResult::AlreadyDelivered),
            None => Ok(MarkDeliveredResult::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpaid_orders_are_deliverable_by_default() {
        assert!(delivery_allowed(false, false));
        assert!(delivery_allowed(true, false));
    }

    #[test]
    fn strict_policy_blocks_delivery_before_payment() {
        assert!(!delivery_allowed(false, true));
        assert!(delivery_allowed(true, true));
    }
}
