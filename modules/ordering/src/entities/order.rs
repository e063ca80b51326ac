use framework::processor::Processor;
use framework::sqlx::DatabaseProcessor;
use rust_decimal::Decimal;
use time::PrimitiveDateTime;
use tracing::{info_span, instrument, Instrument};
use uuid::Uuid;

use crate::pricing::PriceBreakdown;

const ORDER_COLUMNS: &str = "id, buyer_id, items, shipping_address, payment_method, \
     items_price, shipping_price, tax_price, total_price, \
     is_paid, paid_at, is_delivered, delivered_at, created_at";

/// Snapshot of one purchased product, captured at order creation. Later
/// catalog edits never reach back into a placed order.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OrderLine {
    #[serde(rename = "product", alias = "_id")]
    pub product_id: Uuid,
    pub name: String,
    pub image: String,
    pub price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub phone: String,
}

impl ShippingAddress {
    /// Every field is required before an order may be created.
    pub fn first_empty_field(&self) -> Option<&'static str> {
        [
            ("fullName", &self.full_name),
            ("address", &self.address),
            ("city", &self.city),
            ("country", &self.country),
            ("phone", &self.phone),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "user")]
    pub buyer_id: Uuid,
    #[serde(rename = "orderItems")]
    pub items: sqlx::types::Json<Vec<OrderLine>>,
    pub shipping_address: sqlx::types::Json<ShippingAddress>,
    pub payment_method: String,
    pub items_price: Decimal,
    pub shipping_price: Decimal,
    pub tax_price: Decimal,
    pub total_price: Decimal,
    pub is_paid: bool,
    pub paid_at: Option<PrimitiveDateTime>,
    pub is_delivered: bool,
    pub delivered_at: Option<PrimitiveDateTime>,
    pub created_at: PrimitiveDateTime,
}

/// Creates the order and reserves stock in one transaction: every line
/// decrements its product conditionally on sufficient inventory, so two
/// buyers can never both take the last unit.
#[derive(Debug, Clone)]
pub struct CreateOrderWithStock {
    pub buyer_id: Uuid,
    pub lines: Vec<OrderLine>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub prices: PriceBreakdown,
}

#[derive(Debug, Clone)]
pub enum CreateOrderOutcome {
    Created(Order),
    InsufficientStock(Uuid),
}

impl Processor<CreateOrderWithStock> for DatabaseProcessor {
    type Output = CreateOrderOutcome;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL-Transaction:CreateOrderWithStock", err)]
    async fn process(&self, input: CreateOrderWithStock) -> Result<CreateOrderOutcome, sqlx::Error> {
        let mut tx = self
            .db()
            .begin()
            .instrument(info_span!("<Transaction Begin>"))
            .await?;
        for line in &input.lines {
            let updated = sqlx::query(
                r#"
                UPDATE "shop"."product"
                SET count_in_stock = count_in_stock - $2, updated_at = NOW()
                WHERE id = $1 AND count_in_stock >= $2
                "#,
            )
            .bind(line.product_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;
            if updated.rows_affected() == 0 {
                tx.rollback()
                    .instrument(info_span!("<Transaction Rollback>"))
                    .await?;
                return Ok(CreateOrderOutcome::InsufficientStock(line.product_id));
            }
        }
        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO "shop"."user_order"
                (buyer_id, items, shipping_address, payment_method,
                 items_price, shipping_price, tax_price, total_price)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(input.buyer_id)
        .bind(sqlx::types::Json(&input.lines))
        .bind(sqlx::types::Json(&input.shipping_address))
        .bind(&input.payment_method)
        .bind(input.prices.items_price)
        .bind(input.prices.shipping_price)
        .bind(input.prices.tax_price)
        .bind(input.prices.total_price)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit()
            .instrument(info_span!("<Transaction Commit>"))
            .await?;
        Ok(CreateOrderOutcome::Created(order))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FindOrderById {
    pub id: Uuid,
}

impl Processor<FindOrderById> for DatabaseProcessor {
    type Output = Option<Order>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:FindOrderById", err)]
    async fn process(&self, input: FindOrderById) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            r#"SELECT {ORDER_COLUMNS} FROM "shop"."user_order" WHERE id = $1"#
        ))
        .bind(input.id)
        .fetch_optional(self.db())
        .await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ListOrdersByBuyer {
    pub buyer_id: Uuid,
}

impl Processor<ListOrdersByBuyer> for DatabaseProcessor {
    type Output = Vec<Order>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:ListOrdersByBuyer", err)]
    async fn process(&self, input: ListOrdersByBuyer) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM "shop"."user_order"
            WHERE buyer_id = $1
            ORDER BY created_at DESC, id ASC
            "#
        ))
        .bind(input.buyer_id)
        .fetch_all(self.db())
        .await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ListAllOrders;

impl Processor<ListAllOrders> for DatabaseProcessor {
    type Output = Vec<Order>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:ListAllOrders", err)]
    async fn process(&self, _input: ListAllOrders) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM "shop"."user_order"
            ORDER BY created_at DESC, id ASC
            "#
        ))
        .fetch_all(self.db())
        .await
    }
}

/// One-shot payment transition: the row is only touched while `is_paid` is
/// still false, so concurrent confirmations cannot double-stamp `paid_at`.
#[derive(Debug, Clone, Copy)]
pub struct MarkOrderPaid {
    pub id: Uuid,
    pub paid_at: PrimitiveDateTime,
}

impl Processor<MarkOrderPaid> for DatabaseProcessor {
    type Output = Option<Order>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:MarkOrderPaid", err)]
    async fn process(&self, input: MarkOrderPaid) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE "shop"."user_order"
            SET is_paid = TRUE, paid_at = $2
            WHERE id = $1 AND is_paid = FALSE
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(input.id)
        .bind(input.paid_at)
        .fetch_optional(self.db())
        .await
    }
}

/// One-shot delivery transition. When `require_paid` is set the update also
/// refuses rows that have not been paid, keeping the policy check inside the
/// same atomic statement.
#[derive(Debug, Clone, Copy)]
pub struct MarkOrderDelivered {
    pub id: Uuid,
    pub delivered_at: PrimitiveDateTime,
    pub require_paid: bool,
}

impl Processor<MarkOrderDelivered> for DatabaseProcessor {
    type Output = Option<Order>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:MarkOrderDelivered", err)]
    async fn process(&self, input: MarkOrderDelivered) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE "shop"."user_order"
            SET is_delivered = TRUE, delivered_at = $2
            WHERE id = $1 AND is_delivered = FALSE AND (is_paid OR NOT $3)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(input.id)
        .bind(input.delivered_at)
        .bind(input.require_paid)
        .fetch_optional(self.db())
        .await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteOrder {
    pub id: Uuid,
}

impl Processor<DeleteOrder> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:DeleteOrder", err)]
    async fn process(&self, input: DeleteOrder) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(r#"DELETE FROM "shop"."user_order" WHERE id = $1"#)
            .bind(input.id)
            .execute(self.db())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrderLedgerTotals;

#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct LedgerTotals {
    pub orders: i64,
    pub total_sales: Decimal,
}

impl Processor<OrderLedgerTotals> for DatabaseProcessor {
    type Output = LedgerTotals;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:OrderLedgerTotals", err)]
    async fn process(&self, _input: OrderLedgerTotals) -> Result<LedgerTotals, sqlx::Error> {
        sqlx::query_as::<_, LedgerTotals>(
            r#"
            SELECT COUNT(*) AS orders,
                   COALESCE(SUM(total_price) FILTER (WHERE is_paid), 0) AS total_sales
            FROM "shop"."user_order"
            "#,
        )
        .fetch_one(self.db())
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Ada Lovelace".to_owned(),
            address: "12 Analytical Row".to_owned(),
            city: "London".to_owned(),
            country: "UK".to_owned(),
            phone: "+44 20 0000 0000".to_owned(),
        }
    }

    #[test]
    fn complete_addresses_pass_validation() {
        assert_eq!(address().first_empty_field(), None);
    }

    #[test]
    fn blank_fields_are_reported_by_wire_name() {
        let mut missing_city = address();
        missing_city.city = "   ".to_owned();
        assert_eq!(missing_city.first_empty_field(), Some("city"));

        let mut missing_phone = address();
        missing_phone.phone = String::new();
        assert_eq!(missing_phone.first_empty_field(), Some("phone"));
    }

    #[test]
    fn order_lines_accept_the_client_cart_shape() -> Result<(), serde_json::Error> {
        // the client posts cart items whose product reference is `_id`
        let line: OrderLine = serde_json::from_value(serde_json::json!({
            "_id": "7f2c1a70-0d8f-4f5e-9a2d-3f3ad0f6f2a1",
            "name": "Walnut Desk Lamp",
            "image": "https://media.example/lamp.jpg",
            "price": 49.99,
            "quantity": 2,
            "slug": "walnut-desk-lamp"
        }))?;
        assert_eq!(line.quantity, 2);
        // persisted snapshots use the `product` key
        let value = serde_json::to_value(&line)?;
        assert!(value.get("product").is_some());
        assert!(value.get("_id").is_none());
        Ok(())
    }
}
