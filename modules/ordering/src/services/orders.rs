use auth::entities::db::account::CountAccounts;
use catalog::entities::product::CountProducts;
use framework::processor::Processor;
use framework::sqlx::DatabaseProcessor;
use rust_decimal::Decimal;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::order::{
    DeleteOrder, FindOrderById, ListAllOrders, ListOrdersByBuyer, Order, OrderLedgerTotals,
};

#[derive(Clone)]
pub struct OrderService {
    pub db: DatabaseProcessor,
}

#[derive(Debug, Clone, Copy)]
pub struct FetchOrder {
    pub id: Uuid,
}

impl Processor<FetchOrder> for OrderService {
    type Output = Order;
    type Error = framework::Error;
    async fn process(&self, input: FetchOrder) -> Result<Order, framework::Error> {
        self.db
            .process(FindOrderById { id: input.id })
            .await?
            .ok_or(framework::Error::NotFound)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FetchBuyerOrders {
    pub buyer_id: Uuid,
}

impl Processor<FetchBuyerOrders> for OrderService {
    type Output = Vec<Order>;
    type Error = framework::Error;
    async fn process(&self, input: FetchBuyerOrders) -> Result<Vec<Order>, framework::Error> {
        self.db
            .process(ListOrdersByBuyer {
                buyer_id: input.buyer_id,
            })
            .await
            .map_err(Into::into)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FetchAllOrders;

impl Processor<FetchAllOrders> for OrderService {
    type Output = Vec<Order>;
    type Error = framework::Error;
    async fn process(&self, _input: FetchAllOrders) -> Result<Vec<Order>, framework::Error> {
        self.db.process(ListAllOrders).await.map_err(Into::into)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RemoveOrder {
    pub id: Uuid,
}

impl Processor<RemoveOrder> for OrderService {
    type Output = ();
    type Error = framework::Error;
    #[instrument(skip_all, err)]
    async fn process(&self, input: RemoveOrder) -> Result<(), framework::Error> {
        let deleted = self.db.process(DeleteOrder { id: input.id }).await?;
        if deleted {
            Ok(())
        } else {
            Err(framework::Error::NotFound)
        }
    }
}

/// Aggregate figures for the admin dashboard.
#[derive(Debug, Clone, Copy)]
pub struct Summarize;

#[derive(Debug, Clone, Copy, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub users: i64,
    pub orders: i64,
    pub products: i64,
    pub total_sales: Decimal,
}

impl Processor<Summarize> for OrderService {
    type Output = Summary;
    type Error = framework::Error;
    #[instrument(skip_all, err)]
    async fn process(&self, _input: Summarize) -> Result<Summary, framework::Error> {
        let users = self.db.process(CountAccounts).await?;
        let products = self.db.process(CountProducts).await?;
        let ledger = self.db.process(OrderLedgerTotals).await?;
        Ok(Summary {
            users,
            orders: ledger.orders,
            products,
            total_sales: ledger.total_sales,
        })
    }
}
