use framework::processor::Processor;
use framework::sqlx::DatabaseProcessor;
use tracing::instrument;
use uuid::Uuid;

use crate::config::OrderingConfig;
use crate::entities::order::{
    CreateOrderOutcome, CreateOrderWithStock, Order, OrderLine, ShippingAddress,
};
use crate::pricing::{quote, CartLine};

#[derive(Clone)]
pub struct CheckoutService {
    pub db: DatabaseProcessor,
    pub config: OrderingConfig,
}

#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub buyer_id: Uuid,
    pub lines: Vec<OrderLine>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
}

#[derive(Debug)]
pub enum PlaceOrderResult {
    Placed(Order),
    EmptyCart,
    MissingAddressField(&'static str),
    MissingPaymentMethod,
    OutOfStock(Uuid),
}

impl Processor<PlaceOrder> for CheckoutService {
    type Output = PlaceOrderResult;
    type Error = framework::Error;
    #[instrument(skip_all, err)]
    async fn process(&self, input: PlaceOrder) -> Result<PlaceOrderResult, framework::Error> {
        if input.lines.is_empty() {
            return Ok(PlaceOrderResult::EmptyCart);
        }
        if let Some(field) = input.shipping_address.first_empty_field() {
            return Ok(PlaceOrderResult::MissingAddressField(field));
        }
        if input.payment_method.trim().is_empty() {
            return Ok(PlaceOrderResult::MissingPaymentMethod);
        }
        for line in &input.lines {
            if line.quantity < 1 {
                return Err(framework::Error::InvalidInput(format!(
                    "quantity for {} must be at least 1",
                    line.product_id
                )));
            }
            if line.price.is_sign_negative() {
                return Err(framework::Error::InvalidInput(format!(
                    "price for {} must not be negative",
                    line.product_id
                )));
            }
        }

        // The breakdown is recomputed here from the submitted lines; any
        // totals the client sent alongside are ignored.
        let cart: Vec<CartLine> = input
            .lines
            .iter()
            .map(|line| CartLine {
                price: line.price,
                quantity: line.quantity,
            })
            .collect();
        let prices = quote(&cart, &self.config);

        let outcome = self
            .db
            .process(CreateOrderWithStock {
                buyer_id: input.buyer_id,
                lines: input.lines,
                shipping_address: input.shipping_address,
                payment_method: input.payment_method,
                prices,
            })
            .await?;
        match outcome {
            CreateOrderOutcome::Created(order) => Ok(PlaceOrderResult::Placed(order)),
            CreateOrderOutcome::InsufficientStock(product_id) => {
                Ok(PlaceOrderResult::OutOfStock(product_id))
            }
        }
    }
}
