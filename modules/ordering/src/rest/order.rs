use auth::rest::middleware::{AdminUser, CurrentUser};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use framework::processor::Processor;
use serde_json::json;
use uuid::Uuid;

use crate::entities::order::{Order, OrderLine, ShippingAddress};
use crate::services::checkout::{CheckoutService, PlaceOrder, PlaceOrderResult};
use crate::services::fulfillment::{
    FulfillmentService, MarkDelivered, MarkDeliveredResult, MarkPaid, MarkPaidResult,
};
use crate::services::orders::{
    FetchAllOrders, FetchBuyerOrders, FetchOrder, OrderService, RemoveOrder, Summarize,
};

#[derive(Clone)]
pub struct OrderRestState {
    pub checkout: CheckoutService,
    pub fulfillment: FulfillmentService,
    pub orders: OrderService,
}

pub fn router(state: OrderRestState) -> Router {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/summary", get(summary))
        .route("/mine", get(my_orders))
        .route("/{id}", get(get_order).delete(delete_order))
        .route("/{id}/pay", put(pay_order))
        .route("/{id}/deliver", put(deliver_order))
        .with_state(state)
}

/// Order creation payload. Client-computed totals may arrive alongside these
/// fields for backwards compatibility; they are not read, the server quotes
/// the cart itself.
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrderRequest {
    #[serde(default)]
    order_items: Vec<OrderLine>,
    shipping_address: ShippingAddress,
    payment_method: String,
}

async fn create_order(
    user: CurrentUser,
    State(state): State<OrderRestState>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Response, framework::Error> {
    let result = state
        .checkout
        .process(PlaceOrder {
            buyer_id: user.id,
            lines: req.order_items,
            shipping_address: req.shipping_address,
            payment_method: req.payment_method,
        })
        .await?;
    match result {
        PlaceOrderResult::Placed(order) => Ok((
            StatusCode::CREATED,
            Json(json!({ "message": "New Order Created", "order": order })),
        )
            .into_response()),
        PlaceOrderResult::EmptyCart => Err(framework::Error::InvalidInput(
            "Order items are required".to_owned(),
        )),
        PlaceOrderResult::MissingAddressField(field) => Err(framework::Error::InvalidInput(
            format!("shipping address field {field} is required"),
        )),
        PlaceOrderResult::MissingPaymentMethod => Err(framework::Error::InvalidInput(
            "payment method is required".to_owned(),
        )),
        PlaceOrderResult::OutOfStock(product_id) => Err(framework::Error::Conflict(format!(
            "product {product_id} is out of stock"
        ))),
    }
}

async fn list_orders(
    _admin: AdminUser,
    State(state): State<OrderRestState>,
) -> Result<Json<Vec<Order>>, framework::Error> {
    let orders = state.orders.process(FetchAllOrders).await?;
    Ok(Json(orders))
}

async fn my_orders(
    user: CurrentUser,
    State(state): State<OrderRestState>,
) -> Result<Json<Vec<Order>>, framework::Error> {
    let orders = state
        .orders
        .process(FetchBuyerOrders { buyer_id: user.id })
        .await?;
    Ok(Json(orders))
}

async fn summary(
    _admin: AdminUser,
    State(state): State<OrderRestState>,
) -> Result<Response, framework::Error> {
    let summary = state.orders.process(Summarize).await?;
    Ok(Json(summary).into_response())
}

async fn get_order(
    _user: CurrentUser,
    State(state): State<OrderRestState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, framework::Error> {
    let order = state.orders.process(FetchOrder { id }).await?;
    Ok(Json(order))
}

#[derive(serde::Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PayOrderRequest {
    payment_reference: Option<String>,
}

async fn pay_order(
    _user: CurrentUser,
    State(state): State<OrderRestState>,
    Path(id): Path<Uuid>,
    body: axum::body::Bytes,
) -> Result<Response, framework::Error> {
    // Existing clients PUT anything from an empty body to a stray object
    // here; only a well-formed paymentReference is acted upon.
    let req: PayOrderRequest = if body.is_empty() {
        PayOrderRequest::default()
    } else {
        serde_json::from_slice(&body).unwrap_or_default()
    };
    let result = state
        .fulfillment
        .process(MarkPaid {
            order_id: id,
            payment_reference: req.payment_reference,
        })
        .await?;
    match result {
        MarkPaidResult::Paid(order) => {
            Ok(Json(json!({ "message": "Order Paid", "order": order })).into_response())
        }
        MarkPaidResult::AlreadyPaid => Err(framework::Error::Conflict(
            "Order is already paid".to_owned(),
        )),
        MarkPaidResult::NotFound => Err(framework::Error::NotFound),
        MarkPaidResult::Unverified => Ok((
            StatusCode::PAYMENT_REQUIRED,
            Json(json!({ "message": "payment could not be verified" })),
        )
            .into_response()),
    }
}

async fn deliver_order(
    _admin: AdminUser,
    State(state): State<OrderRestState>,
    Path(id): Path<Uuid>,
) -> Result<Response, framework::Error> {
    let result = state
        .fulfillment
        .process(MarkDelivered { order_id: id })
        .await?;
    match result {
        MarkDeliveredResult::Delivered(_) => {
            Ok(Json(json!({ "message": "Order Delivered" })).into_response())
        }
        MarkDeliveredResult::AlreadyDelivered => Err(framework::Error::Conflict(
            "Order is already delivered".to_owned(),
        )),
        MarkDeliveredResult::NotPaidYet => Err(framework::Error::Conflict(
            "Order has not been paid".to_owned(),
        )),
        MarkDeliveredResult::NotFound => Err(framework::Error::NotFound),
    }
}

async fn delete_order(
    _admin: AdminUser,
    State(state): State<OrderRestState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, framework::Error> {
    state.orders.process(RemoveOrder { id }).await?;
    Ok(Json(json!({ "message": "Order Deleted" })))
}
