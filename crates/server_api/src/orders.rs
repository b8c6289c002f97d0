use shared::{
    domain::{DispensaryCode, LineId, MedicineRef, Order, OrderNumber},
    error::{ApiError, ErrorCode},
    protocol::{LineDetails, OrderDetails, OrderHeader},
};
use storage::{AddLineOutcome, RemoveLineOutcome, ShipOrderOutcome};
use tracing::{info, warn};

use crate::{catalog::get_dispensary, internal, ApiContext};

/// Dispensaries that already received more than this many articles get a discount.
pub const LOYALTY_THRESHOLD_ARTICLES: i64 = 100;
pub const LOYALTY_DISCOUNT: f64 = 0.15;

pub async fn create_order(
    ctx: &ApiContext,
    code: &DispensaryCode,
) -> Result<OrderDetails, ApiError> {
    info!(dispensary = %code, "creating order");
    get_dispensary(ctx, code).await?;

    let delivered = ctx
        .storage
        .shipped_articles_for(code)
        .await
        .map_err(internal)?;
    let discount = if delivered > LOYALTY_THRESHOLD_ARTICLES {
        LOYALTY_DISCOUNT
    } else {
        0.0
    };

    let order = ctx
        .storage
        .create_order(code, discount)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found(format!("dispensary {code} not found")))?;
    order_details(ctx, order).await
}

pub async fn add_line(
    ctx: &ApiContext,
    number: OrderNumber,
    reference: MedicineRef,
    quantity: i64,
) -> Result<LineDetails, ApiError> {
    info!(
        order = number.0,
        medicine = reference.0,
        quantity,
        "adding order line"
    );
    if quantity <= 0 {
        return Err(ApiError::validation("quantity must be positive"));
    }

    let outcome = ctx
        .storage
        .add_order_line(number, reference, quantity)
        .await
        .map_err(internal)?;
    match outcome {
        AddLineOutcome::Added(line) => Ok(line.into()),
        AddLineOutcome::MedicineNotFound => Err(ApiError::not_found(format!(
            "medicine {} not found",
            reference.0
        ))),
        AddLineOutcome::MedicineUnavailable => {
            Err(ApiError::illegal_state("medicine is unavailable"))
        }
        AddLineOutcome::NotEnoughStock { free_units } => {
            warn!(medicine = reference.0, free_units, quantity, "not enough stock");
            Err(ApiError::illegal_state(format!(
                "not enough stock: {free_units} units free"
            )))
        }
        AddLineOutcome::OrderNotFound => Err(ApiError::not_found(format!(
            "order {} not found",
            number.0
        ))),
        AddLineOutcome::OrderShipped => Err(ApiError::illegal_state("order already shipped")),
    }
}

/// Removing a line that does not exist is accepted silently.
pub async fn remove_line(ctx: &ApiContext, id: LineId) -> Result<(), ApiError> {
    info!(line = id.0, "removing order line");
    match ctx.storage.remove_order_line(id).await.map_err(internal)? {
        RemoveLineOutcome::Removed | RemoveLineOutcome::Missing => Ok(()),
        RemoveLineOutcome::OrderShipped => Err(ApiError::illegal_state("order already shipped")),
    }
}

pub async fn ship_order(ctx: &ApiContext, number: OrderNumber) -> Result<OrderHeader, ApiError> {
    info!(order = number.0, "shipping order");
    match ctx.storage.ship_order(number).await.map_err(internal)? {
        ShipOrderOutcome::Shipped(order) => order_header(ctx, order).await,
        ShipOrderOutcome::OrderNotFound => Err(ApiError::not_found(format!(
            "order {} not found",
            number.0
        ))),
        ShipOrderOutcome::AlreadyShipped => Err(ApiError::illegal_state("order already shipped")),
    }
}

pub async fn get_order(ctx: &ApiContext, number: OrderNumber) -> Result<OrderDetails, ApiError> {
    let order = ctx
        .storage
        .order(number)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found(format!("order {} not found", number.0)))?;
    order_details(ctx, order).await
}

pub async fn pending_orders_for(
    ctx: &ApiContext,
    code: &DispensaryCode,
) -> Result<Vec<OrderHeader>, ApiError> {
    let dispensary = get_dispensary(ctx, code).await?;
    let orders = ctx
        .storage
        .pending_orders_for(code)
        .await
        .map_err(internal)?;
    Ok(orders
        .into_iter()
        .map(|order| OrderHeader {
            number: order.number,
            dispensary: dispensary.clone(),
            entered_on: order.entered_on,
        })
        .collect())
}

async fn order_header(ctx: &ApiContext, order: Order) -> Result<OrderHeader, ApiError> {
    let dispensary = owning_dispensary(ctx, &order).await?;
    Ok(OrderHeader {
        number: order.number,
        dispensary,
        entered_on: order.entered_on,
    })
}

async fn order_details(ctx: &ApiContext, order: Order) -> Result<OrderDetails, ApiError> {
    let dispensary = owning_dispensary(ctx, &order).await?;
    let lines = ctx
        .storage
        .order_lines(order.number)
        .await
        .map_err(internal)?;
    Ok(OrderDetails {
        number: order.number,
        entered_on: order.entered_on,
        shipped_on: order.shipped_on,
        discount: order.discount,
        dispensary,
        lines: lines.into_iter().map(LineDetails::from).collect(),
    })
}

async fn owning_dispensary(
    ctx: &ApiContext,
    order: &Order,
) -> Result<shared::domain::Dispensary, ApiError> {
    ctx.storage
        .dispensary(&order.dispensary_code)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            ApiError::new(
                ErrorCode::Internal,
                format!(
                    "order {} references missing dispensary {}",
                    order.number.0, order.dispensary_code
                ),
            )
        })
}
