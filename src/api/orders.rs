use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use super::auth::TenantContext;
use super::error::ApiError;
use super::restaurants::READERS;
use super::state::AppState;
use crate::domain::identity::Role;
use crate::domain::order::{
    Order, OrderCommand, OrderFilter, OrderServiceError, OrderStatus, PlaceOrderRequest, QuoteRequest,
};

const PLACERS: &[Role] = &[Role::TenantAdmin, Role::Customer];
const OPERATORS: &[Role] = &[Role::TenantAdmin, Role::Staff];

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/orders/quote", web::post().to(quote))
        .service(
            web::resource("/orders")
                .route(web::get().to(list))
                .route(web::post().to(place)),
        )
        .route("/orders/{id}", web::get().to(get))
        .route("/orders/{id}/events", web::get().to(events))
        .route("/orders/{id}/confirm", web::post().to(confirm))
        .route("/orders/{id}/ready", web::post().to(mark_ready))
        .route("/orders/{id}/dispatch", web::post().to(dispatch))
        .route("/orders/{id}/deliver", web::post().to(deliver))
        .route("/orders/{id}/cancel", web::post().to(cancel))
        .route("/orders/{id}/fail", web::post().to(fail));
}

#[derive(Debug, Deserialize)]
struct PlaceOrderBody {
    /// Staff placing an order on behalf of a customer name them here
    customer_id: Option<Uuid>,
    #[serde(flatten)]
    order: PlaceOrderRequest,
}

#[derive(Debug, Default, Deserialize)]
struct ConfirmBody {
    estimated_ready_minutes: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct DispatchBody {
    courier: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ReasonBody {
    reason: Option<String>,
}

fn is_customer(ctx: &TenantContext) -> bool {
    ctx.role() == Role::Customer
}

/// Customers only ever see their own orders; anything else reads as missing.
async fn visible_order(state: &AppState, ctx: &TenantContext, id: Uuid) -> Result<Order, ApiError> {
    let order = state.orders.get(ctx.tenant, id).await?;
    if is_customer(ctx) && order.customer_id != ctx.user_id() {
        return Err(ApiError::NotFound(format!("Order not found: {id}")));
    }
    Ok(order)
}

async fn quote(
    state: web::Data<AppState>,
    ctx: TenantContext,
    body: web::Json<QuoteRequest>,
) -> Result<HttpResponse, ApiError> {
    ctx.require(READERS)?;
    Ok(HttpResponse::Ok().json(state.orders.quote(ctx.tenant, &body).await?))
}

async fn place(
    state: web::Data<AppState>,
    ctx: TenantContext,
    body: web::Json<PlaceOrderBody>,
) -> Result<HttpResponse, ApiError> {
    ctx.require(PLACERS)?;
    let body = body.into_inner();

    let customer_id = if is_customer(&ctx) {
        match body.customer_id {
            Some(id) if id != ctx.user_id() => {
                return Err(ApiError::Forbidden("Customers can only order for themselves".into()));
            }
            _ => ctx.user_id(),
        }
    } else {
        let id = body
            .customer_id
            .ok_or_else(|| ApiError::BadRequest("customer_id is required".into()))?;
        let customer = state.identity.get_user(ctx.tenant, id).await?;
        if customer.role != Role::Customer {
            return Err(ApiError::BadRequest(format!("User {id} is not a customer")));
        }
        id
    };

    let order = state
        .orders
        .place(ctx.tenant, customer_id, body.order, Some(ctx.user_id()))
        .await?;
    Ok(HttpResponse::Created().json(order))
}

async fn list(
    state: web::Data<AppState>,
    ctx: TenantContext,
    query: web::Query<OrderFilter>,
) -> Result<HttpResponse, ApiError> {
    ctx.require(READERS)?;
    let mut filter = query.into_inner();
    if is_customer(&ctx) {
        filter.customer_id = Some(ctx.user_id());
    }
    Ok(HttpResponse::Ok().json(state.orders.list(ctx.tenant, &filter).await?))
}

async fn get(state: web::Data<AppState>, ctx: TenantContext, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    ctx.require(READERS)?;
    Ok(HttpResponse::Ok().json(visible_order(&state, &ctx, path.into_inner()).await?))
}

async fn events(state: web::Data<AppState>, ctx: TenantContext, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    ctx.require(READERS)?;
    let id = path.into_inner();
    visible_order(&state, &ctx, id).await?;
    Ok(HttpResponse::Ok().json(state.orders.history(ctx.tenant, id).await?))
}

// ============================================================================
// Lifecycle
// ============================================================================

async fn run(state: &AppState, ctx: &TenantContext, id: Uuid, command: OrderCommand) -> Result<HttpResponse, ApiError> {
    let order = state
        .orders
        .transition(ctx.tenant, id, command, Some(ctx.user_id()))
        .await?;
    Ok(HttpResponse::Ok().json(order))
}

async fn confirm(
    state: web::Data<AppState>,
    ctx: TenantContext,
    path: web::Path<Uuid>,
    body: Option<web::Json<ConfirmBody>>,
) -> Result<HttpResponse, ApiError> {
    ctx.require(OPERATORS)?;
    let body = body.map(web::Json::into_inner).unwrap_or_default();
    let command = OrderCommand::Confirm {
        estimated_ready_minutes: body.estimated_ready_minutes,
    };
    run(&state, &ctx, path.into_inner(), command).await
}

async fn mark_ready(state: web::Data<AppState>, ctx: TenantContext, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    ctx.require(OPERATORS)?;
    run(&state, &ctx, path.into_inner(), OrderCommand::MarkReady).await
}

async fn dispatch(
    state: web::Data<AppState>,
    ctx: TenantContext,
    path: web::Path<Uuid>,
    body: Option<web::Json<DispatchBody>>,
) -> Result<HttpResponse, ApiError> {
    ctx.require(OPERATORS)?;
    let body = body.map(web::Json::into_inner).unwrap_or_default();
    run(&state, &ctx, path.into_inner(), OrderCommand::Dispatch { courier: body.courier }).await
}

async fn deliver(state: web::Data<AppState>, ctx: TenantContext, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    ctx.require(OPERATORS)?;
    run(&state, &ctx, path.into_inner(), OrderCommand::Deliver).await
}

async fn cancel(
    state: web::Data<AppState>,
    ctx: TenantContext,
    path: web::Path<Uuid>,
    body: Option<web::Json<ReasonBody>>,
) -> Result<HttpResponse, ApiError> {
    ctx.require(READERS)?;
    let id = path.into_inner();
    let body = body.map(web::Json::into_inner).unwrap_or_default();
    let command = OrderCommand::Cancel {
        reason: body.reason,
        canceled_by: Some(ctx.user_id()),
    };

    if !is_customer(&ctx) {
        return run(&state, &ctx, id, command).await;
    }

    // Customers may only withdraw their own order while it is still pending,
    // judged on the same stream version the cancel is appended to.
    visible_order(&state, &ctx, id).await?;
    let customer = ctx.user_id();
    let order = state
        .orders
        .transition_if(ctx.tenant, id, command, Some(customer), |order| {
            order.customer_id == customer && order.status == OrderStatus::Pending
        })
        .await
        .map_err(|err| match err {
            OrderServiceError::Refused(_) => {
                ApiError::Forbidden("Customers can only cancel orders that are still pending".into())
            }
            other => other.into(),
        })?;
    Ok(HttpResponse::Ok().json(order))
}

async fn fail(
    state: web::Data<AppState>,
    ctx: TenantContext,
    path: web::Path<Uuid>,
    body: Option<web::Json<ReasonBody>>,
) -> Result<HttpResponse, ApiError> {
    ctx.require(OPERATORS)?;
    let body = body.map(web::Json::into_inner).unwrap_or_default();
    let command = OrderCommand::Fail {
        reason: body.reason.unwrap_or_default(),
    };
    run(&state, &ctx, path.into_inner(), command).await
}
