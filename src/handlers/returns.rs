use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    entities::ReturnRequestModel,
    errors::ServiceError,
    services::returns::{CreateReturnInput, ProcessReturnInput},
    state::AppState,
};

/// Open a return for a delivered order item.
#[utoipa::path(
    post,
    path = "/api/v1/users/{user_id}/returns",
    params(("user_id" = Uuid, Path, description = "Order owner")),
    request_body = CreateReturnInput,
    responses(
        (status = 201, description = "Created return request", body = ReturnRequestModel),
        (status = 400, description = "Item not delivered, over-quantity or already returned"),
        (status = 404, description = "Item not found for this user")
    ),
    tag = "returns"
)]
pub async fn create_return(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(input): Json<CreateReturnInput>,
) -> Result<(StatusCode, Json<ReturnRequestModel>), ServiceError> {
    let request = state.returns.create_return(user_id, input).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/returns",
    params(("user_id" = Uuid, Path, description = "Order owner")),
    responses((status = 200, description = "The user's return requests", body = [ReturnRequestModel])),
    tag = "returns"
)]
pub async fn list_user_returns(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<ReturnRequestModel>>, ServiceError> {
    Ok(Json(state.returns.list_user_returns(user_id).await?))
}

/// Returns raised against a vendor's items.
#[utoipa::path(
    get,
    path = "/api/v1/vendors/{vendor_id}/returns",
    params(("vendor_id" = Uuid, Path, description = "Vendor id")),
    responses((status = 200, description = "Returns for the vendor's items", body = [ReturnRequestModel])),
    tag = "returns"
)]
pub async fn list_vendor_returns(
    State(state): State<Arc<AppState>>,
    Path(vendor_id): Path<Uuid>,
) -> Result<Json<Vec<ReturnRequestModel>>, ServiceError> {
    Ok(Json(state.returns.list_vendor_returns(vendor_id).await?))
}

/// Staff decision on a requested return.
#[utoipa::path(
    post,
    path = "/api/v1/returns/{return_id}/process",
    params(("return_id" = Uuid, Path, description = "Return request id")),
    request_body = ProcessReturnInput,
    responses(
        (status = 200, description = "Processed return", body = ReturnRequestModel),
        (status = 400, description = "Return already processed"),
        (status = 404, description = "Return not found")
    ),
    tag = "returns"
)]
pub async fn process_return(
    State(state): State<Arc<AppState>>,
    Path(return_id): Path<Uuid>,
    Json(input): Json<ProcessReturnInput>,
) -> Result<Json<ReturnRequestModel>, ServiceError> {
    Ok(Json(state.returns.process_return(return_id, input).await?))
}
