//! Pharmacy credit account (khata) endpoints

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use khata_service::{
    AccountDetail, AccountFilter, CreateAccountRequest, CreditAccount, KhataSummary, LedgerPosting,
    LedgerVerification, RecordAdjustmentRequest, RecordPaymentRequest, RecordRefundRequest, RecordSaleRequest,
    UpdateAccountRequest,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::error::{api_list, api_success, ApiResponse, ApiResult};
use crate::middleware::ClinicContext;
use crate::server::ClinicServer;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AccountListQuery {
    /// Case-insensitive match on customer name or phone
    pub search: Option<String>,
    pub active: Option<bool>,
}

impl From<AccountListQuery> for AccountFilter {
    fn from(q: AccountListQuery) -> Self {
        AccountFilter {
            search: q.search,
            active: q.active,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/clinic/pharmacy/credit-accounts",
    params(AccountListQuery),
    responses((status = 200, description = "Credit accounts ordered by name", body = Vec<CreditAccount>)),
    tag = "khata"
)]
pub async fn list_accounts(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Query(q): Query<AccountListQuery>,
) -> ApiResult<Json<ApiResponse<Vec<CreditAccount>>>> {
    let accounts = server.khata.list_accounts(ctx.clinic_id, &q.into()).await?;
    Ok(Json(api_list(accounts)))
}

#[utoipa::path(
    post,
    path = "/api/clinic/pharmacy/credit-accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account opened", body = CreditAccount),
        (status = 400, description = "Invalid request")
    ),
    tag = "khata"
)]
pub async fn create_account(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Json(req): Json<CreateAccountRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<CreditAccount>>)> {
    let account = server.khata.create_account(ctx.clinic_id, req).await?;
    Ok((StatusCode::CREATED, Json(api_success(account))))
}

#[utoipa::path(
    get,
    path = "/api/clinic/pharmacy/credit-accounts/summary",
    responses((status = 200, description = "Outstanding totals", body = KhataSummary)),
    tag = "khata"
)]
pub async fn summary(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
) -> ApiResult<Json<ApiResponse<KhataSummary>>> {
    let summary = server.khata.summary(ctx.clinic_id).await?;
    Ok(Json(api_success(summary)))
}

#[utoipa::path(
    get,
    path = "/api/clinic/pharmacy/credit-accounts/{id}",
    params(("id" = Uuid, Path, description = "Credit account ID")),
    responses(
        (status = 200, description = "Account with its ledger and referenced sales", body = AccountDetail),
        (status = 404, description = "Account not found")
    ),
    tag = "khata"
)]
pub async fn get_account(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<AccountDetail>>> {
    let detail = server.khata.get_account_detail(ctx.clinic_id, id).await?;
    Ok(Json(api_success(detail)))
}

#[utoipa::path(
    patch,
    path = "/api/clinic/pharmacy/credit-accounts/{id}",
    params(("id" = Uuid, Path, description = "Credit account ID")),
    request_body = UpdateAccountRequest,
    responses((status = 200, description = "Account updated", body = CreditAccount)),
    tag = "khata"
)]
pub async fn update_account(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAccountRequest>,
) -> ApiResult<Json<ApiResponse<CreditAccount>>> {
    let account = server.khata.update_account(ctx.clinic_id, id, req).await?;
    Ok(Json(api_success(account)))
}

#[utoipa::path(
    post,
    path = "/api/clinic/pharmacy/credit-accounts/{id}/sale",
    params(("id" = Uuid, Path, description = "Credit account ID")),
    request_body = RecordSaleRequest,
    responses(
        (status = 201, description = "Sale posted", body = LedgerPosting),
        (status = 409, description = "Credit limit exceeded or account inactive")
    ),
    tag = "khata"
)]
pub async fn record_sale(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Path(id): Path<Uuid>,
    Json(req): Json<RecordSaleRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<LedgerPosting>>)> {
    let posting = server.khata.record_sale(ctx.clinic_id, id, req).await?;
    Ok((StatusCode::CREATED, Json(api_success(posting))))
}

#[utoipa::path(
    post,
    path = "/api/clinic/pharmacy/credit-accounts/{id}/payment",
    params(("id" = Uuid, Path, description = "Credit account ID")),
    request_body = RecordPaymentRequest,
    responses(
        (status = 201, description = "Payment posted", body = LedgerPosting),
        (status = 422, description = "Payment exceeds the outstanding balance")
    ),
    tag = "khata"
)]
pub async fn record_payment(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Path(id): Path<Uuid>,
    Json(req): Json<RecordPaymentRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<LedgerPosting>>)> {
    let posting = server.khata.record_payment(ctx.clinic_id, id, req).await?;
    Ok((StatusCode::CREATED, Json(api_success(posting))))
}

#[utoipa::path(
    post,
    path = "/api/clinic/pharmacy/credit-accounts/{id}/refund",
    params(("id" = Uuid, Path, description = "Credit account ID")),
    request_body = RecordRefundRequest,
    responses(
        (status = 201, description = "Refund posted", body = LedgerPosting),
        (status = 422, description = "Refund exceeds the outstanding balance")
    ),
    tag = "khata"
)]
pub async fn record_refund(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Path(id): Path<Uuid>,
    Json(req): Json<RecordRefundRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<LedgerPosting>>)> {
    let posting = server.khata.record_refund(ctx.clinic_id, id, req).await?;
    Ok((StatusCode::CREATED, Json(api_success(posting))))
}

#[utoipa::path(
    post,
    path = "/api/clinic/pharmacy/credit-accounts/{id}/adjustment",
    params(("id" = Uuid, Path, description = "Credit account ID")),
    request_body = RecordAdjustmentRequest,
    responses((status = 201, description = "Adjustment posted", body = LedgerPosting)),
    tag = "khata"
)]
pub async fn record_adjustment(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Path(id): Path<Uuid>,
    Json(req): Json<RecordAdjustmentRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<LedgerPosting>>)> {
    let posting = server.khata.record_adjustment(ctx.clinic_id, id, req).await?;
    Ok((StatusCode::CREATED, Json(api_success(posting))))
}

#[utoipa::path(
    get,
    path = "/api/clinic/pharmacy/credit-accounts/{id}/verify",
    params(("id" = Uuid, Path, description = "Credit account ID")),
    responses((status = 200, description = "Ledger replay against the cached balance", body = LedgerVerification)),
    tag = "khata"
)]
pub async fn verify_account(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<LedgerVerification>>> {
    let report = server.khata.verify_account(ctx.clinic_id, id).await?;
    Ok(Json(api_success(report)))
}

#[utoipa::path(
    get,
    path = "/api/clinic/pharmacy/credit-accounts/{id}/export.csv",
    params(("id" = Uuid, Path, description = "Credit account ID")),
    responses((status = 200, description = "Ledger as CSV", body = String, content_type = "text/csv")),
    tag = "khata"
)]
pub async fn export_csv(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let csv = server.khata.export_csv(ctx.clinic_id, id).await?;
    let disposition = format!("attachment; filename=\"khata-{id}.csv\"");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

#[utoipa::path(
    get,
    path = "/api/clinic/pharmacy/credit-accounts/{id}/statement",
    params(("id" = Uuid, Path, description = "Credit account ID")),
    responses((status = 200, description = "Printable statement", body = String, content_type = "text/plain")),
    tag = "khata"
)]
pub async fn statement(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let text = server.khata.statement(ctx.clinic_id, id, &server.clinic_name).await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text))
}
