use appointment_service::{ics, Appointment, BookAppointmentRequest, BookingConfirmation};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::error::{api_list, api_success, ApiError, ApiResponse, ApiResult};
use crate::middleware::ClinicContext;
use crate::server::ClinicServer;

/// A doctor's bookings overlapping `[from, to)`
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScheduleQuery {
    pub doctor_id: Uuid,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[utoipa::path(
    post,
    path = "/api/appointments",
    request_body = BookAppointmentRequest,
    responses(
        (status = 201, description = "Appointment booked", body = BookingConfirmation),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "SLOT_UNAVAILABLE")
    ),
    tag = "appointments"
)]
pub async fn book_appointment(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Json(req): Json<BookAppointmentRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<BookingConfirmation>>)> {
    let appointment = server.appointments.book(ctx.clinic_id, req).await?;
    let ics_url = format!("/api/appointments/{}/ics", appointment.id);
    Ok((
        StatusCode::CREATED,
        Json(api_success(BookingConfirmation { appointment, ics_url })),
    ))
}

#[utoipa::path(
    get,
    path = "/api/appointments",
    params(ScheduleQuery),
    responses((status = 200, description = "Booked appointments ordered by start", body = Vec<Appointment>)),
    tag = "appointments"
)]
pub async fn list_schedule(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Query(q): Query<ScheduleQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Appointment>>>> {
    if q.to <= q.from {
        return Err(ApiError::validation("`to` must be after `from`"));
    }
    let appointments = server
        .appointments
        .list_for_doctor(ctx.clinic_id, q.doctor_id, q.from, q.to)
        .await?;
    Ok(Json(api_list(appointments)))
}

#[utoipa::path(
    get,
    path = "/api/appointments/{id}",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment", body = Appointment),
        (status = 404, description = "Appointment not found")
    ),
    tag = "appointments"
)]
pub async fn get_appointment(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Appointment>>> {
    let appointment = server.appointments.get(ctx.clinic_id, id).await?;
    Ok(Json(api_success(appointment)))
}

#[utoipa::path(
    post,
    path = "/api/appointments/{id}/cancel",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment cancelled", body = Appointment),
        (status = 409, description = "Appointment is not booked")
    ),
    tag = "appointments"
)]
pub async fn cancel_appointment(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Appointment>>> {
    let appointment = server.appointments.cancel(ctx.clinic_id, id).await?;
    Ok(Json(api_success(appointment)))
}

#[utoipa::path(
    get,
    path = "/api/appointments/{id}/ics",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    responses((status = 200, description = "iCalendar confirmation", body = String, content_type = "text/calendar")),
    tag = "appointments"
)]
pub async fn appointment_ics(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let body = server
        .appointments
        .render_ics(ctx.clinic_id, id, &server.clinic_name)
        .await?;
    let disposition = format!("attachment; filename=\"appointment-{id}.ics\"");
    Ok((
        [
            (header::CONTENT_TYPE, ics::CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}
