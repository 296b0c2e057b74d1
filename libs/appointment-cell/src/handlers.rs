// libs/appointment-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_directory::store::AppState;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;

use crate::models::{BookSlotRequest, CreateSlotsRequest, RescheduleSlotRequest, SlotError, SlotQueryParams};
use crate::services::booking::BookingService;
use crate::services::lifecycle::SlotLifecycleService;
use crate::services::slots::SlotGeneratorService;

/// For user-tier callers, verifies that the booked slot belongs to a profile
/// linked to the caller's account. Higher tiers pass unconditionally.
async fn ensure_booking_owner(
    state: &AppState,
    user: &User,
    appointment_id: Uuid,
) -> Result<(), AppError> {
    if user.role >= Role::Hospital {
        return Ok(());
    }

    let slot = state
        .store
        .find_appointment(appointment_id)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Appointment not found".to_string()))?;

    let profile_id = slot
        .profile_id
        .ok_or_else(|| AppError::BadRequest("Appointment is not booked".to_string()))?;

    let profile = state
        .store
        .find_profile(profile_id)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| {
            AppError::Internal(format!("Profile {} missing for booked appointment", profile_id))
        })?;

    if profile.account_id.is_none() || profile.account_id != user.account_id() {
        return Err(AppError::Forbidden(
            "Not authorized to manage this appointment".to_string(),
        ));
    }

    Ok(())
}

// ==============================================================================
// SLOT GENERATION AND LISTING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_slots(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateSlotsRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if user.role < Role::Hospital {
        return Err(AppError::Forbidden(
            "Only hospital or admin accounts can create slots".to_string(),
        ));
    }

    // Hospital-tier callers only manage their own doctors.
    if user.role == Role::Hospital {
        let doctor = state
            .store
            .find_doctor(request.doctor_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::BadRequest("Doctor not found".to_string()))?;

        if user.hospital_id != Some(doctor.hospital_id) {
            return Err(AppError::Forbidden(
                "Doctor belongs to a different hospital".to_string(),
            ));
        }
    }

    let service = SlotGeneratorService::new(state.store.clone());
    let slots = service
        .create_slots(
            request.doctor_id,
            request.date,
            request.start_time,
            request.end_time,
            request.duration_minutes,
        )
        .await
        .map_err(|e| match e {
            SlotError::InvalidReference(msg) => AppError::BadRequest(msg),
            SlotError::Validation(msg) => AppError::BadRequest(msg),
            SlotError::Database(msg) => AppError::Database(msg),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "slots": slots,
            "total": slots.len(),
            "message": "Slots created successfully"
        })),
    ))
}

#[axum::debug_handler]
pub async fn list_slots(
    State(state): State<AppState>,
    Query(params): Query<SlotQueryParams>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    // User-tier callers only see slots they could still book.
    let open_only = user.role == Role::User;

    let service = SlotGeneratorService::new(state.store.clone());
    let slots = service
        .list_slots(params.doctor_id, params.date, open_only)
        .await
        .map_err(|e| match e {
            SlotError::InvalidReference(msg) => AppError::BadRequest(msg),
            SlotError::Database(msg) => AppError::Database(msg),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "doctor_id": params.doctor_id,
        "date": params.date,
        "slots": slots,
        "total": slots.len()
    })))
}

#[axum::debug_handler]
pub async fn get_slot(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(state.store.clone());
    let slot = service.get_slot(appointment_id).await.map_err(|e| match e {
        SlotError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        SlotError::Database(msg) => AppError::Database(msg),
        _ => AppError::Internal(e.to_string()),
    })?;

    // User-tier callers may inspect open slots or their own bookings.
    if user.role == Role::User && slot.is_booked() {
        ensure_booking_owner(&state, &user, appointment_id).await?;
    }

    Ok(Json(json!(slot)))
}

// ==============================================================================
// BOOKING AND LIFECYCLE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_slot(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<BookSlotRequest>,
) -> Result<Json<Value>, AppError> {
    // User-tier callers only book for profiles linked to their own account.
    if user.role == Role::User {
        let profile = state
            .store
            .find_profile(request.profile_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::BadRequest("Profile not found".to_string()))?;

        if profile.account_id.is_none() || profile.account_id != user.account_id() {
            return Err(AppError::Forbidden(
                "Not authorized to book for this profile".to_string(),
            ));
        }
    }

    let service = BookingService::new(state.store.clone());
    let slot = service
        .book(appointment_id, request.profile_id)
        .await
        .map_err(|e| match e {
            SlotError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            SlotError::InvalidReference(msg) => AppError::BadRequest(msg),
            SlotError::AlreadyBooked => {
                AppError::BadRequest("Appointment slot is already booked".to_string())
            }
            SlotError::AlreadyCancelled => {
                AppError::BadRequest("Appointment slot has been cancelled".to_string())
            }
            SlotError::Database(msg) => AppError::Database(msg),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "appointment": slot,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn reschedule_slot(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<RescheduleSlotRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_booking_owner(&state, &user, appointment_id).await?;

    let service = SlotLifecycleService::new(state.store.clone());
    let slot = service
        .reschedule(appointment_id, request.new_appointment_id)
        .await
        .map_err(|e| match e {
            SlotError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            SlotError::InvalidReference(msg) => AppError::BadRequest(msg),
            SlotError::AlreadyBooked => {
                AppError::BadRequest("Target slot is already booked".to_string())
            }
            SlotError::AlreadyCancelled => {
                AppError::BadRequest("Appointment slot has been cancelled".to_string())
            }
            SlotError::CrossDoctorReschedule => AppError::BadRequest(
                "Cannot reschedule an appointment to a different doctor".to_string(),
            ),
            SlotError::Validation(msg) => AppError::BadRequest(msg),
            SlotError::InconsistentState(msg) => AppError::Internal(msg),
            SlotError::Database(msg) => AppError::Database(msg),
        })?;

    Ok(Json(json!({
        "success": true,
        "appointment": slot,
        "message": "Appointment rescheduled successfully"
    })))
}

#[axum::debug_handler]
pub async fn cancel_slot(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    ensure_booking_owner(&state, &user, appointment_id).await?;

    let service = SlotLifecycleService::new(state.store.clone());
    let slot = service.cancel(appointment_id).await.map_err(|e| match e {
        SlotError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        SlotError::AlreadyCancelled => {
            AppError::BadRequest("Appointment slot is already cancelled".to_string())
        }
        SlotError::InconsistentState(msg) => AppError::Internal(msg),
        SlotError::Database(msg) => AppError::Database(msg),
        _ => AppError::Internal(e.to_string()),
    })?;

    Ok(Json(json!({
        "success": true,
        "appointment": slot,
        "message": "Appointment cancelled successfully"
    })))
}

#[axum::debug_handler]
pub async fn delete_slot(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if user.role < Role::Hospital {
        return Err(AppError::Forbidden(
            "Only hospital or admin accounts can delete slots".to_string(),
        ));
    }

    let service = SlotLifecycleService::new(state.store.clone());
    let slot = service.delete(appointment_id).await.map_err(|e| match e {
        SlotError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        SlotError::Database(msg) => AppError::Database(msg),
        _ => AppError::Internal(e.to_string()),
    })?;

    Ok(Json(json!({
        "success": true,
        "appointment": slot,
        "message": "Appointment deleted successfully"
    })))
}
