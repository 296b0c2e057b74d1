use std::collections::BTreeMap;
use std::sync::Arc;

use assert_matches::assert_matches;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use appointment_cell::handlers;
use appointment_cell::models::{BookSlotRequest, CreateSlotsRequest, RescheduleSlotRequest, SlotQueryParams};
use appointment_cell::services::booking::BookingService;
use appointment_cell::services::slots::SlotGeneratorService;
use shared_config::AppConfig;
use shared_directory::memory::MemoryDirectoryStore;
use shared_directory::models::{Appointment, Doctor, Profile};
use shared_directory::store::{AppState, DirectoryStore};
use shared_models::error::AppError;
use shared_utils::test_utils::TestUser;

fn test_config() -> Arc<AppConfig> {
    Arc::new(AppConfig {
        supabase_url: String::new(),
        supabase_anon_key: String::new(),
        supabase_jwt_secret: "test-jwt-secret".to_string(),
    })
}

fn test_doctor(hospital_id: Uuid) -> Doctor {
    Doctor {
        id: Uuid::new_v4(),
        full_name: "Dr. Leila Haddad".to_string(),
        hospital_id,
        specialization_id: Uuid::new_v4(),
        qualifications: vec!["MBBS".to_string()],
        practicing_since: 2015,
        appointment_days: BTreeMap::new(),
    }
}

fn test_profile(account_id: Option<Uuid>) -> Profile {
    Profile {
        id: Uuid::new_v4(),
        account_id,
        first_name: "Sofia".to_string(),
        last_name: "Reyes".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1992, 7, 4).unwrap(),
        gender: None,
        appointments: vec![],
    }
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn at(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn slots_request(doctor_id: Uuid) -> CreateSlotsRequest {
    CreateSlotsRequest {
        doctor_id,
        date: date(),
        start_time: at(9, 0),
        end_time: at(11, 0),
        duration_minutes: 30,
    }
}

async fn setup() -> (AppState, Arc<MemoryDirectoryStore>, Doctor) {
    let store = Arc::new(MemoryDirectoryStore::new());
    let doctor = test_doctor(Uuid::new_v4());
    store.insert_doctor(doctor.clone()).await;
    let state = AppState::new(test_config(), store.clone());
    (state, store, doctor)
}

async fn seed_slots(store: &Arc<MemoryDirectoryStore>, doctor_id: Uuid) -> Vec<Appointment> {
    let generator = SlotGeneratorService::new(store.clone());
    generator
        .create_slots(doctor_id, date(), at(9, 0), at(10, 0), 30)
        .await
        .unwrap()
}

// ==============================================================================
// SLOT CREATION AUTHORIZATION
// ==============================================================================

#[tokio::test]
async fn create_slots_rejects_user_tier() {
    let (state, _, doctor) = setup().await;
    let user = TestUser::user("patient@example.com").to_user();

    let result = handlers::create_slots(
        State(state),
        Extension(user),
        Json(slots_request(doctor.id)),
    )
    .await;

    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn create_slots_rejects_foreign_hospital() {
    let (state, _, doctor) = setup().await;
    // Hospital account bound to some other hospital id.
    let user = TestUser::hospital("staff@other-hospital.example.com").to_user();

    let result = handlers::create_slots(
        State(state),
        Extension(user),
        Json(slots_request(doctor.id)),
    )
    .await;

    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn create_slots_allows_owning_hospital() {
    let (state, store, doctor) = setup().await;
    let user = TestUser::new("staff@hospital.example.com", shared_models::auth::Role::Hospital)
        .with_hospital(doctor.hospital_id)
        .to_user();

    let (status, Json(body)) = handlers::create_slots(
        State(state),
        Extension(user),
        Json(slots_request(doctor.id)),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["total"], 4);
    assert_eq!(store.appointment_count().await, 4);
}

#[tokio::test]
async fn create_slots_allows_admin_for_any_hospital() {
    let (state, _, doctor) = setup().await;
    let user = TestUser::admin("root@example.com").to_user();

    let (status, Json(body)) = handlers::create_slots(
        State(state),
        Extension(user),
        Json(slots_request(doctor.id)),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["total"], 4);
}

#[tokio::test]
async fn create_slots_rejects_unknown_doctor() {
    let (state, _, _) = setup().await;
    let user = TestUser::admin("root@example.com").to_user();

    let result = handlers::create_slots(
        State(state),
        Extension(user),
        Json(slots_request(Uuid::new_v4())),
    )
    .await;

    assert_matches!(result, Err(AppError::BadRequest(_)));
}

// ==============================================================================
// LISTING AND RETRIEVAL
// ==============================================================================

#[tokio::test]
async fn list_slots_hides_unavailable_slots_from_users() {
    let (state, store, doctor) = setup().await;
    let slots = seed_slots(&store, doctor.id).await;

    let profile = test_profile(Some(Uuid::new_v4()));
    store.insert_profile(profile.clone()).await;
    BookingService::new(store.clone())
        .book(slots[0].id, profile.id)
        .await
        .unwrap();

    let params = SlotQueryParams {
        doctor_id: doctor.id,
        date: date(),
    };

    let user = TestUser::user("patient@example.com").to_user();
    let Json(body) = handlers::list_slots(
        State(state.clone()),
        Query(params),
        Extension(user),
    )
    .await
    .unwrap();
    assert_eq!(body["total"], 1);

    // Hospital accounts see the booked slot as well.
    let staff = TestUser::hospital("staff@example.com").to_user();
    let params = SlotQueryParams {
        doctor_id: doctor.id,
        date: date(),
    };
    let Json(body) = handlers::list_slots(State(state), Query(params), Extension(staff))
        .await
        .unwrap();
    assert_eq!(body["total"], 2);
}

#[tokio::test]
async fn get_slot_hides_foreign_bookings_from_users() {
    let (state, store, doctor) = setup().await;
    let slots = seed_slots(&store, doctor.id).await;

    let owner_account = Uuid::new_v4();
    let profile = test_profile(Some(owner_account));
    store.insert_profile(profile.clone()).await;
    BookingService::new(store.clone())
        .book(slots[0].id, profile.id)
        .await
        .unwrap();

    // A stranger's lookup of the booked slot is refused.
    let stranger = TestUser::user("stranger@example.com").to_user();
    let result = handlers::get_slot(
        State(state.clone()),
        Path(slots[0].id),
        Extension(stranger),
    )
    .await;
    assert_matches!(result, Err(AppError::Forbidden(_)));

    // The owning account reads it back.
    let mut owner = TestUser::user("owner@example.com");
    owner.id = owner_account.to_string();
    let Json(body) = handlers::get_slot(
        State(state.clone()),
        Path(slots[0].id),
        Extension(owner.to_user()),
    )
    .await
    .unwrap();
    assert_eq!(body["id"], slots[0].id.to_string());

    // Open slots stay visible to everyone.
    let stranger = TestUser::user("stranger@example.com").to_user();
    let Json(body) = handlers::get_slot(State(state), Path(slots[1].id), Extension(stranger))
        .await
        .unwrap();
    assert_eq!(body["profile_id"], serde_json::Value::Null);
}

#[tokio::test]
async fn get_slot_missing_is_not_found() {
    let (state, _, _) = setup().await;
    let user = TestUser::admin("root@example.com").to_user();

    let result = handlers::get_slot(State(state), Path(Uuid::new_v4()), Extension(user)).await;
    assert_matches!(result, Err(AppError::NotFound(_)));
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[tokio::test]
async fn book_slot_rejects_foreign_profile() {
    let (state, store, doctor) = setup().await;
    let slots = seed_slots(&store, doctor.id).await;

    let profile = test_profile(Some(Uuid::new_v4()));
    store.insert_profile(profile.clone()).await;

    let user = TestUser::user("someone-else@example.com").to_user();
    let result = handlers::book_slot(
        State(state),
        Path(slots[0].id),
        Extension(user),
        Json(BookSlotRequest {
            profile_id: profile.id,
        }),
    )
    .await;

    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn book_slot_succeeds_for_own_profile() {
    let (state, store, doctor) = setup().await;
    let slots = seed_slots(&store, doctor.id).await;

    let account_id = Uuid::new_v4();
    let profile = test_profile(Some(account_id));
    store.insert_profile(profile.clone()).await;

    let mut caller = TestUser::user("patient@example.com");
    caller.id = account_id.to_string();

    let Json(body) = handlers::book_slot(
        State(state),
        Path(slots[0].id),
        Extension(caller.to_user()),
        Json(BookSlotRequest {
            profile_id: profile.id,
        }),
    )
    .await
    .unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(
        body["appointment"]["profile_id"],
        profile.id.to_string()
    );
}

#[tokio::test]
async fn book_slot_twice_is_bad_request() {
    let (state, store, doctor) = setup().await;
    let slots = seed_slots(&store, doctor.id).await;

    let profile = test_profile(Some(Uuid::new_v4()));
    store.insert_profile(profile.clone()).await;

    // Hospital tier skips the ownership check.
    let staff = TestUser::hospital("staff@example.com").to_user();
    handlers::book_slot(
        State(state.clone()),
        Path(slots[0].id),
        Extension(staff.clone()),
        Json(BookSlotRequest {
            profile_id: profile.id,
        }),
    )
    .await
    .unwrap();

    let result = handlers::book_slot(
        State(state),
        Path(slots[0].id),
        Extension(staff),
        Json(BookSlotRequest {
            profile_id: profile.id,
        }),
    )
    .await;

    assert_matches!(result, Err(AppError::BadRequest(_)));
}

// ==============================================================================
// RESCHEDULE / CANCEL / DELETE
// ==============================================================================

#[tokio::test]
async fn reschedule_rejects_non_owner_user() {
    let (state, store, doctor) = setup().await;
    let slots = seed_slots(&store, doctor.id).await;

    let profile = test_profile(Some(Uuid::new_v4()));
    store.insert_profile(profile.clone()).await;
    BookingService::new(store.clone())
        .book(slots[0].id, profile.id)
        .await
        .unwrap();

    let stranger = TestUser::user("stranger@example.com").to_user();
    let result = handlers::reschedule_slot(
        State(state),
        Path(slots[0].id),
        Extension(stranger),
        Json(RescheduleSlotRequest {
            new_appointment_id: slots[1].id,
        }),
    )
    .await;

    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn reschedule_moves_booking_for_owner() {
    let (state, store, doctor) = setup().await;
    let slots = seed_slots(&store, doctor.id).await;

    let account_id = Uuid::new_v4();
    let profile = test_profile(Some(account_id));
    store.insert_profile(profile.clone()).await;
    BookingService::new(store.clone())
        .book(slots[0].id, profile.id)
        .await
        .unwrap();

    let mut owner = TestUser::user("owner@example.com");
    owner.id = account_id.to_string();

    let Json(body) = handlers::reschedule_slot(
        State(state),
        Path(slots[0].id),
        Extension(owner.to_user()),
        Json(RescheduleSlotRequest {
            new_appointment_id: slots[1].id,
        }),
    )
    .await
    .unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["appointment"]["id"], slots[1].id.to_string());
    assert_eq!(
        body["appointment"]["profile_id"],
        profile.id.to_string()
    );
}

#[tokio::test]
async fn cancel_allows_hospital_tier_for_any_booking() {
    let (state, store, doctor) = setup().await;
    let slots = seed_slots(&store, doctor.id).await;

    let profile = test_profile(Some(Uuid::new_v4()));
    store.insert_profile(profile.clone()).await;
    BookingService::new(store.clone())
        .book(slots[0].id, profile.id)
        .await
        .unwrap();

    let staff = TestUser::hospital("staff@example.com").to_user();
    let Json(body) = handlers::cancel_slot(State(state), Path(slots[0].id), Extension(staff))
        .await
        .unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["appointment"]["cancelled"], true);
}

#[tokio::test]
async fn cancel_rejects_non_owner_user() {
    let (state, store, doctor) = setup().await;
    let slots = seed_slots(&store, doctor.id).await;

    let profile = test_profile(Some(Uuid::new_v4()));
    store.insert_profile(profile.clone()).await;
    BookingService::new(store.clone())
        .book(slots[0].id, profile.id)
        .await
        .unwrap();

    let stranger = TestUser::user("stranger@example.com").to_user();
    let result = handlers::cancel_slot(State(state), Path(slots[0].id), Extension(stranger)).await;
    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn delete_slot_requires_hospital_tier() {
    let (state, store, doctor) = setup().await;
    let slots = seed_slots(&store, doctor.id).await;

    let user = TestUser::user("patient@example.com").to_user();
    let result = handlers::delete_slot(
        State(state.clone()),
        Path(slots[0].id),
        Extension(user),
    )
    .await;
    assert_matches!(result, Err(AppError::Forbidden(_)));

    let staff = TestUser::hospital("staff@example.com").to_user();
    let Json(body) = handlers::delete_slot(State(state), Path(slots[0].id), Extension(staff))
        .await
        .unwrap();
    assert_eq!(body["success"], true);
    assert!(store.find_appointment(slots[0].id).await.unwrap().is_none());
}
