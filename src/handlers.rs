use crate::analytics::{
    build_stats, mood_series_for_range, DEFAULT_BAD_MOOD_THRESHOLD, DEFAULT_MIN_RUN_LENGTH,
    MAX_SERIES_DAYS,
};
use crate::auth::{login_user, logout_user, register_user, AuthUser};
use crate::errors::AppError;
use crate::models::{
    date_key, parse_date_key, DateRange, LoginRequest, LoginResponse, MoodQuery, MoodRecord, MoodRequest,
    ProfileResponse, RegisterRequest, SeriesPoint, SeriesQuery, StatsQuery, StatsResponse,
    UserProfile,
};
use crate::state::AppState;
use crate::storage::persist_data;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::{info, warn};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    let mut data = state.data.lock().await;
    let user = register_user(&mut data, &payload.email, &payload.password, &payload.username)?;
    persist_data(&state.data_path, &data).await?;

    info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(UserProfile::from(&user))))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let mut data = state.data.lock().await;
    let token = login_user(&mut data, &payload.email, &payload.password).inspect_err(|_| {
        warn!("rejected login attempt");
    })?;
    persist_data(&state.data_path, &data).await?;

    Ok(Json(LoginResponse { token }))
}

pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> Result<StatusCode, AppError> {
    let mut data = state.data.lock().await;
    logout_user(&mut data, &auth.token);
    persist_data(&state.data_path, &data).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let data = state.data.lock().await;
    let user = data
        .users
        .get(&auth.user_id)
        .ok_or_else(|| AppError::unauthorized("unknown user"))?;

    Ok(Json(ProfileResponse {
        user: UserProfile::from(user),
    }))
}

pub async fn list_moods(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<MoodQuery>,
) -> Result<Json<Vec<MoodRecord>>, AppError> {
    let start = query.start_date.as_deref().map(parse_date).transpose()?;
    let end = query.end_date.as_deref().map(parse_date).transpose()?;
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(AppError::bad_request("start_date must not be after end_date"));
        }
    }

    let data = state.data.lock().await;
    let records = data
        .moods
        .get(&auth.user_id)
        .map(|log| log.records())
        .unwrap_or_default()
        .into_iter()
        .filter(|record| {
            let date = parse_date_key(&record.date);
            start.is_none_or(|start| date.is_some_and(|date| date >= start))
                && end.is_none_or(|end| date.is_some_and(|date| date <= end))
        })
        .collect();

    Ok(Json(records))
}

pub async fn record_mood(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<MoodRequest>,
) -> Result<Json<MoodRecord>, AppError> {
    let date = parse_date(&payload.date)?;

    let mut data = state.data.lock().await;
    let previous = data
        .moods
        .entry(auth.user_id.clone())
        .or_default()
        .insert(date, payload.value);
    persist_data(&state.data_path, &data).await?;

    info!(
        user_id = %auth.user_id,
        date = %date,
        mood = payload.value.value(),
        replaced = previous.is_some(),
        "mood recorded"
    );
    Ok(Json(MoodRecord {
        date: date_key(date),
        value: payload.value,
    }))
}

pub async fn mood_series(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<SeriesQuery>,
) -> Result<Json<Vec<SeriesPoint>>, AppError> {
    let range = DateRange::new(parse_date(&query.start_date)?, parse_date(&query.end_date)?)
        .ok_or_else(|| AppError::bad_request("start_date must not be after end_date"))?;
    if range.num_days() > MAX_SERIES_DAYS {
        return Err(AppError::bad_request(format!(
            "range may span at most {MAX_SERIES_DAYS} days"
        )));
    }

    let data = state.data.lock().await;
    let log = data.moods.get(&auth.user_id).cloned().unwrap_or_default();
    Ok(Json(mood_series_for_range(&log, &range)))
}

pub async fn get_stats(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsResponse>, AppError> {
    let data = state.data.lock().await;
    let log = data.moods.get(&auth.user_id).cloned().unwrap_or_default();
    drop(data);

    Ok(Json(build_stats(
        &log,
        query.period,
        query.threshold.unwrap_or(DEFAULT_BAD_MOOD_THRESHOLD),
        query.min_length.unwrap_or(DEFAULT_MIN_RUN_LENGTH),
    )))
}

fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    parse_date_key(value.trim())
        .ok_or_else(|| AppError::bad_request(format!("invalid date '{value}', expected yyyy-MM-dd")))
}
