use crate::errors::AppError;
use crate::models::{AppData, Session, UserRecord};
use crate::state::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;
const SESSION_TTL_DAYS: i64 = 30;

/// The user behind a valid `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::unauthorized("missing bearer token"))?
            .to_string();

        let now = Utc::now();
        let data = state.data.lock().await;
        let user_id = data
            .sessions
            .get(&token)
            .filter(|session| !is_expired(session, now) && data.users.contains_key(&session.user_id))
            .map(|session| session.user_id.clone())
            .ok_or_else(|| AppError::unauthorized("invalid or expired token"))?;

        Ok(AuthUser { user_id, token })
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

pub fn is_expired(session: &Session, now: DateTime<Utc>) -> bool {
    session.created_at <= (now - Duration::days(SESSION_TTL_DAYS)).timestamp()
}

/// Drops expired sessions, returning how many were removed.
pub fn prune_sessions(data: &mut AppData, now: DateTime<Utc>) -> usize {
    let before = data.sessions.len();
    data.sessions.retain(|_, session| !is_expired(session, now));
    before - data.sessions.len()
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Adds a new account, returning the stored record.
pub fn register_user(
    data: &mut AppData,
    email: &str,
    password: &str,
    username: &str,
) -> Result<UserRecord, AppError> {
    let email = normalize_email(email);
    let username = username.trim();
    if !email.contains('@') {
        return Err(AppError::bad_request("a valid email is required"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if username.is_empty() {
        return Err(AppError::bad_request("username is required"));
    }
    if data.users.values().any(|user| user.email == email) {
        return Err(AppError::conflict("email is already registered"));
    }

    let salt = Uuid::new_v4().simple().to_string();
    let user = UserRecord {
        id: Uuid::new_v4().to_string(),
        password_hash: hash_password(&salt, password),
        salt,
        email,
        username: username.to_string(),
        created_at: Utc::now().to_rfc3339(),
    };
    data.users.insert(user.id.clone(), user.clone());
    Ok(user)
}

/// Checks credentials and opens a session, returning its token.
pub fn login_user(data: &mut AppData, email: &str, password: &str) -> Result<String, AppError> {
    let email = normalize_email(email);
    let user_id = data
        .users
        .values()
        .find(|user| user.email == email && hash_password(&user.salt, password) == user.password_hash)
        .map(|user| user.id.clone())
        .ok_or_else(|| AppError::unauthorized("email or password is incorrect"))?;

    let now = Utc::now();
    prune_sessions(data, now);

    let token = Uuid::new_v4().simple().to_string();
    data.sessions.insert(
        token.clone(),
        Session {
            user_id,
            created_at: now.timestamp(),
        },
    );
    Ok(token)
}

pub fn logout_user(data: &mut AppData, token: &str) -> bool {
    data.sessions.remove(token).is_some()
}
