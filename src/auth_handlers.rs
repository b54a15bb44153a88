use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::Cookie;
use bson::{DateTime, Uuid, doc};
use chrono::{Duration, Utc};
use log::{error, warn};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::auth;
use crate::authentication::AuthenticatedUser;
use crate::error::ApiError;
use crate::state::ServiceState;
use crate::user::{self, Avatar, Role, UpdateProfileCommand, User};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Issues a fresh session for a user: signed token in the body plus an
/// HTTP-only cookie, the way every successful auth operation responds.
fn session_response(
    state: &ServiceState,
    jar: CookieJar,
    user: &User,
    status: StatusCode,
) -> Result<(StatusCode, CookieJar, Json<Value>), ApiError> {
    let ttl_days = state.config.session_ttl_days;
    let token = state.session_keys.issue(user._id, Duration::days(ttl_days))?;
    let cookie = auth::session_cookie(token.clone(), ttl_days);
    let body = Json(json!({
        "success": true,
        "token": token,
        "user": user.details(),
    }));
    Ok((status, jar.add(cookie), body))
}

/// POST /api/v1/register
pub async fn register_user(
    State(state): State<ServiceState>,
    jar: CookieJar,
    Json(body): Json<RegisterRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user::validate_name(&body.name)?;
    user::validate_email(&body.email)?;
    user::validate_password(&body.password)?;
    let user = User {
        _id: Uuid::new(),
        name: body.name,
        email: body.email,
        password_hash: auth::hash_password(&body.password)?,
        role: Role::Standard,
        avatar: Avatar::placeholder(),
        reset_password_token_hash: None,
        reset_password_expires: None,
    };
    // A duplicate email trips the unique index and surfaces as a 400.
    state.user_collection.insert_one(&user, None).await?;
    session_response(&state, jar, &user, StatusCode::CREATED)
}

/// POST /api/v1/login
///
/// A missing user and a wrong password yield the identical error, so the
/// response does not reveal which emails are registered.
pub async fn login_user(
    State(state): State<ServiceState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (email, password) = match (body.email, body.password) {
        (Some(email), Some(password)) => (email, password),
        _ => {
            return Err(ApiError::Validation(
                "Please enter both email and password".to_string(),
            ));
        }
    };
    let maybe_user = state
        .user_collection
        .find_one(doc! {"email": &email}, None)
        .await?;
    let user = auth::check_login(maybe_user.as_ref(), &password)?;
    session_response(&state, jar, user, StatusCode::OK)
}

/// GET /api/v1/logout
///
/// Instructs the client to expire its session cookie immediately.
pub async fn logout_user(jar: CookieJar) -> (CookieJar, Json<Value>) {
    let jar = jar.remove(Cookie::build(("token", "")).path("/"));
    (jar, Json(json!({"success": true, "message": "Logged out"})))
}

/// POST /api/v1/password/forgot
///
/// Stores the digest and expiry of a single-use reset token, then mails the
/// raw token as part of a reset URL. A delivery failure rolls the reset
/// fields back and surfaces the error.
pub async fn forgot_password(
    State(state): State<ServiceState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    let user = state
        .user_collection
        .find_one(doc! {"email": &body.email}, None)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let reset_token = auth::generate_reset_token();
    let expires =
        DateTime::from_chrono(Utc::now() + Duration::minutes(state.config.reset_token_ttl_minutes));
    state
        .user_collection
        .update_one(
            doc! {"_id": user._id},
            doc! {"$set": {
                "reset_password_token_hash": &reset_token.digest,
                "reset_password_expires": expires,
            }},
            None,
        )
        .await?;

    let reset_url = format!(
        "{}/api/v1/password/reset/{}",
        state.config.public_base_url, reset_token.raw
    );
    if let Err(delivery_error) = state
        .mailer
        .send_password_reset(&user.email, &user.name, &reset_url)
        .await
    {
        warn!(
            "Password reset delivery to `{}` failed, rolling back reset fields",
            user.email
        );
        let rollback = state
            .user_collection
            .update_one(
                doc! {"_id": user._id},
                doc! {"$unset": {
                    "reset_password_token_hash": "",
                    "reset_password_expires": "",
                }},
                None,
            )
            .await;
        if let Err(rollback_error) = rollback {
            error!(
                "Rolling back reset fields of `{}` failed: {}",
                user.email, rollback_error
            );
        }
        return Err(delivery_error);
    }

    Ok(Json(json!({
        "success": true,
        "message": format!("Email sent to {} successfully", user.email),
    })))
}

/// PUT /api/v1/password/reset/{token}
///
/// Accepts a reset token at most once: the lookup is by token digest with a
/// future expiry, and a successful reset clears both fields.
pub async fn reset_password(
    State(state): State<ServiceState>,
    jar: CookieJar,
    Path(token): Path<String>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let digest = auth::hash_reset_token(&token);
    let user = state
        .user_collection
        .find_one(doc! {"reset_password_token_hash": &digest}, None)
        .await?
        .filter(|user| auth::reset_token_matches(user, &digest, DateTime::now()))
        .ok_or_else(|| {
            ApiError::Validation("Reset password token is invalid or has expired".to_string())
        })?;

    if body.password != body.confirm_password {
        return Err(ApiError::Validation("Password does not match".to_string()));
    }
    user::validate_password(&body.password)?;

    let password_hash = auth::hash_password(&body.password)?;
    state
        .user_collection
        .update_one(
            doc! {"_id": user._id},
            doc! {
                "$set": {"password_hash": &password_hash},
                "$unset": {
                    "reset_password_token_hash": "",
                    "reset_password_expires": "",
                },
            },
            None,
        )
        .await?;
    session_response(&state, jar, &user, StatusCode::OK)
}

/// GET /api/v1/me
pub async fn get_user_details(
    AuthenticatedUser(user): AuthenticatedUser,
) -> Json<Value> {
    Json(json!({"success": true, "user": user.details()}))
}

/// PUT /api/v1/password/update
pub async fn update_password(
    State(state): State<ServiceState>,
    jar: CookieJar,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<UpdatePasswordRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    if !auth::verify_password(&body.old_password, &user.password_hash)? {
        return Err(ApiError::Auth("Old password is incorrect".to_string()));
    }
    if body.new_password != body.confirm_password {
        return Err(ApiError::Validation("Password does not match".to_string()));
    }
    user::validate_password(&body.new_password)?;

    let password_hash = auth::hash_password(&body.new_password)?;
    state
        .user_collection
        .update_one(
            doc! {"_id": user._id},
            doc! {"$set": {"password_hash": &password_hash}},
            None,
        )
        .await?;
    session_response(&state, jar, &user, StatusCode::OK)
}

/// PUT /api/v1/me/update
pub async fn update_profile(
    State(state): State<ServiceState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(command): Json<UpdateProfileCommand>,
) -> Result<Json<Value>, ApiError> {
    command.validate()?;
    state
        .user_collection
        .update_one(
            doc! {"_id": user._id},
            doc! {"$set": {"name": &command.name, "email": &command.email}},
            None,
        )
        .await?;
    Ok(Json(json!({"success": true})))
}
