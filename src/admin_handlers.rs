use axum::Json;
use axum::extract::{Path, State};
use bson::doc;
use futures::TryStreamExt;
use log::info;
use serde_json::{Value, json};

use crate::authentication::AdminUser;
use crate::error::{ApiError, parse_uuid};
use crate::state::ServiceState;
use crate::user::{UpdateRoleCommand, UserDetails, query_user};

/// GET /api/v1/admin/users
pub async fn list_users(
    State(state): State<ServiceState>,
    AdminUser(_): AdminUser,
) -> Result<Json<Value>, ApiError> {
    let cursor = state.user_collection.find(None, None).await?;
    let users: Vec<UserDetails> = cursor
        .try_collect::<Vec<_>>()
        .await?
        .iter()
        .map(|user| user.details())
        .collect();
    Ok(Json(json!({"success": true, "users": users})))
}

/// GET /api/v1/admin/user/{id}
pub async fn get_user(
    State(state): State<ServiceState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user_id = parse_uuid(&id)?;
    let user = query_user(&state.user_collection, user_id).await?;
    Ok(Json(json!({"success": true, "user": user.details()})))
}

/// PUT /api/v1/admin/user/{id}
pub async fn update_user_role(
    State(state): State<ServiceState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    Json(command): Json<UpdateRoleCommand>,
) -> Result<Json<Value>, ApiError> {
    let user_id = parse_uuid(&id)?;
    let role = command.validated_role()?;
    let result = state
        .user_collection
        .update_one(
            doc! {"_id": user_id},
            doc! {"$set": {
                "name": &command.name,
                "email": &command.email,
                "role": role.as_str(),
            }},
            None,
        )
        .await?;
    if result.matched_count == 0 {
        return Err(ApiError::NotFound(format!("User does not exist with id: `{user_id}`")));
    }
    info!("Role of user `{}` set to `{}`", user_id, role.as_str());
    Ok(Json(json!({"success": true})))
}

/// DELETE /api/v1/admin/user/{id}
///
/// Reviews authored by the deleted user stay embedded in the products they
/// were written for.
pub async fn delete_user(
    State(state): State<ServiceState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user_id = parse_uuid(&id)?;
    let user = query_user(&state.user_collection, user_id).await?;
    state
        .user_collection
        .delete_one(doc! {"_id": user._id}, None)
        .await?;
    info!("User `{}` deleted", user_id);
    Ok(Json(json!({"success": true, "message": "User deleted successfully"})))
}
