use actix_identity::Identity;
use actix_web::{
    delete, get, post, put,
    web::{self, Data},
    HttpMessage, HttpRequest, HttpResponse, Responder,
};
use validator::Validate;

use crate::{
    auth::SessionUser,
    db,
    errors::AppError,
    structs::{IdentityClaims, ItemPatch, MenuPatch, NewItem, NewMenu, NewSection, SectionPatch},
    AppState,
};

/// Header carrying the secret shared with the identity provider.
pub const IDENTITY_SECRET_HEADER: &str = "x-identity-secret";

/// Identity provider callback: records the user and opens a session.
///
/// Only callers presenting the shared secret get through; without a
/// configured secret every callback is refused.
#[post("/api/auth/callback")]
pub async fn auth_callback_handler(
    web::Json(claims): web::Json<IdentityClaims>,
    state: Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder, AppError> {
    let Some(secret) = state.identity_callback_secret.as_deref() else {
        log::error!("Identity callback refused: no callback secret configured");
        return Err(AppError::Unauthorized);
    };
    let provided = request
        .headers()
        .get(IDENTITY_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());
    if provided != Some(secret) {
        log::warn!("Rejected identity callback without a valid secret");
        return Err(AppError::Unauthorized);
    }
    claims.validate()?;

    let user = db::upsert_user(&state, &claims).await?;
    Identity::login(&request.extensions(), user.id.clone())
        .map_err(|e| AppError::Session(e.to_string()))?;

    Ok(HttpResponse::Ok().json(user))
}

#[get("/api/auth/user")]
pub async fn current_user_handler(
    user: SessionUser,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let user = db::get_user(&state, user.id())
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(user))
}

#[post("/api/auth/logout")]
pub async fn logout_handler(identity: Option<Identity>) -> Result<impl Responder, AppError> {
    let identity = identity.ok_or(AppError::Unauthorized)?;
    identity.logout();
    Ok(HttpResponse::NoContent().finish())
}

#[get("/api/templates")]
pub async fn templates_handler(state: Data<AppState>) -> Result<impl Responder, AppError> {
    let templates = db::get_templates(&state).await.map_err(|e| {
        log::error!("Failed to get templates: {}", e);
        AppError::SqlxError(e)
    })?;
    Ok(HttpResponse::Ok().json(templates))
}

#[get("/api/menus")]
pub async fn list_menus_handler(
    user: SessionUser,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let menus = db::get_user_menus(&state, user.id()).await?;
    Ok(HttpResponse::Ok().json(menus))
}

#[post("/api/menus")]
pub async fn create_menu_handler(
    user: SessionUser,
    state: Data<AppState>,
    web::Json(menu): web::Json<NewMenu>,
) -> Result<impl Responder, AppError> {
    menu.validate()?;
    let menu = db::create_menu(&state, user.id(), menu).await?;
    Ok(HttpResponse::Created().json(menu))
}

/// Full menu for the editor. Menus owned by someone else answer exactly like
/// missing ones.
#[get("/api/menus/{id}")]
pub async fn get_menu_handler(
    user: SessionUser,
    state: Data<AppState>,
    path: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let menu_id = path.into_inner();
    let menu = db::get_menu(&state, menu_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if menu.user_id != user.id() {
        log::warn!("User {} asked for menu {} they do not own", user.id(), menu_id);
        return Err(AppError::NotFound);
    }
    let full_menu = db::get_full_menu(&state, menu.id).await?;
    Ok(HttpResponse::Ok().json(full_menu))
}

#[put("/api/menus/{id}")]
pub async fn update_menu_handler(
    user: SessionUser,
    state: Data<AppState>,
    path: web::Path<i64>,
    web::Json(patch): web::Json<MenuPatch>,
) -> Result<impl Responder, AppError> {
    patch.validate()?;
    let menu = db::update_menu(&state, user.id(), path.into_inner(), patch).await?;
    Ok(HttpResponse::Ok().json(menu))
}

#[delete("/api/menus/{id}")]
pub async fn delete_menu_handler(
    user: SessionUser,
    state: Data<AppState>,
    path: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    db::delete_menu(&state, user.id(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Unauthenticated read of a published menu by its share slug.
#[get("/api/public/menus/{slug}")]
pub async fn public_menu_handler(
    state: Data<AppState>,
    path: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let menu = db::get_menu_by_slug(&state, &path)
        .await?
        .filter(|menu| menu.is_published)
        .ok_or(AppError::NotFound)?;
    let full_menu = db::get_full_menu(&state, menu.id).await?;
    Ok(HttpResponse::Ok().json(full_menu))
}

#[post("/api/menus/{menu_id}/sections")]
pub async fn create_section_handler(
    user: SessionUser,
    state: Data<AppState>,
    path: web::Path<i64>,
    web::Json(section): web::Json<NewSection>,
) -> Result<impl Responder, AppError> {
    section.validate()?;
    let section = db::create_section(&state, user.id(), path.into_inner(), section).await?;
    Ok(HttpResponse::Created().json(section))
}

#[put("/api/sections/{id}")]
pub async fn update_section_handler(
    user: SessionUser,
    state: Data<AppState>,
    path: web::Path<i64>,
    web::Json(patch): web::Json<SectionPatch>,
) -> Result<impl Responder, AppError> {
    patch.validate()?;
    let section = db::update_section(&state, user.id(), path.into_inner(), patch).await?;
    Ok(HttpResponse::Ok().json(section))
}

#[delete("/api/sections/{id}")]
pub async fn delete_section_handler(
    user: SessionUser,
    state: Data<AppState>,
    path: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    db::delete_section(&state, user.id(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/api/sections/{section_id}/items")]
pub async fn create_item_handler(
    user: SessionUser,
    state: Data<AppState>,
    path: web::Path<i64>,
    web::Json(item): web::Json<NewItem>,
) -> Result<impl Responder, AppError> {
    item.validate()?;
    let item = db::create_item(&state, user.id(), path.into_inner(), item).await?;
    Ok(HttpResponse::Created().json(item))
}

#[put("/api/items/{id}")]
pub async fn update_item_handler(
    user: SessionUser,
    state: Data<AppState>,
    path: web::Path<i64>,
    web::Json(patch): web::Json<ItemPatch>,
) -> Result<impl Responder, AppError> {
    patch.validate()?;
    let item = db::update_item(&state, user.id(), path.into_inner(), patch).await?;
    Ok(HttpResponse::Ok().json(item))
}

#[delete("/api/items/{id}")]
pub async fn delete_item_handler(
    user: SessionUser,
    state: Data<AppState>,
    path: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    db::delete_item(&state, user.id(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
