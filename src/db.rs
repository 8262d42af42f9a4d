use futures::future::try_join_all;
use sqlx::{types::Json, QueryBuilder, Sqlite};
use validator::{ValidationError, ValidationErrors};

use crate::{
    errors::AppError,
    structs::{
        DesignConfig, FullMenu, IdentityClaims, ItemPatch, Menu, MenuItem, MenuPatch, MenuSection,
        MenuTemplate, NewItem, NewMenu, NewSection, NewTemplate, SectionPatch, SectionWithItems,
        User,
    },
    utils, AppState,
};

const SLUG_ATTEMPTS: usize = 5;

/// Creates the user on first sign-in and refreshes the profile afterwards.
pub async fn upsert_user(state: &AppState, claims: &IdentityClaims) -> Result<User, sqlx::Error> {
    let now = utils::now();
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, email, first_name, last_name, profile_image_url, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (id) DO UPDATE SET
            email = excluded.email,
            first_name = excluded.first_name,
            last_name = excluded.last_name,
            profile_image_url = excluded.profile_image_url,
            updated_at = excluded.updated_at
         RETURNING *",
    )
    .bind(&claims.id)
    .bind(&claims.email)
    .bind(&claims.first_name)
    .bind(&claims.last_name)
    .bind(&claims.profile_image_url)
    .bind(now)
    .bind(now)
    .fetch_one(&state.db_pool)
    .await?;
    log::info!("User signed in: {}", user.id);
    Ok(user)
}

pub async fn get_user(state: &AppState, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await
}

pub async fn get_templates(state: &AppState) -> Result<Vec<MenuTemplate>, sqlx::Error> {
    sqlx::query_as::<_, MenuTemplate>(
        "SELECT * FROM menu_templates WHERE is_active = 1 ORDER BY created_at, id",
    )
    .fetch_all(&state.db_pool)
    .await
}

pub async fn get_template(state: &AppState, id: i64) -> Result<Option<MenuTemplate>, sqlx::Error> {
    sqlx::query_as::<_, MenuTemplate>("SELECT * FROM menu_templates WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await
}

pub async fn create_template(
    state: &AppState,
    template: NewTemplate,
) -> Result<MenuTemplate, sqlx::Error> {
    let created = sqlx::query_as::<_, MenuTemplate>(
        "INSERT INTO menu_templates (name, description, design_config, preview_image, category, is_active, created_at)
         VALUES ($1, $2, $3, $4, $5, 1, $6) RETURNING *",
    )
    .bind(template.name)
    .bind(template.description)
    .bind(Json(template.design_config))
    .bind(template.preview_image)
    .bind(template.category)
    .bind(utils::now())
    .fetch_one(&state.db_pool)
    .await?;
    log::info!("Template created: {}", created.id);
    Ok(created)
}

/// Looks up a template a menu is about to reference.
async fn require_template(state: &AppState, id: i64) -> Result<MenuTemplate, AppError> {
    get_template(state, id).await?.ok_or_else(|| {
        let mut errors = ValidationErrors::new();
        errors.add(
            "templateId",
            ValidationError::new("unknown_template").with_message("Unknown template".into()),
        );
        AppError::Validation(errors)
    })
}

pub async fn get_user_menus(state: &AppState, user_id: &str) -> Result<Vec<Menu>, sqlx::Error> {
    sqlx::query_as::<_, Menu>(
        "SELECT * FROM menus WHERE user_id = $1 ORDER BY updated_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(&state.db_pool)
    .await
}

pub async fn get_menu(state: &AppState, id: i64) -> Result<Option<Menu>, sqlx::Error> {
    sqlx::query_as::<_, Menu>("SELECT * FROM menus WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await
}

pub async fn get_menu_by_slug(state: &AppState, slug: &str) -> Result<Option<Menu>, sqlx::Error> {
    sqlx::query_as::<_, Menu>("SELECT * FROM menus WHERE share_slug = $1")
        .bind(slug)
        .fetch_optional(&state.db_pool)
        .await
}

pub async fn create_menu(state: &AppState, user_id: &str, menu: NewMenu) -> Result<Menu, AppError> {
    let mut design_config = menu.design_config;
    if let Some(template_id) = menu.template_id {
        let template = require_template(state, template_id).await?;
        design_config = design_config.or(Some(template.design_config.0));
    }
    let design_config: Option<Json<DesignConfig>> = design_config.map(Json);

    for attempt in 1..=SLUG_ATTEMPTS {
        let now = utils::now();
        let created = sqlx::query_as::<_, Menu>(
            "INSERT INTO menus (user_id, template_id, name, description, restaurant_name, tagline,
                header_image, design_config, is_published, share_slug, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING *",
        )
        .bind(user_id)
        .bind(menu.template_id)
        .bind(&menu.name)
        .bind(&menu.description)
        .bind(&menu.restaurant_name)
        .bind(&menu.tagline)
        .bind(&menu.header_image)
        .bind(&design_config)
        .bind(menu.is_published)
        .bind(utils::generate_share_slug())
        .bind(now)
        .bind(now)
        .fetch_one(&state.db_pool)
        .await;

        match created {
            Ok(created) => {
                log::info!("Menu created: {} ({})", created.id, created.share_slug);
                return Ok(created);
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                log::warn!("Share slug collision on attempt {}, regenerating", attempt);
            }
            Err(e) => return Err(e.into()),
        }
    }

    log::error!("Could not mint a unique share slug for user {}", user_id);
    Err(AppError::InternalServerError)
}

/// Applies only the provided fields, guarded by ownership in the same statement.
pub async fn update_menu(
    state: &AppState,
    user_id: &str,
    id: i64,
    patch: MenuPatch,
) -> Result<Menu, AppError> {
    if let Some(template_id) = patch.template_id {
        require_template(state, template_id).await?;
    }

    let mut query = QueryBuilder::<Sqlite>::new("UPDATE menus SET updated_at = ");
    query.push_bind(utils::now());
    if let Some(name) = patch.name {
        query.push(", name = ").push_bind(name);
    }
    if let Some(description) = patch.description {
        query.push(", description = ").push_bind(description);
    }
    if let Some(restaurant_name) = patch.restaurant_name {
        query.push(", restaurant_name = ").push_bind(restaurant_name);
    }
    if let Some(tagline) = patch.tagline {
        query.push(", tagline = ").push_bind(tagline);
    }
    if let Some(header_image) = patch.header_image {
        query.push(", header_image = ").push_bind(header_image);
    }
    if let Some(design_config) = patch.design_config {
        query.push(", design_config = ").push_bind(Json(design_config));
    }
    if let Some(template_id) = patch.template_id {
        query.push(", template_id = ").push_bind(template_id);
    }
    if let Some(is_published) = patch.is_published {
        query.push(", is_published = ").push_bind(is_published);
    }
    query
        .push(" WHERE id = ")
        .push_bind(id)
        .push(" AND user_id = ")
        .push_bind(user_id)
        .push(" RETURNING *");

    let updated = query
        .build_query_as::<Menu>()
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or_else(|| {
            log::warn!("Menu {} not updatable by user {}", id, user_id);
            AppError::NotFound
        })?;
    log::info!("Menu updated: {}", updated.id);
    Ok(updated)
}

/// Removes the menu together with its sections and their items.
pub async fn delete_menu(state: &AppState, user_id: &str, id: i64) -> Result<(), AppError> {
    let mut tx = state.db_pool.begin().await?;

    sqlx::query(
        "DELETE FROM menu_items WHERE section_id IN (
            SELECT s.id FROM menu_sections s JOIN menus m ON m.id = s.menu_id
            WHERE m.id = $1 AND m.user_id = $2)",
    )
    .bind(id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "DELETE FROM menu_sections WHERE menu_id IN (
            SELECT id FROM menus WHERE id = $1 AND user_id = $2)",
    )
    .bind(id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    let deleted = sqlx::query("DELETE FROM menus WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    if deleted.rows_affected() == 0 {
        tx.rollback().await?;
        log::warn!("Menu {} not deletable by user {}", id, user_id);
        return Err(AppError::NotFound);
    }

    tx.commit().await?;
    log::info!("Menu with id {} deleted", id);
    Ok(())
}

pub async fn get_menu_sections(state: &AppState, menu_id: i64) -> Result<Vec<MenuSection>, sqlx::Error> {
    sqlx::query_as::<_, MenuSection>(
        "SELECT * FROM menu_sections WHERE menu_id = $1 ORDER BY sort_order, id",
    )
    .bind(menu_id)
    .fetch_all(&state.db_pool)
    .await
}

pub async fn get_section_items(state: &AppState, section_id: i64) -> Result<Vec<MenuItem>, sqlx::Error> {
    sqlx::query_as::<_, MenuItem>(
        "SELECT * FROM menu_items WHERE section_id = $1 ORDER BY sort_order, id",
    )
    .bind(section_id)
    .fetch_all(&state.db_pool)
    .await
}

/// Assembles the menu, its sections and each section's items.
///
/// Item reads for the sections run concurrently; the result keeps section order.
pub async fn get_full_menu(state: &AppState, menu_id: i64) -> Result<FullMenu, AppError> {
    let menu = get_menu(state, menu_id).await?.ok_or(AppError::NotFound)?;
    let sections = get_menu_sections(state, menu.id).await?;
    let items = try_join_all(sections.iter().map(|s| get_section_items(state, s.id))).await?;

    let sections = sections
        .into_iter()
        .zip(items)
        .map(|(section, items)| SectionWithItems { section, items })
        .collect();
    Ok(FullMenu { menu, sections })
}

pub async fn get_owned_section(
    state: &AppState,
    user_id: &str,
    id: i64,
) -> Result<Option<MenuSection>, sqlx::Error> {
    sqlx::query_as::<_, MenuSection>(
        "SELECT s.* FROM menu_sections s JOIN menus m ON m.id = s.menu_id
         WHERE s.id = $1 AND m.user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&state.db_pool)
    .await
}

pub async fn create_section(
    state: &AppState,
    user_id: &str,
    menu_id: i64,
    section: NewSection,
) -> Result<MenuSection, AppError> {
    let created = sqlx::query_as::<_, MenuSection>(
        "INSERT INTO menu_sections (menu_id, name, name_ar, description, description_ar,
            sort_order, is_visible, created_at)
         SELECT id, $1, $2, $3, $4, $5, $6, $7 FROM menus WHERE id = $8 AND user_id = $9
         RETURNING *",
    )
    .bind(section.name)
    .bind(section.name_ar)
    .bind(section.description)
    .bind(section.description_ar)
    .bind(section.sort_order)
    .bind(section.is_visible)
    .bind(utils::now())
    .bind(menu_id)
    .bind(user_id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| {
        log::warn!("Menu {} not found for user {}", menu_id, user_id);
        AppError::NotFound
    })?;
    log::info!("Section created: {} in menu {}", created.id, menu_id);
    Ok(created)
}

pub async fn update_section(
    state: &AppState,
    user_id: &str,
    id: i64,
    patch: SectionPatch,
) -> Result<MenuSection, AppError> {
    // sections carry no updated_at, so an empty patch is a plain read
    if patch.is_empty() {
        return get_owned_section(state, user_id, id)
            .await?
            .ok_or(AppError::NotFound);
    }

    let mut query = QueryBuilder::<Sqlite>::new("UPDATE menu_sections SET ");
    {
        let mut set = query.separated(", ");
        if let Some(name) = patch.name {
            set.push("name = ").push_bind_unseparated(name);
        }
        if let Some(name_ar) = patch.name_ar {
            set.push("name_ar = ").push_bind_unseparated(name_ar);
        }
        if let Some(description) = patch.description {
            set.push("description = ").push_bind_unseparated(description);
        }
        if let Some(description_ar) = patch.description_ar {
            set.push("description_ar = ").push_bind_unseparated(description_ar);
        }
        if let Some(sort_order) = patch.sort_order {
            set.push("sort_order = ").push_bind_unseparated(sort_order);
        }
        if let Some(is_visible) = patch.is_visible {
            set.push("is_visible = ").push_bind_unseparated(is_visible);
        }
    }
    query
        .push(" WHERE id = ")
        .push_bind(id)
        .push(" AND menu_id IN (SELECT id FROM menus WHERE user_id = ")
        .push_bind(user_id)
        .push(") RETURNING *");

    let updated = query
        .build_query_as::<MenuSection>()
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or_else(|| {
            log::warn!("Section {} not updatable by user {}", id, user_id);
            AppError::NotFound
        })?;
    log::info!("Section updated: {}", updated.id);
    Ok(updated)
}

/// Removes the section and its items.
pub async fn delete_section(state: &AppState, user_id: &str, id: i64) -> Result<(), AppError> {
    let mut tx = state.db_pool.begin().await?;

    sqlx::query(
        "DELETE FROM menu_items WHERE section_id IN (
            SELECT s.id FROM menu_sections s JOIN menus m ON m.id = s.menu_id
            WHERE s.id = $1 AND m.user_id = $2)",
    )
    .bind(id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    let deleted = sqlx::query(
        "DELETE FROM menu_sections WHERE id = $1
         AND menu_id IN (SELECT id FROM menus WHERE user_id = $2)",
    )
    .bind(id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    if deleted.rows_affected() == 0 {
        tx.rollback().await?;
        log::warn!("Section {} not deletable by user {}", id, user_id);
        return Err(AppError::NotFound);
    }

    tx.commit().await?;
    log::info!("Section with id {} deleted", id);
    Ok(())
}

pub async fn create_item(
    state: &AppState,
    user_id: &str,
    section_id: i64,
    item: NewItem,
) -> Result<MenuItem, AppError> {
    let now = utils::now();
    let created = sqlx::query_as::<_, MenuItem>(
        "INSERT INTO menu_items (section_id, name, name_ar, description, description_ar,
            price_cents, image, model_3d, allergens, extras, is_available, is_spicy,
            is_vegetarian, sort_order, created_at, updated_at)
         SELECT s.id, $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15
         FROM menu_sections s JOIN menus m ON m.id = s.menu_id
         WHERE s.id = $16 AND m.user_id = $17
         RETURNING *",
    )
    .bind(item.name)
    .bind(item.name_ar)
    .bind(item.description)
    .bind(item.description_ar)
    .bind(item.price.cents())
    .bind(item.image)
    .bind(item.model3d)
    .bind(item.allergens.map(Json))
    .bind(item.extras.map(Json))
    .bind(item.is_available)
    .bind(item.is_spicy)
    .bind(item.is_vegetarian)
    .bind(item.sort_order)
    .bind(now)
    .bind(now)
    .bind(section_id)
    .bind(user_id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| {
        log::warn!("Section {} not found for user {}", section_id, user_id);
        AppError::NotFound
    })?;
    log::info!("Item created: {} in section {}", created.id, section_id);
    Ok(created)
}

pub async fn update_item(
    state: &AppState,
    user_id: &str,
    id: i64,
    patch: ItemPatch,
) -> Result<MenuItem, AppError> {
    let mut query = QueryBuilder::<Sqlite>::new("UPDATE menu_items SET updated_at = ");
    query.push_bind(utils::now());
    if let Some(name) = patch.name {
        query.push(", name = ").push_bind(name);
    }
    if let Some(name_ar) = patch.name_ar {
        query.push(", name_ar = ").push_bind(name_ar);
    }
    if let Some(description) = patch.description {
        query.push(", description = ").push_bind(description);
    }
    if let Some(description_ar) = patch.description_ar {
        query.push(", description_ar = ").push_bind(description_ar);
    }
    if let Some(price) = patch.price {
        query.push(", price_cents = ").push_bind(price.cents());
    }
    if let Some(image) = patch.image {
        query.push(", image = ").push_bind(image);
    }
    if let Some(model3d) = patch.model3d {
        query.push(", model_3d = ").push_bind(model3d);
    }
    if let Some(allergens) = patch.allergens {
        query.push(", allergens = ").push_bind(Json(allergens));
    }
    if let Some(extras) = patch.extras {
        query.push(", extras = ").push_bind(Json(extras));
    }
    if let Some(is_available) = patch.is_available {
        query.push(", is_available = ").push_bind(is_available);
    }
    if let Some(is_spicy) = patch.is_spicy {
        query.push(", is_spicy = ").push_bind(is_spicy);
    }
    if let Some(is_vegetarian) = patch.is_vegetarian {
        query.push(", is_vegetarian = ").push_bind(is_vegetarian);
    }
    if let Some(sort_order) = patch.sort_order {
        query.push(", sort_order = ").push_bind(sort_order);
    }
    query
        .push(" WHERE id = ")
        .push_bind(id)
        .push(
            " AND section_id IN (SELECT s.id FROM menu_sections s JOIN menus m ON m.id = s.menu_id
              WHERE m.user_id = ",
        )
        .push_bind(user_id)
        .push(") RETURNING *");

    let updated = query
        .build_query_as::<MenuItem>()
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or_else(|| {
            log::warn!("Item {} not updatable by user {}", id, user_id);
            AppError::NotFound
        })?;
    log::info!("Item updated: {}", updated.id);
    Ok(updated)
}

pub async fn delete_item(state: &AppState, user_id: &str, id: i64) -> Result<(), AppError> {
    let deleted = sqlx::query(
        "DELETE FROM menu_items WHERE id = $1 AND section_id IN (
            SELECT s.id FROM menu_sections s JOIN menus m ON m.id = s.menu_id
            WHERE m.user_id = $2)",
    )
    .bind(id)
    .bind(user_id)
    .execute(&state.db_pool)
    .await?;

    if deleted.rows_affected() == 0 {
        log::warn!("Item {} not deletable by user {}", id, user_id);
        return Err(AppError::NotFound);
    }
    log::info!("Item with id {} deleted", id);
    Ok(())
}
