use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use validator::Validate;

use crate::price::Price;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    Indigo,
    Emerald,
    Amber,
    Rose,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FontFamily {
    Inter,
    Serif,
    Sans,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HeaderStyle {
    Image,
    Gradient,
    Solid,
}

/// Visual settings shared by templates and per-menu overrides.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DesignConfig {
    pub color_scheme: ColorScheme,
    pub font_family: FontFamily,
    #[validate(range(min = 1, max = 5, message = "Spacing must be between 1 and 5"))]
    pub spacing: u8,
    pub header_style: HeaderStyle,
}

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MenuTemplate {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub design_config: Json<DesignConfig>,
    pub preview_image: Option<String>,
    pub category: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Menu {
    pub id: i64,
    pub user_id: String,
    pub template_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub restaurant_name: Option<String>,
    pub tagline: Option<String>,
    pub header_image: Option<String>,
    pub design_config: Option<Json<DesignConfig>>,
    pub is_published: bool,
    pub share_slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MenuSection {
    pub id: i64,
    pub menu_id: i64,
    pub name: String,
    pub name_ar: Option<String>,
    pub description: Option<String>,
    pub description_ar: Option<String>,
    pub sort_order: i64,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
}

/// Paid add-on offered with an item, e.g. "Add cheese".
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ItemExtra {
    pub id: String,
    pub name: String,
    pub name_ar: Option<String>,
    pub price: Price,
}

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: i64,
    pub section_id: i64,
    pub name: String,
    pub name_ar: Option<String>,
    pub description: Option<String>,
    pub description_ar: Option<String>,
    #[sqlx(rename = "price_cents", try_from = "i64")]
    pub price: Price,
    pub image: Option<String>,
    #[sqlx(rename = "model_3d")]
    pub model3d: Option<String>,
    pub allergens: Option<Json<Vec<String>>>,
    pub extras: Option<Json<Vec<ItemExtra>>>,
    pub is_available: bool,
    pub is_spicy: bool,
    pub is_vegetarian: bool,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SectionWithItems {
    #[serde(flatten)]
    pub section: MenuSection,
    pub items: Vec<MenuItem>,
}

/// A menu with its sections and their items, both in display order.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct FullMenu {
    pub menu: Menu,
    pub sections: Vec<SectionWithItems>,
}

/// Claims handed over by the identity provider after a successful sign-in.
#[derive(Deserialize, Debug, Clone, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IdentityClaims {
    #[validate(length(min = 1, max = 255, message = "User id must be between 1 and 255 characters"))]
    pub id: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewMenu {
    #[validate(length(min = 1, max = 200, message = "Menu name must be between 1 and 200 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(max = 200, message = "Restaurant name too long"))]
    pub restaurant_name: Option<String>,
    #[validate(length(max = 300, message = "Tagline too long"))]
    pub tagline: Option<String>,
    pub header_image: Option<String>,
    #[validate(nested)]
    pub design_config: Option<DesignConfig>,
    pub template_id: Option<i64>,
    #[serde(default)]
    pub is_published: bool,
}

/// Partial menu update; `None` leaves the column untouched.
#[derive(Deserialize, Debug, Clone, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MenuPatch {
    #[validate(length(min = 1, max = 200, message = "Menu name must be between 1 and 200 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 200, message = "Restaurant name too long"))]
    pub restaurant_name: Option<String>,
    #[validate(length(max = 300, message = "Tagline too long"))]
    pub tagline: Option<String>,
    pub header_image: Option<String>,
    #[validate(nested)]
    pub design_config: Option<DesignConfig>,
    pub template_id: Option<i64>,
    pub is_published: Option<bool>,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize, Debug, Clone, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewSection {
    #[validate(length(min = 1, max = 100, message = "Section name must be between 1 and 100 characters"))]
    pub name: String,
    #[validate(length(max = 100, message = "Arabic section name too long"))]
    pub name_ar: Option<String>,
    pub description: Option<String>,
    pub description_ar: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Sort order must not be negative"))]
    pub sort_order: i64,
    #[serde(default = "default_true")]
    pub is_visible: bool,
}

#[derive(Deserialize, Debug, Clone, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SectionPatch {
    #[validate(length(min = 1, max = 100, message = "Section name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 100, message = "Arabic section name too long"))]
    pub name_ar: Option<String>,
    pub description: Option<String>,
    pub description_ar: Option<String>,
    #[validate(range(min = 0, message = "Sort order must not be negative"))]
    pub sort_order: Option<i64>,
    pub is_visible: Option<bool>,
}

impl SectionPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.name_ar.is_none()
            && self.description.is_none()
            && self.description_ar.is_none()
            && self.sort_order.is_none()
            && self.is_visible.is_none()
    }
}

#[derive(Deserialize, Debug, Clone, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    #[validate(length(min = 1, max = 200, message = "Item name must be between 1 and 200 characters"))]
    pub name: String,
    #[validate(length(max = 200, message = "Arabic item name too long"))]
    pub name_ar: Option<String>,
    pub description: Option<String>,
    pub description_ar: Option<String>,
    pub price: Price,
    pub image: Option<String>,
    pub model3d: Option<String>,
    #[validate(length(max = 32, message = "Too many allergens"))]
    pub allergens: Option<Vec<String>>,
    #[validate(length(max = 32, message = "Too many extras"))]
    pub extras: Option<Vec<ItemExtra>>,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub is_spicy: bool,
    #[serde(default)]
    pub is_vegetarian: bool,
    #[serde(default)]
    #[validate(range(min = 0, message = "Sort order must not be negative"))]
    pub sort_order: i64,
}

#[derive(Deserialize, Debug, Clone, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    #[validate(length(min = 1, max = 200, message = "Item name must be between 1 and 200 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 200, message = "Arabic item name too long"))]
    pub name_ar: Option<String>,
    pub description: Option<String>,
    pub description_ar: Option<String>,
    pub price: Option<Price>,
    pub image: Option<String>,
    pub model3d: Option<String>,
    #[validate(length(max = 32, message = "Too many allergens"))]
    pub allergens: Option<Vec<String>>,
    #[validate(length(max = 32, message = "Too many extras"))]
    pub extras: Option<Vec<ItemExtra>>,
    pub is_available: Option<bool>,
    pub is_spicy: Option<bool>,
    pub is_vegetarian: Option<bool>,
    #[validate(range(min = 0, message = "Sort order must not be negative"))]
    pub sort_order: Option<i64>,
}

#[derive(Serialize, Debug, Clone)]
pub struct UploadedFile {
    pub url: String,
}

/// Catalog entry as written by the storage layer; there is no HTTP route for it.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewTemplate {
    pub name: String,
    pub description: Option<String>,
    pub design_config: DesignConfig,
    pub preview_image: Option<String>,
    pub category: Option<String>,
}
