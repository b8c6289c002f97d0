use shared::{
    domain::{
        Category, CategoryCode, Dispensary, DispensaryCode, Medicine, MedicineRef,
        DEFAULT_CATEGORY_DESCRIPTION, MAX_LABEL_CHARS,
    },
    error::{ApiError, ErrorCode},
    protocol::UnitsPerMedicine,
};
use tracing::info;

use crate::{internal, ApiContext};

pub async fn list_categories(ctx: &ApiContext) -> Result<Vec<Category>, ApiError> {
    ctx.storage.list_categories().await.map_err(internal)
}

pub async fn get_category(ctx: &ApiContext, code: CategoryCode) -> Result<Category, ApiError> {
    ctx.storage
        .category(code)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found(format!("category {} not found", code.0)))
}

pub async fn search_categories(
    ctx: &ApiContext,
    fragment: &str,
) -> Result<Vec<Category>, ApiError> {
    ctx.storage
        .search_categories(fragment)
        .await
        .map_err(internal)
}

pub async fn count_categories(ctx: &ApiContext) -> Result<i64, ApiError> {
    ctx.storage.count_categories().await.map_err(internal)
}

/// Creates a category; the label must be unique and not blank.
pub async fn add_category(
    ctx: &ApiContext,
    label: &str,
    description: Option<&str>,
) -> Result<Category, ApiError> {
    let label = label.trim();
    if label.is_empty() {
        return Err(ApiError::validation("label must not be blank"));
    }
    if label.chars().count() > MAX_LABEL_CHARS {
        return Err(ApiError::validation(format!(
            "label exceeds {MAX_LABEL_CHARS} characters"
        )));
    }
    let description = description.unwrap_or(DEFAULT_CATEGORY_DESCRIPTION);
    if description.chars().count() > MAX_LABEL_CHARS {
        return Err(ApiError::validation(format!(
            "description exceeds {MAX_LABEL_CHARS} characters"
        )));
    }

    let code = ctx
        .storage
        .create_category(label, Some(description))
        .await
        .map_err(|err| {
            if storage::is_unique_violation(&err) {
                ApiError::new(
                    ErrorCode::Conflict,
                    format!("label '{label}' is already used"),
                )
            } else {
                internal(err)
            }
        })?;
    info!(code = code.0, label, "category created");

    Ok(Category {
        code,
        label: label.to_string(),
        description: Some(description.to_string()),
        medicines: Vec::new(),
    })
}

pub async fn list_medicines(ctx: &ApiContext) -> Result<Vec<Medicine>, ApiError> {
    ctx.storage.list_medicines().await.map_err(internal)
}

pub async fn available_medicines(ctx: &ApiContext) -> Result<Vec<Medicine>, ApiError> {
    ctx.storage.available_medicines().await.map_err(internal)
}

pub async fn get_medicine(ctx: &ApiContext, reference: MedicineRef) -> Result<Medicine, ApiError> {
    ctx.storage
        .medicine(reference)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found(format!("medicine {} not found", reference.0)))
}

pub async fn list_dispensaries(ctx: &ApiContext) -> Result<Vec<Dispensary>, ApiError> {
    ctx.storage.list_dispensaries().await.map_err(internal)
}

pub async fn get_dispensary(
    ctx: &ApiContext,
    code: &DispensaryCode,
) -> Result<Dispensary, ApiError> {
    ctx.storage
        .dispensary(code)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found(format!("dispensary {code} not found")))
}

pub async fn units_ordered_for_category(
    ctx: &ApiContext,
    code: CategoryCode,
) -> Result<Vec<UnitsPerMedicine>, ApiError> {
    let rows = ctx
        .storage
        .units_ordered_per_medicine(code)
        .await
        .map_err(internal)?;
    Ok(rows
        .into_iter()
        .map(|(name, units)| UnitsPerMedicine { name, units })
        .collect())
}
