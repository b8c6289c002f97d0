use std::{path::PathBuf, sync::Arc};

use shared::error::{ApiError, ErrorCode};
use storage::Storage;

mod catalog;
mod images;
mod mail;
mod orders;
mod restock;

pub use catalog::{
    add_category, available_medicines, count_categories, get_category, get_dispensary,
    get_medicine, list_categories, list_dispensaries, list_medicines, search_categories,
    units_ordered_for_category,
};
pub use images::{is_safe_image_name, store_medicine_image, ImageUpload, IMAGES_ROUTE};
pub use mail::{DisabledMailer, Mailer, OutgoingMail};
pub use orders::{
    add_line, create_order, get_order, pending_orders_for, remove_line, ship_order,
    LOYALTY_DISCOUNT, LOYALTY_THRESHOLD_ARTICLES,
};
pub use restock::restock;

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub mailer: Arc<dyn Mailer>,
    pub settings: ServiceSettings,
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Directory receiving uploaded medicine images.
    pub upload_dir: PathBuf,
    /// When set, every restock mail goes to this address instead of the supplier's.
    pub restock_recipient: Option<String>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("./data/images"),
            restock_recipient: None,
        }
    }
}

impl ApiContext {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            mailer: Arc::new(DisabledMailer),
            settings: ServiceSettings::default(),
        }
    }
}

fn internal(err: anyhow::Error) -> ApiError {
    tracing::error!(error = %err, "storage failure");
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
