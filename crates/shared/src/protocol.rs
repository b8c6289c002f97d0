use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Dispensary, LineId, MedicineRef, MedicineSummary, OrderLine, OrderNumber};

/// Path of the categories collection, relative to the page hosting the view.
pub const CATEGORIES_PATH: &str = "api/categories";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderHeader {
    pub number: OrderNumber,
    pub dispensary: Dispensary,
    pub entered_on: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub number: OrderNumber,
    pub entered_on: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipped_on: Option<NaiveDate>,
    pub discount: f64,
    pub dispensary: Dispensary,
    pub lines: Vec<LineDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineDetails {
    pub id: LineId,
    pub medicine: MedicineSummary,
    pub quantity: i64,
}

impl From<OrderLine> for LineDetails {
    fn from(line: OrderLine) -> Self {
        Self {
            id: line.id,
            medicine: line.medicine,
            quantity: line.quantity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLineQuery {
    pub order: i64,
    pub medicine: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddCategoryQuery {
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitsPerMedicine {
    pub name: String,
    pub units: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadResponse {
    pub reference: MedicineRef,
    pub name: String,
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestockMail {
    pub supplier: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub medicine_count: usize,
    pub delivered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestockReport {
    pub mails: Vec<RestockMail>,
    pub summary: String,
}

impl RestockReport {
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for mail in &self.mails {
            text.push_str(&format!(
                "Mail {} for {} ({} medicines)\n",
                if mail.delivered { "sent" } else { "simulated" },
                mail.supplier,
                mail.medicine_count
            ));
        }
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&self.summary);
        text
    }
}
