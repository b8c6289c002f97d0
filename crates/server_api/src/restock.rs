use std::collections::BTreeMap;

use shared::{
    domain::{Medicine, Supplier},
    error::ApiError,
    protocol::{RestockMail, RestockReport},
};
use tracing::{info, warn};

use crate::{internal, ApiContext, OutgoingMail};

/// Sends one mail per supplier listing the medicines it can restock.
///
/// A mail that the transport refuses is logged as simulated and still
/// counted in the report.
pub async fn restock(ctx: &ApiContext) -> Result<RestockReport, ApiError> {
    let medicines = ctx
        .storage
        .medicines_below_reorder_level()
        .await
        .map_err(internal)?;
    if medicines.is_empty() {
        info!("no medicine below its reorder level");
        return Ok(RestockReport {
            mails: Vec::new(),
            summary: "No medicine needs restocking.".to_string(),
        });
    }

    let mut per_supplier: BTreeMap<i64, (Supplier, Vec<Medicine>)> = BTreeMap::new();
    let mut suppliers_by_category = BTreeMap::new();
    for medicine in medicines {
        let category = medicine.category.code;
        if !suppliers_by_category.contains_key(&category.0) {
            let suppliers = ctx
                .storage
                .suppliers_for_category(category)
                .await
                .map_err(internal)?;
            suppliers_by_category.insert(category.0, suppliers);
        }
        let suppliers = &suppliers_by_category[&category.0];
        if suppliers.is_empty() {
            warn!(
                medicine = %medicine.summary.name,
                category = %medicine.category.label,
                "no supplier for category"
            );
            continue;
        }
        for supplier in suppliers {
            per_supplier
                .entry(supplier.id.0)
                .or_insert_with(|| (supplier.clone(), Vec::new()))
                .1
                .push(medicine.clone());
        }
    }

    let mut mails = Vec::with_capacity(per_supplier.len());
    for (supplier, medicines) in per_supplier.into_values() {
        let Some(recipient) = ctx
            .settings
            .restock_recipient
            .clone()
            .or_else(|| supplier.email.clone())
        else {
            warn!(supplier = %supplier.name, "supplier has no email address");
            continue;
        };

        let mail = OutgoingMail {
            to: recipient,
            subject: format!("Restock request for {}", supplier.name),
            body: mail_body(&supplier, &medicines),
        };
        let delivered = match ctx.mailer.send(&mail).await {
            Ok(()) => {
                info!(supplier = %supplier.name, to = %mail.to, "restock mail sent");
                true
            }
            Err(err) => {
                warn!(
                    supplier = %supplier.name,
                    to = %mail.to,
                    error = %err,
                    "mail not delivered, simulating"
                );
                info!(subject = %mail.subject, body = %mail.body, "simulated restock mail");
                false
            }
        };
        mails.push(RestockMail {
            supplier: supplier.name,
            recipient: mail.to,
            subject: mail.subject,
            body: mail.body,
            medicine_count: medicines.len(),
            delivered,
        });
    }

    let summary = format!(
        "Restock finished. {} mail(s) sent or simulated.",
        mails.len()
    );
    Ok(RestockReport { mails, summary })
}

fn mail_body(supplier: &Supplier, medicines: &[Medicine]) -> String {
    let mut body = format!(
        "Hello {},\n\nThe following medicines are below their reorder level:\n\n",
        supplier.name
    );
    for medicine in medicines {
        body.push_str(&format!(
            "- {} ({}): {} in stock, reorder level {}\n",
            medicine.summary.name,
            medicine.category.label,
            medicine.summary.units_in_stock,
            medicine.summary.reorder_level
        ));
    }
    body.push_str("\nPlease send us a quote for restocking.\n");
    body
}
