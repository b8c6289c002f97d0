use anyhow::{Context, Result};
use shared::domain::{Dispensary, DispensaryCode, PostalAddress};

use crate::{NewMedicine, Storage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Seeded { categories: usize, medicines: usize },
    AlreadyPopulated,
}

struct SeedCategory {
    label: &'static str,
    description: &'static str,
    suppliers: &'static [(&'static str, &'static str, &'static str)],
    medicines: &'static [(&'static str, i64, i64)],
}

const CATEGORIES: &[SeedCategory] = &[
    SeedCategory {
        label: "Cardiologie",
        description: "Médicaments pour le coeur",
        suppliers: &[
            ("Pfizer", "orders+pfizer@pharmacy.test", "0102030405"),
            ("Sanofi", "orders+sanofi@pharmacy.test", "0607080910"),
        ],
        medicines: &[("Kardegic", 5, 10), ("Tahor", 20, 5)],
    },
    SeedCategory {
        label: "Douleur",
        description: "Médicaments contre la douleur",
        suppliers: &[
            ("Labo A", "orders+laboa@pharmacy.test", "0111111111"),
            ("Labo B", "orders+labob@pharmacy.test", "0222222222"),
        ],
        medicines: &[("Doliprane", 3, 15), ("Ibuprofène", 2, 10), ("Paracétamol 500mg", 500, 50)],
    },
];

fn dispensaries() -> Vec<Dispensary> {
    vec![
        Dispensary {
            code: DispensaryCode::new("DSP01"),
            name: "Dispensaire du Centre".into(),
            contact: Some("Marie Curie".into()),
            title: Some("Pharmacienne".into()),
            address: PostalAddress {
                address: Some("12 rue de la Paix".into()),
                city: Some("Castres".into()),
                region: Some("Occitanie".into()),
                postal_code: Some("81100".into()),
                country: Some("France".into()),
            },
            phone: Some("0563000001".into()),
            fax: None,
        },
        Dispensary {
            code: DispensaryCode::new("DSP02"),
            name: "Dispensaire du Port".into(),
            contact: Some("Louis Pasteur".into()),
            title: Some("Responsable".into()),
            address: PostalAddress {
                address: Some("3 quai des Chartrons".into()),
                city: Some("Bordeaux".into()),
                region: None,
                postal_code: Some("33000".into()),
                country: Some("France".into()),
            },
            phone: None,
            fax: None,
        },
    ]
}

impl Storage {
    /// Loads the demo catalog unless medicines already exist.
    pub async fn seed_demo_data(&self) -> Result<SeedOutcome> {
        if self.count_medicines().await? > 0 {
            return Ok(SeedOutcome::AlreadyPopulated);
        }

        let mut medicines = 0;
        for category in CATEGORIES {
            let code = match self.category_by_label(category.label).await? {
                Some(existing) => existing.code,
                None => self
                    .create_category(category.label, Some(category.description))
                    .await
                    .with_context(|| format!("failed to seed category {}", category.label))?,
            };
            for (name, email, phone) in category.suppliers {
                let supplier = self.create_supplier(name, Some(email), Some(phone)).await?;
                self.link_supplier(code, supplier).await?;
            }
            for (name, stock, reorder_level) in category.medicines {
                self.create_medicine(&NewMedicine::new(*name, code).with_stock(*stock, *reorder_level))
                    .await
                    .with_context(|| format!("failed to seed medicine {name}"))?;
                medicines += 1;
            }
        }

        for dispensary in dispensaries() {
            if self.dispensary(&dispensary.code).await?.is_none() {
                self.create_dispensary(&dispensary).await?;
            }
        }

        Ok(SeedOutcome::Seeded {
            categories: CATEGORIES.len(),
            medicines,
        })
    }
}
