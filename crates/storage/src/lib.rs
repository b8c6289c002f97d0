use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite, Transaction,
};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::{
    Category, CategoryCode, CategoryHeader, Dispensary, DispensaryCode, LineId, Medicine,
    MedicineRef, MedicineSummary, Order, OrderLine, OrderNumber, PostalAddress, Supplier,
    SupplierId, DEFAULT_QUANTITY_PER_UNIT, DEFAULT_UNIT_PRICE,
};

mod seed;

pub use seed::SeedOutcome;

const MEDICINE_COLUMNS: &str = "m.reference, m.name, m.quantity_per_unit, m.unit_price, \
     m.units_in_stock, m.units_ordered, m.reorder_level, m.unavailable, m.image_url, \
     m.category_code, c.label AS category_label";

const ORDER_COLUMNS: &str = "number, entered_on, shipped_on, freight, recipient, address, city, \
     region, postal_code, country, discount, dispensary_code";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct NewMedicine {
    pub name: String,
    pub category: CategoryCode,
    pub quantity_per_unit: Option<String>,
    pub unit_price: Option<f64>,
    pub units_in_stock: i64,
    pub reorder_level: i64,
    pub unavailable: bool,
}

impl NewMedicine {
    pub fn new(name: impl Into<String>, category: CategoryCode) -> Self {
        Self {
            name: name.into(),
            category,
            quantity_per_unit: None,
            unit_price: None,
            units_in_stock: 0,
            reorder_level: 0,
            unavailable: false,
        }
    }

    pub fn with_stock(mut self, units_in_stock: i64, reorder_level: i64) -> Self {
        self.units_in_stock = units_in_stock;
        self.reorder_level = reorder_level;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AddLineOutcome {
    Added(OrderLine),
    MedicineNotFound,
    MedicineUnavailable,
    NotEnoughStock { free_units: i64 },
    OrderNotFound,
    OrderShipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveLineOutcome {
    Removed,
    Missing,
    OrderShipped,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShipOrderOutcome {
    Shipped(Order),
    OrderNotFound,
    AlreadyShipped,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Read-then-write transactions take the write lock up front, so a concurrent
    /// commit cannot invalidate their snapshot halfway through.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .context("failed to start write transaction")
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn create_category(
        &self,
        label: &str,
        description: Option<&str>,
    ) -> Result<CategoryCode> {
        let rec = sqlx::query("INSERT INTO categories (label, description) VALUES (?, ?) RETURNING code")
            .bind(label)
            .bind(description)
            .fetch_one(&self.pool)
            .await?;
        Ok(CategoryCode(rec.get::<i64, _>(0)))
    }

    pub async fn count_categories(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Categories ordered by code, each carrying its medicines.
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT code, label, description FROM categories ORDER BY code")
            .fetch_all(&self.pool)
            .await?;
        self.attach_medicines(rows.iter().map(category_from_row).collect())
            .await
    }

    pub async fn category(&self, code: CategoryCode) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT code, label, description FROM categories WHERE code = ?")
            .bind(code.0)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut categories = self.attach_medicines(vec![category_from_row(&row)]).await?;
        Ok(categories.pop())
    }

    pub async fn category_by_label(&self, label: &str) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT code FROM categories WHERE label = ?")
            .bind(label)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => self.category(CategoryCode(row.get::<i64, _>(0))).await,
            None => Ok(None),
        }
    }

    pub async fn search_categories(&self, fragment: &str) -> Result<Vec<Category>> {
        let rows = sqlx::query(
            "SELECT code, label, description FROM categories
             WHERE instr(label, ?) > 0
             ORDER BY code",
        )
        .bind(fragment)
        .fetch_all(&self.pool)
        .await?;
        self.attach_medicines(rows.iter().map(category_from_row).collect())
            .await
    }

    async fn attach_medicines(&self, mut categories: Vec<Category>) -> Result<Vec<Category>> {
        if categories.is_empty() {
            return Ok(categories);
        }
        let placeholders = vec!["?"; categories.len()].join(", ");
        let sql = format!(
            "SELECT {MEDICINE_COLUMNS}
             FROM medicines m
             INNER JOIN categories c ON c.code = m.category_code
             WHERE m.category_code IN ({placeholders})
             ORDER BY m.reference"
        );
        let mut query = sqlx::query(&sql);
        for category in &categories {
            query = query.bind(category.code.0);
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut by_category: BTreeMap<i64, Vec<MedicineSummary>> = BTreeMap::new();
        for row in &rows {
            let medicine = medicine_from_row(row)?;
            by_category
                .entry(medicine.category.code.0)
                .or_default()
                .push(medicine.summary);
        }
        for category in &mut categories {
            category.medicines = by_category.remove(&category.code.0).unwrap_or_default();
        }
        Ok(categories)
    }

    pub async fn create_supplier(
        &self,
        name: &str,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<SupplierId> {
        let rec = sqlx::query("INSERT INTO suppliers (name, email, phone) VALUES (?, ?, ?) RETURNING id")
            .bind(name)
            .bind(email)
            .bind(phone)
            .fetch_one(&self.pool)
            .await?;
        Ok(SupplierId(rec.get::<i64, _>(0)))
    }

    pub async fn link_supplier(&self, category: CategoryCode, supplier: SupplierId) -> Result<()> {
        sqlx::query(
            "INSERT INTO category_suppliers (category_code, supplier_id) VALUES (?, ?)
             ON CONFLICT(category_code, supplier_id) DO NOTHING",
        )
        .bind(category.0)
        .bind(supplier.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn suppliers_for_category(&self, category: CategoryCode) -> Result<Vec<Supplier>> {
        let rows = sqlx::query(
            "SELECT s.id, s.name, s.email, s.phone
             FROM suppliers s
             INNER JOIN category_suppliers cs ON cs.supplier_id = s.id
             WHERE cs.category_code = ?
             ORDER BY s.id",
        )
        .bind(category.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| Supplier {
                id: SupplierId(r.get::<i64, _>(0)),
                name: r.get::<String, _>(1),
                email: r.get::<Option<String>, _>(2),
                phone: r.get::<Option<String>, _>(3),
            })
            .collect())
    }

    pub async fn create_medicine(&self, medicine: &NewMedicine) -> Result<MedicineRef> {
        let rec = sqlx::query(
            "INSERT INTO medicines
                (name, quantity_per_unit, unit_price, units_in_stock, reorder_level, unavailable, category_code)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING reference",
        )
        .bind(&medicine.name)
        .bind(
            medicine
                .quantity_per_unit
                .as_deref()
                .unwrap_or(DEFAULT_QUANTITY_PER_UNIT),
        )
        .bind(medicine.unit_price.unwrap_or(DEFAULT_UNIT_PRICE))
        .bind(medicine.units_in_stock)
        .bind(medicine.reorder_level)
        .bind(medicine.unavailable)
        .bind(medicine.category.0)
        .fetch_one(&self.pool)
        .await?;
        Ok(MedicineRef(rec.get::<i64, _>(0)))
    }

    pub async fn count_medicines(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM medicines")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn medicine(&self, reference: MedicineRef) -> Result<Option<Medicine>> {
        let sql = format!(
            "SELECT {MEDICINE_COLUMNS}
             FROM medicines m
             INNER JOIN categories c ON c.code = m.category_code
             WHERE m.reference = ?"
        );
        let row = sqlx::query(&sql)
            .bind(reference.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(medicine_from_row).transpose()
    }

    pub async fn list_medicines(&self) -> Result<Vec<Medicine>> {
        self.medicines_where("1 = 1").await
    }

    /// Medicines that are not flagged unavailable and still have free units.
    pub async fn available_medicines(&self) -> Result<Vec<Medicine>> {
        self.medicines_where("m.unavailable = 0 AND m.units_in_stock > m.units_ordered")
            .await
    }

    pub async fn medicines_below_reorder_level(&self) -> Result<Vec<Medicine>> {
        self.medicines_where("m.units_in_stock < m.reorder_level")
            .await
    }

    async fn medicines_where(&self, predicate: &str) -> Result<Vec<Medicine>> {
        let sql = format!(
            "SELECT {MEDICINE_COLUMNS}
             FROM medicines m
             INNER JOIN categories c ON c.code = m.category_code
             WHERE {predicate}
             ORDER BY m.reference"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(medicine_from_row).collect()
    }

    pub async fn set_medicine_unavailable(
        &self,
        reference: MedicineRef,
        unavailable: bool,
    ) -> Result<bool> {
        let updated = sqlx::query("UPDATE medicines SET unavailable = ? WHERE reference = ?")
            .bind(unavailable)
            .bind(reference.0)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(updated > 0)
    }

    pub async fn set_medicine_image_url(&self, reference: MedicineRef, image_url: &str) -> Result<bool> {
        let updated = sqlx::query("UPDATE medicines SET image_url = ? WHERE reference = ?")
            .bind(image_url)
            .bind(reference.0)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(updated > 0)
    }

    /// Units ordered per medicine name for one category, counting every line.
    pub async fn units_ordered_per_medicine(
        &self,
        category: CategoryCode,
    ) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query(
            "SELECT m.name, SUM(l.quantity)
             FROM order_lines l
             INNER JOIN medicines m ON m.reference = l.medicine_reference
             WHERE m.category_code = ?
             GROUP BY m.name
             ORDER BY m.name",
        )
        .bind(category.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| (r.get::<String, _>(0), r.get::<i64, _>(1)))
            .collect())
    }

    pub async fn create_dispensary(&self, dispensary: &Dispensary) -> Result<()> {
        let address = &dispensary.address;
        sqlx::query(
            "INSERT INTO dispensaries
                (code, name, contact, title, address, city, region, postal_code, country, phone, fax)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(dispensary.code.as_str())
        .bind(&dispensary.name)
        .bind(&dispensary.contact)
        .bind(&dispensary.title)
        .bind(&address.address)
        .bind(&address.city)
        .bind(&address.region)
        .bind(&address.postal_code)
        .bind(&address.country)
        .bind(&dispensary.phone)
        .bind(&dispensary.fax)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn dispensary(&self, code: &DispensaryCode) -> Result<Option<Dispensary>> {
        let row = sqlx::query(
            "SELECT code, name, contact, title, address, city, region, postal_code, country, phone, fax
             FROM dispensaries WHERE code = ?",
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(dispensary_from_row))
    }

    pub async fn list_dispensaries(&self) -> Result<Vec<Dispensary>> {
        let rows = sqlx::query(
            "SELECT code, name, contact, title, address, city, region, postal_code, country, phone, fax
             FROM dispensaries ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(dispensary_from_row).collect())
    }

    /// Articles already delivered to a dispensary, i.e. summed over shipped orders only.
    pub async fn shipped_articles_for(&self, code: &DispensaryCode) -> Result<i64> {
        let total = sqlx::query_scalar(
            "SELECT COALESCE(SUM(l.quantity), 0)
             FROM order_lines l
             INNER JOIN orders o ON o.number = l.order_number
             WHERE o.dispensary_code = ? AND o.shipped_on IS NOT NULL",
        )
        .bind(code.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    /// Inserts an order for `code` with the dispensary's address as delivery address.
    /// Returns `None` when the dispensary does not exist.
    pub async fn create_order(&self, code: &DispensaryCode, discount: f64) -> Result<Option<Order>> {
        let today = Utc::now().date_naive();
        let row = sqlx::query(
            "INSERT INTO orders
                (entered_on, address, city, region, postal_code, country, discount, dispensary_code)
             SELECT ?, address, city, region, postal_code, country, ?, code
             FROM dispensaries WHERE code = ?
             RETURNING number",
        )
        .bind(today)
        .bind(discount)
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => self.order(OrderNumber(row.get::<i64, _>(0))).await,
            None => Ok(None),
        }
    }

    pub async fn order(&self, number: OrderNumber) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE number = ?");
        let row = sqlx::query(&sql)
            .bind(number.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(order_from_row).transpose()
    }

    pub async fn order_lines(&self, number: OrderNumber) -> Result<Vec<OrderLine>> {
        let sql = format!(
            "SELECT l.id, l.order_number, l.quantity, {MEDICINE_COLUMNS}
             FROM order_lines l
             INNER JOIN medicines m ON m.reference = l.medicine_reference
             INNER JOIN categories c ON c.code = m.category_code
             WHERE l.order_number = ?
             ORDER BY l.id"
        );
        let rows = sqlx::query(&sql)
            .bind(number.0)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(line_from_row).collect()
    }

    /// Unshipped orders of a dispensary, most recent first.
    pub async fn pending_orders_for(&self, code: &DispensaryCode) -> Result<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE shipped_on IS NULL AND dispensary_code = ?
             ORDER BY number DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(code.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(order_from_row).collect()
    }

    /// Adds `quantity` units of a medicine to an order inside one transaction.
    /// A second line for the same medicine is merged into the existing one.
    pub async fn add_order_line(
        &self,
        number: OrderNumber,
        reference: MedicineRef,
        quantity: i64,
    ) -> Result<AddLineOutcome> {
        let mut tx = self.begin_write().await?;

        let medicine = sqlx::query(
            "SELECT units_in_stock, units_ordered, unavailable FROM medicines WHERE reference = ?",
        )
        .bind(reference.0)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(medicine) = medicine else {
            return Ok(AddLineOutcome::MedicineNotFound);
        };
        let units_in_stock: i64 = medicine.try_get(0)?;
        let units_ordered: i64 = medicine.try_get(1)?;
        let unavailable: bool = medicine.try_get(2)?;
        if unavailable {
            return Ok(AddLineOutcome::MedicineUnavailable);
        }
        if units_in_stock < quantity + units_ordered {
            return Ok(AddLineOutcome::NotEnoughStock {
                free_units: units_in_stock - units_ordered,
            });
        }

        let shipped_on = sqlx::query("SELECT shipped_on FROM orders WHERE number = ?")
            .bind(number.0)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(shipped_on) = shipped_on else {
            return Ok(AddLineOutcome::OrderNotFound);
        };
        if shipped_on.try_get::<Option<NaiveDate>, _>(0)?.is_some() {
            return Ok(AddLineOutcome::OrderShipped);
        }

        let line_id = sqlx::query(
            "INSERT INTO order_lines (order_number, medicine_reference, quantity) VALUES (?, ?, ?)
             ON CONFLICT(order_number, medicine_reference) DO UPDATE SET quantity = quantity + excluded.quantity
             RETURNING id",
        )
        .bind(number.0)
        .bind(reference.0)
        .bind(quantity)
        .fetch_one(&mut *tx)
        .await?
        .get::<i64, _>(0);

        sqlx::query("UPDATE medicines SET units_ordered = units_ordered + ? WHERE reference = ?")
            .bind(quantity)
            .bind(reference.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let line = self
            .order_line(LineId(line_id))
            .await?
            .context("order line vanished after insert")?;
        Ok(AddLineOutcome::Added(line))
    }

    pub async fn order_line(&self, id: LineId) -> Result<Option<OrderLine>> {
        let sql = format!(
            "SELECT l.id, l.order_number, l.quantity, {MEDICINE_COLUMNS}
             FROM order_lines l
             INNER JOIN medicines m ON m.reference = l.medicine_reference
             INNER JOIN categories c ON c.code = m.category_code
             WHERE l.id = ?"
        );
        let row = sqlx::query(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(line_from_row).transpose()
    }

    pub async fn remove_order_line(&self, id: LineId) -> Result<RemoveLineOutcome> {
        let mut tx = self.begin_write().await?;

        let row = sqlx::query(
            "SELECT l.medicine_reference, l.quantity, o.shipped_on
             FROM order_lines l
             INNER JOIN orders o ON o.number = l.order_number
             WHERE l.id = ?",
        )
        .bind(id.0)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Ok(RemoveLineOutcome::Missing);
        };
        if row.try_get::<Option<NaiveDate>, _>(2)?.is_some() {
            return Ok(RemoveLineOutcome::OrderShipped);
        }
        let reference: i64 = row.try_get(0)?;
        let quantity: i64 = row.try_get(1)?;

        sqlx::query("UPDATE medicines SET units_ordered = units_ordered - ? WHERE reference = ?")
            .bind(quantity)
            .bind(reference)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM order_lines WHERE id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(RemoveLineOutcome::Removed)
    }

    /// Marks an order shipped today and moves its quantities out of stock and out of
    /// the ordered counters.
    pub async fn ship_order(&self, number: OrderNumber) -> Result<ShipOrderOutcome> {
        let mut tx = self.begin_write().await?;

        let row = sqlx::query("SELECT shipped_on FROM orders WHERE number = ?")
            .bind(number.0)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(ShipOrderOutcome::OrderNotFound);
        };
        if row.try_get::<Option<NaiveDate>, _>(0)?.is_some() {
            return Ok(ShipOrderOutcome::AlreadyShipped);
        }

        sqlx::query("UPDATE orders SET shipped_on = ? WHERE number = ?")
            .bind(Utc::now().date_naive())
            .bind(number.0)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "UPDATE medicines
             SET units_in_stock = units_in_stock - (
                     SELECT l.quantity FROM order_lines l
                     WHERE l.order_number = ? AND l.medicine_reference = medicines.reference),
                 units_ordered = units_ordered - (
                     SELECT l.quantity FROM order_lines l
                     WHERE l.order_number = ? AND l.medicine_reference = medicines.reference)
             WHERE reference IN (SELECT medicine_reference FROM order_lines WHERE order_number = ?)",
        )
        .bind(number.0)
        .bind(number.0)
        .bind(number.0)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let order = self
            .order(number)
            .await?
            .context("order vanished after shipping")?;
        Ok(ShipOrderOutcome::Shipped(order))
    }
}

/// True when the error chain carries a SQLite UNIQUE constraint failure.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .is_some_and(|db| db.is_unique_violation())
    })
}

fn category_from_row(row: &SqliteRow) -> Category {
    Category {
        code: CategoryCode(row.get::<i64, _>("code")),
        label: row.get::<String, _>("label"),
        description: row.get::<Option<String>, _>("description"),
        medicines: Vec::new(),
    }
}

fn medicine_from_row(row: &SqliteRow) -> Result<Medicine> {
    Ok(Medicine {
        summary: MedicineSummary {
            reference: MedicineRef(row.try_get("reference")?),
            name: row.try_get("name")?,
            quantity_per_unit: row.try_get("quantity_per_unit")?,
            unit_price: row.try_get("unit_price")?,
            units_in_stock: row.try_get("units_in_stock")?,
            units_ordered: row.try_get("units_ordered")?,
            reorder_level: row.try_get("reorder_level")?,
            unavailable: row.try_get("unavailable")?,
            image_url: row.try_get("image_url")?,
        },
        category: CategoryHeader {
            code: CategoryCode(row.try_get("category_code")?),
            label: row.try_get("category_label")?,
        },
    })
}

fn line_from_row(row: &SqliteRow) -> Result<OrderLine> {
    Ok(OrderLine {
        id: LineId(row.try_get("id")?),
        order_number: OrderNumber(row.try_get("order_number")?),
        quantity: row.try_get("quantity")?,
        medicine: medicine_from_row(row)?.summary,
    })
}

fn address_from_row(row: &SqliteRow) -> PostalAddress {
    PostalAddress {
        address: row.get("address"),
        city: row.get("city"),
        region: row.get("region"),
        postal_code: row.get("postal_code"),
        country: row.get("country"),
    }
}

fn dispensary_from_row(row: &SqliteRow) -> Dispensary {
    Dispensary {
        code: DispensaryCode(row.get("code")),
        name: row.get("name"),
        contact: row.get("contact"),
        title: row.get("title"),
        address: address_from_row(row),
        phone: row.get("phone"),
        fax: row.get("fax"),
    }
}

fn order_from_row(row: &SqliteRow) -> Result<Order> {
    Ok(Order {
        number: OrderNumber(row.try_get("number")?),
        entered_on: row.try_get("entered_on")?,
        shipped_on: row.try_get("shipped_on")?,
        freight: row.try_get("freight")?,
        recipient: row.try_get("recipient")?,
        delivery_address: address_from_row(row),
        discount: row.try_get("discount")?,
        dispensary_code: DispensaryCode(row.try_get("dispensary_code")?),
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
