use std::path::Path;

use sqlx::{Sqlite, migrate::Migrator};

static MIGRATOR: Migrator = sqlx::migrate!(); // defaults to "./migrations"

#[derive(Debug, Clone)]
pub struct Db(sqlx::Pool<Sqlite>);

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Cancelled,
}

#[derive(Debug, sqlx::FromRow)]
pub struct Order {
    pub id: i64,
    pub customer_id: i64,
    /// Order total in minor units.
    pub total: i64,
    pub payment_status: PaymentStatus,
    /// Transaction id reported by the payment provider, set on settlement.
    pub transaction_id: Option<String>,
    pub billing_address_id: i64,
    pub shipping_address_id: Option<i64>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct Address {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub company: String,
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub postal_code: String,
    pub phone: String,
    pub fax: String,
    pub state_or_province: Option<String>,
    pub country: Option<String>,
}

impl Db {
    pub async fn connect() -> sqlx::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").expect("database url to be defined");
        tracing::debug!(%database_url);
        let path = Path::new(
            database_url
                .strip_prefix("sqlite://")
                .expect("url sqlite prefix"),
        );
        {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .expect("directory is initialized");
            }
            tokio::fs::OpenOptions::new()
                .write(true)
                .truncate(false)
                .create(true)
                .open(path)
                .await
                .expect("open database file");
        }
        let pool = sqlx::Pool::connect(&database_url).await?;
        MIGRATOR.run(&pool).await?;
        Ok(Self(pool))
    }

    pub async fn get_order(&self, id: i64) -> sqlx::Result<Option<Order>> {
        sqlx::query_as(
            "SELECT id, customer_id, total, payment_status, transaction_id, \
             billing_address_id, shipping_address_id FROM orders WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.0)
        .await
    }

    pub async fn get_address(&self, id: i64) -> sqlx::Result<Option<Address>> {
        sqlx::query_as(
            "SELECT id, first_name, last_name, email, company, address1, address2, \
             city, postal_code, phone, fax, state_or_province, country \
             FROM addresses WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.0)
        .await
    }

    /// Transitions the order to paid, keyed on it still being pending.
    /// Returns false when some other state was observed, so a racing or
    /// repeated call cannot settle the same order twice.
    pub async fn mark_paid(
        &self,
        order_id: i64,
        transaction_id: Option<&str>,
    ) -> sqlx::Result<bool> {
        let result = sqlx::query(
            "UPDATE orders SET payment_status = 'paid', \
             transaction_id = COALESCE(?, transaction_id) \
             WHERE id = ? AND payment_status = 'pending'",
        )
        .bind(transaction_id)
        .bind(order_id)
        .execute(&self.0)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
impl Db {
    pub async fn in_memory() -> sqlx::Result<Self> {
        // A single long-lived connection, every pooled connection would
        // otherwise get its own private in-memory database.
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        MIGRATOR.run(&pool).await?;
        Ok(Self(pool))
    }

    pub async fn insert_address(&self, address: &Address) -> sqlx::Result<i64> {
        let result = sqlx::query(
            "INSERT INTO addresses (first_name, last_name, email, company, address1, \
             address2, city, postal_code, phone, fax, state_or_province, country) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&address.first_name)
        .bind(&address.last_name)
        .bind(&address.email)
        .bind(&address.company)
        .bind(&address.address1)
        .bind(&address.address2)
        .bind(&address.city)
        .bind(&address.postal_code)
        .bind(&address.phone)
        .bind(&address.fax)
        .bind(&address.state_or_province)
        .bind(&address.country)
        .execute(&self.0)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn insert_order(
        &self,
        customer_id: i64,
        total: i64,
        billing_address_id: i64,
        shipping_address_id: Option<i64>,
    ) -> sqlx::Result<i64> {
        let result = sqlx::query(
            "INSERT INTO orders (customer_id, total, billing_address_id, shipping_address_id) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(customer_id)
        .bind(total)
        .bind(billing_address_id)
        .bind(shipping_address_id)
        .execute(&self.0)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn cancel_order(&self, order_id: i64) -> sqlx::Result<()> {
        sqlx::query("UPDATE orders SET payment_status = 'cancelled' WHERE id = ?")
            .bind(order_id)
            .execute(&self.0)
            .await?;
        Ok(())
    }
}
