//! Address book repository.
//!
//! Default promotion always demotes the user's other addresses inside the
//! same transaction; the row locks taken by the demote serialize concurrent
//! promotions for one user, and a partial unique index on
//! `(user_id) WHERE is_default` backstops the invariant.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use maplemart_core::{AddressId, UserId};
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::{Address, NewAddress};
use crate::store::{AddressBook, StoreError};

/// Internal row type for address queries.
#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: i32,
    user_id: i32,
    first_name: String,
    last_name: String,
    street: String,
    city: String,
    state: String,
    zip_code: String,
    country: String,
    phone: String,
    is_default: bool,
    created_at: DateTime<Utc>,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: AddressId::new(row.id),
            user_id: UserId::new(row.user_id),
            first_name: row.first_name,
            last_name: row.last_name,
            street: row.street,
            city: row.city,
            state: row.state,
            zip_code: row.zip_code,
            country: row.country,
            phone: row.phone,
            is_default: row.is_default,
            created_at: row.created_at,
        }
    }
}

const ADDRESS_COLUMNS: &str = "id, user_id, first_name, last_name, street, city, state, \
     zip_code, country, phone, is_default, created_at";

/// Clear the default flag on every address of `user` except `keep`.
async fn demote_defaults(
    tx: &mut Transaction<'_, Postgres>,
    user: UserId,
    keep: Option<AddressId>,
) -> Result<(), StoreError> {
    sqlx::query(
        "UPDATE addresses SET is_default = FALSE \
         WHERE user_id = $1 AND is_default AND id <> COALESCE($2, -1)",
    )
    .bind(user)
    .bind(keep)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Repository for saved addresses.
pub struct PgAddresses {
    pool: PgPool,
}

impl PgAddresses {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AddressBook for PgAddresses {
    async fn list(&self, user: UserId) -> Result<Vec<Address>, StoreError> {
        let sql = format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE user_id = $1 \
             ORDER BY is_default DESC, created_at DESC, id DESC"
        );
        let rows: Vec<AddressRow> = sqlx::query_as(&sql).bind(user).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get(&self, id: AddressId) -> Result<Option<Address>, StoreError> {
        let sql = format!("SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = $1");
        let row: Option<AddressRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn create(&self, user: UserId, address: NewAddress) -> Result<Address, StoreError> {
        let mut tx = self.pool.begin().await?;

        if address.is_default {
            demote_defaults(&mut tx, user, None).await?;
        }

        let sql = format!(
            "INSERT INTO addresses (user_id, first_name, last_name, street, city, state, \
             zip_code, country, phone, is_default) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {ADDRESS_COLUMNS}"
        );
        let row: AddressRow = sqlx::query_as(&sql)
            .bind(user)
            .bind(&address.first_name)
            .bind(&address.last_name)
            .bind(&address.street)
            .bind(&address.city)
            .bind(&address.state)
            .bind(&address.zip_code)
            .bind(&address.country)
            .bind(&address.phone)
            .bind(address.is_default)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn update(
        &self,
        id: AddressId,
        address: NewAddress,
    ) -> Result<Option<Address>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let owner: Option<(i32,)> =
            sqlx::query_as("SELECT user_id FROM addresses WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((owner,)) = owner else {
            return Ok(None);
        };

        if address.is_default {
            demote_defaults(&mut tx, UserId::new(owner), Some(id)).await?;
        }

        let sql = format!(
            "UPDATE addresses SET first_name = $2, last_name = $3, street = $4, city = $5, \
             state = $6, zip_code = $7, country = $8, phone = $9, is_default = $10 \
             WHERE id = $1 \
             RETURNING {ADDRESS_COLUMNS}"
        );
        let row: AddressRow = sqlx::query_as(&sql)
            .bind(id)
            .bind(&address.first_name)
            .bind(&address.last_name)
            .bind(&address.street)
            .bind(&address.city)
            .bind(&address.state)
            .bind(&address.zip_code)
            .bind(&address.country)
            .bind(&address.phone)
            .bind(address.is_default)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(row.into()))
    }

    async fn set_default(&self, id: AddressId) -> Result<Option<Address>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let owner: Option<(i32,)> =
            sqlx::query_as("SELECT user_id FROM addresses WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((owner,)) = owner else {
            return Ok(None);
        };

        demote_defaults(&mut tx, UserId::new(owner), Some(id)).await?;

        let sql = format!(
            "UPDATE addresses SET is_default = TRUE WHERE id = $1 RETURNING {ADDRESS_COLUMNS}"
        );
        let row: AddressRow = sqlx::query_as(&sql).bind(id).fetch_one(&mut *tx).await?;

        tx.commit().await?;
        Ok(Some(row.into()))
    }

    async fn delete(&self, id: AddressId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
