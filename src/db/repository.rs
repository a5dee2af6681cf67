//! Database repository for clothing items and saved outfits.
//!
//! Every query is scoped by owning user. Multi-record updates run in a transaction.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::models::{
    ClassifiedItem, ClothingCategory, ClothingItem, NewSavedOutfit, SavedOutfit,
};
use crate::store::{ItemStore, OutfitStore, StoreError};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ItemStore for Repository {
    async fn list(&self, user_id: &str) -> Result<Vec<ClothingItem>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, user_id, name, category, color, style, material, image, set_id, created_at FROM clothes WHERE user_id = ? ORDER BY created_at, id"
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(item_from_row).collect())
    }

    async fn create(
        &self,
        user_id: &str,
        fields: &ClassifiedItem,
        image_ref: &str,
    ) -> Result<ClothingItem, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO clothes (id, user_id, name, category, color, style, material, image, set_id, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL, ?)"
        )
        .bind(&id)
        .bind(user_id)
        .bind(&fields.name)
        .bind(fields.category.as_str())
        .bind(&fields.color)
        .bind(&fields.style)
        .bind(&fields.material)
        .bind(image_ref)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(ClothingItem {
            id,
            user_id: user_id.to_string(),
            name: fields.name.clone(),
            category: fields.category,
            color: fields.color.clone(),
            style: fields.style.clone(),
            material: fields.material.clone(),
            image: image_ref.to_string(),
            set_id: None,
            created_at: now,
        })
    }

    async fn delete(&self, user_id: &str, item_id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM clothes WHERE id = ? AND user_id = ?")
            .bind(item_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Item {} not found", item_id)));
        }
        Ok(())
    }

    async fn update_set_id(
        &self,
        user_id: &str,
        item_ids: &[String],
        set_id: Option<&str>,
    ) -> Result<(), StoreError> {
        // Dropping the transaction without commit rolls every update back
        let mut tx = self.pool.begin().await?;

        for item_id in item_ids {
            let result = sqlx::query("UPDATE clothes SET set_id = ? WHERE id = ? AND user_id = ?")
                .bind(set_id)
                .bind(item_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;

            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(format!("Item {} not found", item_id)));
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl OutfitStore for Repository {
    async fn list(&self, user_id: &str) -> Result<Vec<SavedOutfit>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, user_id, name, description, item_ids, item_images, fingerprint, created_at FROM outfits WHERE user_id = ? ORDER BY created_at, id"
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(outfit_from_row).collect())
    }

    async fn create(
        &self,
        user_id: &str,
        outfit: &NewSavedOutfit,
    ) -> Result<SavedOutfit, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let item_ids_json = serde_json::to_string(&outfit.item_ids)?;
        let item_images_json = serde_json::to_string(&outfit.item_images)?;

        sqlx::query(
            "INSERT INTO outfits (id, user_id, name, description, item_ids, item_images, fingerprint, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&id)
        .bind(user_id)
        .bind(&outfit.name)
        .bind(&outfit.description)
        .bind(&item_ids_json)
        .bind(&item_images_json)
        .bind(&outfit.fingerprint)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(SavedOutfit {
            id,
            user_id: user_id.to_string(),
            name: outfit.name.clone(),
            description: outfit.description.clone(),
            item_ids: outfit.item_ids.clone(),
            item_images: outfit.item_images.clone(),
            fingerprint: outfit.fingerprint.clone(),
            created_at: now,
        })
    }

    async fn delete(&self, user_id: &str, outfit_id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM outfits WHERE id = ? AND user_id = ?")
            .bind(outfit_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Outfit {} not found", outfit_id)));
        }
        Ok(())
    }
}

// Helper functions for row conversion

fn item_from_row(row: &sqlx::sqlite::SqliteRow) -> ClothingItem {
    let category: String = row.get("category");
    ClothingItem {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        category: ClothingCategory::coerce(&category),
        color: row.get("color"),
        style: row.get("style"),
        material: row.get("material"),
        image: row.get("image"),
        set_id: row.get("set_id"),
        created_at: row.get("created_at"),
    }
}

fn outfit_from_row(row: &sqlx::sqlite::SqliteRow) -> SavedOutfit {
    let item_ids: String = row.get("item_ids");
    let item_images: String = row.get("item_images");
    SavedOutfit {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        description: row.get("description"),
        item_ids: parse_json_array(&item_ids),
        item_images: parse_json_array(&item_images),
        fingerprint: row.get("fingerprint"),
        created_at: row.get("created_at"),
    }
}

fn parse_json_array(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}
