use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::documentmodel::{fully_verified, Document, DocumentType};

#[async_trait]
pub trait DocumentExt {
    async fn save_document(
        &self,
        professional_id: Uuid,
        document_type: DocumentType,
        filename: String,
        storage_path: String,
    ) -> Result<Document, sqlx::Error>;

    async fn get_document(&self, document_id: Uuid) -> Result<Option<Document>, sqlx::Error>;

    async fn get_professional_documents(
        &self,
        professional_id: Uuid,
    ) -> Result<Vec<Document>, sqlx::Error>;

    /// Sets the flag and recomputes the owner's `documents_verified`.
    /// Returns the document together with the recomputed aggregate.
    async fn set_document_verified(
        &self,
        document_id: Uuid,
        verified: bool,
    ) -> Result<Option<(Document, bool)>, sqlx::Error>;
}

#[async_trait]
impl DocumentExt for DBClient {
    async fn save_document(
        &self,
        professional_id: Uuid,
        document_type: DocumentType,
        filename: String,
        storage_path: String,
    ) -> Result<Document, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(r#"SELECT user_id FROM professional_profiles WHERE user_id = $1 FOR UPDATE"#)
            .bind(professional_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        let document = sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents (id, professional_id, document_type, filename, storage_path, verified, uploaded_at)
            VALUES ($1, $2, $3, $4, $5, FALSE, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(professional_id)
        .bind(document_type)
        .bind(filename)
        .bind(storage_path)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        // The new document is unverified, so the aggregate cannot hold.
        sqlx::query(r#"UPDATE professional_profiles SET documents_verified = FALSE WHERE user_id = $1"#)
            .bind(professional_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(document)
    }

    async fn get_document(&self, document_id: Uuid) -> Result<Option<Document>, sqlx::Error> {
        sqlx::query_as::<_, Document>(r#"SELECT * FROM documents WHERE id = $1"#)
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_professional_documents(
        &self,
        professional_id: Uuid,
    ) -> Result<Vec<Document>, sqlx::Error> {
        sqlx::query_as::<_, Document>(
            r#"
            SELECT * FROM documents
            WHERE professional_id = $1
            ORDER BY uploaded_at DESC
            "#,
        )
        .bind(professional_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn set_document_verified(
        &self,
        document_id: Uuid,
        verified: bool,
    ) -> Result<Option<(Document, bool)>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let owner = sqlx::query_scalar::<_, Uuid>(
            r#"SELECT professional_id FROM documents WHERE id = $1"#,
        )
        .bind(document_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(owner) = owner else {
            return Ok(None);
        };

        sqlx::query(r#"SELECT user_id FROM professional_profiles WHERE user_id = $1 FOR UPDATE"#)
            .bind(owner)
            .execute(&mut *tx)
            .await?;

        let document = sqlx::query_as::<_, Document>(
            r#"UPDATE documents SET verified = $2 WHERE id = $1 RETURNING *"#,
        )
        .bind(document_id)
        .bind(verified)
        .fetch_one(&mut *tx)
        .await?;

        let all_verified = if verified {
            let documents = sqlx::query_as::<_, Document>(
                r#"SELECT * FROM documents WHERE professional_id = $1"#,
            )
            .bind(owner)
            .fetch_all(&mut *tx)
            .await?;
            fully_verified(&documents)
        } else {
            false
        };

        sqlx::query(r#"UPDATE professional_profiles SET documents_verified = $2 WHERE user_id = $1"#)
            .bind(owner)
            .bind(all_verified)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some((document, all_verified)))
    }
}
