use std::sync::Arc;

use uuid::Uuid;

use super::{
    error::ServiceError,
    storage::{content_type_for, secure_filename, DocumentStorage},
};
use crate::{
    db::Store,
    models::{documentmodel::*, usermodel::UserRole},
};

/// Maximum accepted upload size.
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct OpenedDocument {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct DocumentService {
    store: Arc<dyn Store>,
    storage: Arc<dyn DocumentStorage>,
}

impl DocumentService {
    pub fn new(store: Arc<dyn Store>, storage: Arc<dyn DocumentStorage>) -> Self {
        Self { store, storage }
    }

    /// Stores the file and records it unverified. Earlier uploads of the same type stay in place.
    pub async fn upload(
        &self,
        professional_id: Uuid,
        document_type: DocumentType,
        filename: &str,
        bytes: &[u8],
    ) -> Result<Document, ServiceError> {
        if bytes.is_empty() {
            return Err(ServiceError::Validation("Uploaded file is empty".to_string()));
        }
        if bytes.len() > MAX_DOCUMENT_BYTES {
            return Err(ServiceError::Validation(format!(
                "File exceeds the {} MB limit",
                MAX_DOCUMENT_BYTES / (1024 * 1024)
            )));
        }
        if self.store.get_professional(professional_id).await?.is_none() {
            return Err(ServiceError::not_found("Professional"));
        }

        let filename = secure_filename(filename);
        let storage_path = self.storage.store(bytes, &filename).await?;

        match self
            .store
            .save_document(professional_id, document_type, filename, storage_path.clone())
            .await
        {
            Ok(document) => {
                tracing::info!(
                    "Professional {} uploaded {} ({} bytes)",
                    professional_id,
                    document_type,
                    bytes.len()
                );
                Ok(document)
            }
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&storage_path).await {
                    tracing::warn!("Could not remove orphaned upload {}: {}", storage_path, cleanup);
                }
                Err(e.into())
            }
        }
    }

    pub async fn list(&self, professional_id: Uuid) -> Result<Vec<Document>, ServiceError> {
        Ok(self.store.get_professional_documents(professional_id).await?)
    }

    /// Returns the document and the recomputed `documents_verified` flag.
    pub async fn set_verified(
        &self,
        document_id: Uuid,
        verified: bool,
    ) -> Result<(Document, bool), ServiceError> {
        let (document, all_verified) = self
            .store
            .set_document_verified(document_id, verified)
            .await?
            .ok_or_else(|| ServiceError::not_found("Document"))?;

        tracing::info!(
            "Document {} marked {} (professional {} fully verified: {})",
            document.id,
            if verified { "verified" } else { "unverified" },
            document.professional_id,
            all_verified
        );
        Ok((document, all_verified))
    }

    pub async fn can_approve(&self, professional_id: Uuid) -> Result<VerificationReport, ServiceError> {
        let documents = self.store.get_professional_documents(professional_id).await?;
        Ok(VerificationReport::of(&documents))
    }

    /// Admins may open any document, professionals only their own.
    pub async fn open(
        &self,
        document_id: Uuid,
        viewer_id: Uuid,
        viewer_role: UserRole,
    ) -> Result<OpenedDocument, ServiceError> {
        let document = self
            .store
            .get_document(document_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Document"))?;

        let allowed = match viewer_role {
            UserRole::Admin => true,
            UserRole::Professional => document.professional_id == viewer_id,
            UserRole::Customer => false,
        };
        if !allowed {
            return Err(ServiceError::not_found("Document"));
        }

        let bytes = self.storage.retrieve(&document.storage_path).await?;
        Ok(OpenedDocument {
            content_type: content_type_for(&document.filename),
            filename: document.filename,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::memory::{fixtures, MemoryStore},
        service::storage::testing::MemoryStorage,
    };

    async fn setup() -> (Arc<MemoryStore>, Arc<MemoryStorage>, DocumentService, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let storage = Arc::new(MemoryStorage::default());
        let plumbing = fixtures::service(&store, "Plumbing", 500.0).await;
        let pro = fixtures::professional(&store, "pete", plumbing.id, false).await;
        let service = DocumentService::new(store.clone(), storage.clone());
        (store, storage, service, pro.user.id)
    }

    #[tokio::test]
    async fn verification_flag_tracks_every_document() {
        let (store, _, service, pro) = setup().await;

        let mut uploaded = Vec::new();
        for document_type in DocumentType::REQUIRED {
            uploaded.push(service.upload(pro, document_type, "scan.pdf", b"%PDF").await.unwrap());
        }

        for (i, document) in uploaded.iter().enumerate() {
            let (_, all) = service.set_verified(document.id, true).await.unwrap();
            assert_eq!(all, i == uploaded.len() - 1);
        }
        assert!(store.professional_profile(pro).await.unwrap().documents_verified);

        // A second, unverified qualification blocks the gate again.
        let extra = service
            .upload(pro, DocumentType::Qualification, "second.pdf", b"%PDF")
            .await
            .unwrap();
        assert!(!store.professional_profile(pro).await.unwrap().documents_verified);
        let report = service.can_approve(pro).await.unwrap();
        assert_eq!(report.unverified, vec![DocumentType::Qualification]);
        assert!(report.missing.is_empty());

        let (_, all) = service.set_verified(extra.id, true).await.unwrap();
        assert!(all);
        assert!(store.professional_profile(pro).await.unwrap().documents_verified);
        let (_, all) = service.set_verified(uploaded[0].id, false).await.unwrap();
        assert!(!all);
        assert!(!store.professional_profile(pro).await.unwrap().documents_verified);
    }

    #[tokio::test]
    async fn only_owner_or_admin_can_open() {
        let (store, _, service, pro) = setup().await;
        let document = service
            .upload(pro, DocumentType::IdProof, "../id card.png", b"png-bytes")
            .await
            .unwrap();
        assert_eq!(document.filename, "id_card.png");

        let opened = service.open(document.id, pro, UserRole::Professional).await.unwrap();
        assert_eq!(opened.bytes, b"png-bytes");
        assert_eq!(opened.content_type, "image/png");

        let admin = fixtures::admin(&store, "root").await;
        assert!(service.open(document.id, admin.user.id, UserRole::Admin).await.is_ok());

        let customer = fixtures::customer(&store, "carol").await;
        assert!(matches!(
            service.open(document.id, customer.user.id, UserRole::Customer).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.open(document.id, Uuid::new_v4(), UserRole::Professional).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn customers_cannot_upload() {
        let (store, storage, service, _) = setup().await;
        let customer = fixtures::customer(&store, "carol").await;

        assert!(matches!(
            service
                .upload(customer.user.id, DocumentType::IdProof, "id.pdf", b"%PDF")
                .await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(storage.files.lock().await.is_empty());
    }

    #[tokio::test]
    async fn storage_failure_records_nothing() {
        let store = Arc::new(MemoryStore::new());
        let plumbing = fixtures::service(&store, "Plumbing", 500.0).await;
        let pro = fixtures::professional(&store, "pete", plumbing.id, false).await;
        let storage = Arc::new(MemoryStorage {
            fail_writes: true,
            ..Default::default()
        });
        let service = DocumentService::new(store.clone(), storage);

        assert!(matches!(
            service
                .upload(pro.user.id, DocumentType::IdProof, "id.pdf", b"%PDF")
                .await,
            Err(ServiceError::Storage(_))
        ));
        assert!(service.list(pro.user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_upload_is_rejected() {
        let (_, _, service, pro) = setup().await;
        assert!(matches!(
            service.upload(pro, DocumentType::IdProof, "id.pdf", b"").await,
            Err(ServiceError::Validation(_))
        ));
    }
}
