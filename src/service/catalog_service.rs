use std::{fmt, sync::Arc};

use redis::aio::ConnectionManager;
use uuid::Uuid;

use super::{
    error::ServiceError,
    storage::{content_type_for, secure_filename, DocumentStorage, StorageError},
};
use crate::{
    db::{
        cache::{CacheHelper, SERVICE_CATALOG_KEY, SERVICE_CATALOG_TTL},
        Store,
    },
    models::{servicemodel::*, usermodel::Professional},
};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// An uploaded service picture, before it is stored.
#[derive(Debug, Clone)]
pub struct ServiceImage {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ServiceImage {
    fn validate(&self) -> Result<(), ServiceError> {
        let extension = self
            .filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        if !extension.map_or(false, |ext| IMAGE_EXTENSIONS.contains(&ext.as_str())) {
            return Err(ServiceError::Validation(
                "Service image must be a png, jpg, jpeg or gif file".to_string(),
            ));
        }
        if self.bytes.is_empty() {
            return Err(ServiceError::Validation("Service image is empty".to_string()));
        }
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(ServiceError::Validation(format!(
                "Service image exceeds the {} MB limit",
                MAX_IMAGE_BYTES / (1024 * 1024)
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct OpenedImage {
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
    images: Arc<dyn DocumentStorage>,
    cache: Option<Arc<ConnectionManager>>,
}

impl fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogService")
            .field("store", &self.store)
            .field("images", &self.images)
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

impl CatalogService {
    pub fn new(
        store: Arc<dyn Store>,
        images: Arc<dyn DocumentStorage>,
        cache: Option<Arc<ConnectionManager>>,
    ) -> Self {
        Self { store, images, cache }
    }

    fn validate_numbers(base_price: Option<f64>, avg_duration: Option<i32>) -> Result<(), ServiceError> {
        if base_price.map_or(false, |p| p <= 0.0 || !p.is_finite()) {
            return Err(ServiceError::Validation(
                "Base price must be greater than 0".to_string(),
            ));
        }
        if avg_duration.map_or(false, |d| d <= 0) {
            return Err(ServiceError::Validation(
                "Average duration must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    async fn ensure_name_free(&self, name: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::Validation("Service name is required".to_string()));
        }
        if let Some(existing) = self.store.get_service_by_name(name).await? {
            if Some(existing.id) != except {
                return Err(ServiceError::Conflict(format!(
                    "A service named '{}' already exists",
                    existing.name
                )));
            }
        }
        Ok(())
    }

    async fn invalidate(&self) {
        if let Some(redis) = &self.cache {
            if let Err(e) = CacheHelper::delete(redis, SERVICE_CATALOG_KEY).await {
                tracing::warn!("Failed to invalidate service catalog cache: {}", e);
            }
        }
    }

    async fn store_image(&self, image: Option<ServiceImage>) -> Result<Option<String>, ServiceError> {
        let Some(image) = image else {
            return Ok(None);
        };
        image.validate()?;
        let key = self
            .images
            .store(&image.bytes, &secure_filename(&image.filename))
            .await?;
        tracing::info!("Service image saved as {}", key);
        Ok(Some(key))
    }

    async fn discard_image(&self, key: &str) {
        if let Err(e) = self.images.delete(key).await {
            tracing::warn!("Failed to delete service image {}: {}", key, e);
        }
    }

    pub async fn create(
        &self,
        mut service: NewService,
        image: Option<ServiceImage>,
    ) -> Result<Service, ServiceError> {
        Self::validate_numbers(Some(service.base_price), Some(service.avg_duration))?;
        self.ensure_name_free(&service.name, None).await?;

        service.image_path = self.store_image(image).await?;
        let stored_image = service.image_path.clone();

        let created = match self.store.create_service(service).await {
            Ok(created) => created,
            Err(e) => {
                if let Some(key) = stored_image {
                    self.discard_image(&key).await;
                }
                return Err(if crate::db::db::is_unique_violation(&e) {
                    ServiceError::Conflict("A service with this name already exists".to_string())
                } else {
                    ServiceError::Database(e)
                });
            }
        };
        self.invalidate().await;
        tracing::info!("Service '{}' created", created.name);
        Ok(created)
    }

    pub async fn get(&self, service_id: Uuid) -> Result<Service, ServiceError> {
        self.store
            .get_service(service_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Service"))
    }

    /// A new image replaces the stored one; the old file is removed once the row points at the new one.
    pub async fn update(
        &self,
        service_id: Uuid,
        mut update: ServiceUpdate,
        image: Option<ServiceImage>,
    ) -> Result<Service, ServiceError> {
        Self::validate_numbers(update.base_price, update.avg_duration)?;
        if let Some(name) = &update.name {
            self.ensure_name_free(name, Some(service_id)).await?;
        }
        let previous = self.get(service_id).await?;

        update.image_path = self.store_image(image).await?;
        let stored_image = update.image_path.clone();

        let updated = match self.store.update_service(service_id, update).await {
            Ok(Some(updated)) => updated,
            failed => {
                if let Some(key) = &stored_image {
                    self.discard_image(key).await;
                }
                return match failed {
                    Err(e) => Err(e.into()),
                    _ => Err(ServiceError::not_found("Service")),
                };
            }
        };

        if stored_image.is_some() {
            if let Some(old) = previous.image_path.as_deref() {
                self.discard_image(old).await;
            }
        }
        self.invalidate().await;
        Ok(updated)
    }

    /// Refused while any requested or assigned request still uses the service.
    pub async fn delete(&self, service_id: Uuid) -> Result<(), ServiceError> {
        let image = self.get(service_id).await?.image_path;
        match self.store.delete_service_if_unused(service_id).await? {
            ServiceDeletion::Deleted => {
                if let Some(key) = image.as_deref() {
                    self.discard_image(key).await;
                }
                self.invalidate().await;
                tracing::info!("Service {} deleted", service_id);
                Ok(())
            }
            ServiceDeletion::InUse(open) => Err(ServiceError::Dependency(format!(
                "Service has {} open request(s) and cannot be deleted",
                open
            ))),
            ServiceDeletion::Missing => Err(ServiceError::not_found("Service")),
        }
    }

    pub async fn image(&self, service_id: Uuid) -> Result<OpenedImage, ServiceError> {
        let key = self
            .get(service_id)
            .await?
            .image_path
            .ok_or_else(|| ServiceError::not_found("Service image"))?;
        let bytes = match self.images.retrieve(&key).await {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound(_)) => {
                return Err(ServiceError::not_found("Service image"))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(OpenedImage {
            content_type: content_type_for(&key),
            bytes,
        })
    }

    pub async fn list(&self, filter: ServiceFilter) -> Result<Vec<Service>, ServiceError> {
        Ok(self.store.list_services(filter).await?)
    }

    /// Active catalog as shown publicly, served from cache when available.
    pub async fn active(&self) -> Result<Vec<Service>, ServiceError> {
        if let Some(redis) = &self.cache {
            if let Ok(Some(services)) = CacheHelper::get::<Vec<Service>>(redis, SERVICE_CATALOG_KEY).await {
                return Ok(services);
            }
        }

        let services = self.store.list_services(ServiceFilter::default()).await?;

        if let Some(redis) = &self.cache {
            if let Err(e) = CacheHelper::set(redis, SERVICE_CATALOG_KEY, &services, SERVICE_CATALOG_TTL).await {
                tracing::warn!("Failed to cache service catalog: {}", e);
            }
        }
        Ok(services)
    }

    /// Approved, active professionals offering an active service.
    pub async fn professionals_for(&self, service_id: Uuid) -> Result<Vec<Professional>, ServiceError> {
        let service = self.get(service_id).await?;
        if !service.is_active() {
            return Err(ServiceError::not_found("Service"));
        }
        Ok(self.store.get_professionals(Some(service_id), true).await?)
    }

    /// Public profile; unapproved or blocked professionals are hidden.
    pub async fn professional(&self, user_id: Uuid) -> Result<Professional, ServiceError> {
        match self.store.get_professional(user_id).await? {
            Some(pro) if pro.user.approved && pro.user.active => Ok(pro),
            _ => Err(ServiceError::not_found("Professional")),
        }
    }
}
