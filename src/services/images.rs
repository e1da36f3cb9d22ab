//! Image service: blob storage plus metadata rows, coordinated per scope.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::config::AppConfig;
use crate::context::AppContext;
use crate::di::FromContext;
use crate::error::AppError;
use crate::models::Image;
use crate::query::{PagedList, Predicate, SortItem, SortSpec};
use crate::repository::{ListQuery, Repository};
use crate::storage::ObjectStorage;
use crate::uow::UnitOfWork;

/// Parameters for uploading an image.
#[derive(Debug, Clone)]
pub struct UploadImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub alt_text: String,
    pub description: String,
    pub album_id: Option<String>,
}

/// Listing filters. `page_number` is one-based at this boundary; the
/// repository's page index is zero-based.
#[derive(Debug, Clone, Default)]
pub struct ListImages {
    pub page_number: usize,
    pub page_size: usize,
    pub min_size: Option<i64>,
    pub max_size: Option<i64>,
}

#[derive(FromContext, Clone)]
#[from_context(Context = "AppContext")]
pub struct ImageService {
    images: Repository<Image>,
    storage: Arc<dyn ObjectStorage>,
    uow: Arc<UnitOfWork>,
    config: Arc<AppConfig>,
}

impl ImageService {
    /// Stores the blob and its metadata row in one unit of work; an insert
    /// failure rolls the metadata back (the orphaned blob is deleted best
    /// effort).
    pub async fn upload(&self, input: UploadImage) -> Result<Image, AppError> {
        let size = input.bytes.len() as i64;
        let stored = self
            .storage
            .upload(input.bytes, &input.file_name, &input.content_type)
            .await?;

        let image = Image {
            name: stored.stored_name.clone(),
            url: stored.url.clone(),
            alt_text: input.alt_text,
            description: input.description,
            content_type: input.content_type,
            size,
            uploaded_at: Utc::now(),
            album_id: input.album_id,
            ..Image::default()
        };

        let inserted = self
            .uow
            .execute(|| async move { self.images.insert(image).await })
            .await;

        match inserted {
            Ok(image) => {
                debug!(id = %image.id, name = %image.name, "image uploaded");
                Ok(image)
            }
            Err(error) => {
                let _ = self.storage.delete(&stored.stored_name).await;
                Err(error)
            }
        }
    }

    /// Fetches one image; `refresh_url` re-derives the URL from storage so a
    /// stale stored URL never reaches the caller.
    pub async fn get(&self, id: &str, refresh_url: bool) -> Result<Image, AppError> {
        let mut image = self
            .images
            .get(&id.to_string())
            .await?
            .ok_or_else(|| AppError::ImageNotFound(id.to_string()))?;
        if refresh_url {
            image.url = self.storage.url(&image.name).await?;
        }
        Ok(image)
    }

    pub async fn get_url(&self, id: &str) -> Result<String, AppError> {
        let image = self.get(id, false).await?;
        self.storage.url(&image.name).await
    }

    /// Deletes the image row and its blob. Returns `false` when no such
    /// image exists.
    pub async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let Some(image) = self.images.get(&id.to_string()).await? else {
            return Ok(false);
        };
        self.delete_image(image).await?;
        Ok(true)
    }

    /// Same as [`ImageService::delete`], addressed by stored file name.
    pub async fn delete_by_file_name(&self, file_name: &str) -> Result<bool, AppError> {
        let name = file_name.to_string();
        let filter = Predicate::new(move |image: &Image| image.name == name);
        let Some(image) = self.images.get_by(&filter).await? else {
            return Ok(false);
        };
        self.delete_image(image).await?;
        Ok(true)
    }

    async fn delete_image(&self, image: Image) -> Result<(), AppError> {
        self.uow
            .execute(|| async move {
                self.images.delete(&image).await?;
                self.storage.delete(&image.name).await?;
                Ok(())
            })
            .await
    }

    /// Lists images, newest first, with optional size bounds.
    pub async fn list(&self, input: ListImages) -> Result<PagedList<Image>, AppError> {
        let page_size = if input.page_size == 0 {
            self.config.paging.default_page_size
        } else {
            input.page_size.clamp(1, self.config.paging.max_page_size)
        };
        let page_index = input.page_number.max(1) - 1;

        let mut filter = Predicate::<Image>::always();
        if let Some(min) = input.min_size {
            filter = filter.and(Predicate::new(move |image: &Image| image.size >= min));
        }
        if let Some(max) = input.max_size {
            filter = filter.and(Predicate::new(move |image: &Image| image.size <= max));
        }

        let query = ListQuery::new().filter(filter).sort(
            SortSpec::by(SortItem::desc("uploaded_at")).then(SortItem::asc("id")),
        );
        self.images.get_paged_list(page_index, page_size, query).await
    }
}
