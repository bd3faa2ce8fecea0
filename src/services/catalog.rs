use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    entities::{product, Product as ProductEntity, ProductModel},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Product record as served by the upstream catalog API.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteProduct {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
}

/// Outcome of a catalog mirror run.
///
/// A failed batch lands in `batch_errors` and the sync keeps going; partial
/// progress stands rather than aborting the whole operation.
#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    pub pages: u64,
    pub fetched: u64,
    pub written: u64,
    pub batch_errors: Vec<String>,
    pub cancelled: bool,
}

/// Mirrors the upstream domain catalog into the local `products` table.
///
/// The mirror exists so carts can snapshot price/name/image without a
/// round-trip to the upstream API on every add. Writes happen in bounded
/// batches executed sequentially; cancellation is cooperative, checked
/// between pages and batches so a superseded sync never commits a stale
/// tail.
#[derive(Clone)]
pub struct CatalogSyncService {
    db: Arc<DatabaseConnection>,
    http: reqwest::Client,
    base_url: String,
    page_size: u64,
    batch_size: usize,
    cancel: Arc<AtomicBool>,
    event_sender: EventSender,
}

impl CatalogSyncService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        base_url: String,
        page_size: u64,
        batch_size: usize,
        event_sender: EventSender,
    ) -> Self {
        Self {
            db,
            http: reqwest::Client::new(),
            base_url,
            page_size,
            batch_size: batch_size.max(1),
            cancel: Arc::new(AtomicBool::new(false)),
            event_sender,
        }
    }

    /// Ask an in-flight sync to stop at the next checkpoint.
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Walk the upstream catalog and refresh the local mirror.
    #[instrument(skip(self))]
    pub async fn sync_catalog(&self) -> Result<SyncReport, ServiceError> {
        self.cancel.store(false, Ordering::Relaxed);
        let mut report = SyncReport::default();
        let mut page = 1u64;

        loop {
            if self.cancel.load(Ordering::Relaxed) {
                report.cancelled = true;
                break;
            }

            let records = self.fetch_page(page).await?;
            if records.is_empty() {
                break;
            }
            report.pages += 1;
            report.fetched += records.len() as u64;
            let last_page = (records.len() as u64) < self.page_size;

            for batch in records.chunks(self.batch_size) {
                if self.cancel.load(Ordering::Relaxed) {
                    report.cancelled = true;
                    break;
                }
                match self.write_batch(batch).await {
                    Ok(written) => report.written += written,
                    Err(e) => {
                        // Record and carry on; the remaining batches still land.
                        error!(page, error = %e, "catalog batch write failed");
                        report
                            .batch_errors
                            .push(format!("page {}: {}", page, e));
                    }
                }
            }

            if report.cancelled || last_page {
                break;
            }
            page += 1;
        }

        if report.cancelled {
            warn!(
                fetched = report.fetched,
                written = report.written,
                "catalog sync cancelled"
            );
            self.event_sender.send_or_log(Event::CatalogSyncCancelled {
                fetched: report.fetched,
                written: report.written,
            });
        } else {
            info!(
                pages = report.pages,
                fetched = report.fetched,
                written = report.written,
                failed_batches = report.batch_errors.len(),
                "catalog sync completed"
            );
            self.event_sender.send_or_log(Event::CatalogSyncCompleted {
                fetched: report.fetched,
                written: report.written,
                failed_batches: report.batch_errors.len() as u64,
            });
        }

        Ok(report)
    }

    /// Local mirror listing for the storefront.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<ProductModel>, ServiceError> {
        Ok(ProductEntity::find()
            .order_by_asc(product::Column::DomainName)
            .all(&*self.db)
            .await?)
    }

    async fn fetch_page(&self, page: u64) -> Result<Vec<RemoteProduct>, ServiceError> {
        let url = format!(
            "{}/products?page={}&per_page={}",
            self.base_url, page, self.page_size
        );
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalApiError(format!("GET {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(ServiceError::ExternalApiError(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }

        response
            .json::<Vec<RemoteProduct>>()
            .await
            .map_err(|e| ServiceError::ExternalApiError(format!("Malformed catalog page: {}", e)))
    }

    /// Upsert one bounded batch inside a single transaction.
    async fn write_batch(&self, batch: &[RemoteProduct]) -> Result<u64, ServiceError> {
        let txn = self.db.begin().await?;
        let mut written = 0u64;

        for remote in batch {
            let existing = ProductEntity::find()
                .filter(product::Column::ExternalId.eq(remote.id))
                .one(&txn)
                .await?;

            match existing {
                Some(row) => {
                    let mut row: product::ActiveModel = row.into();
                    row.domain_name = Set(remote.name.clone());
                    row.price = Set(remote.price);
                    row.image_url = Set(remote.image.clone());
                    row.updated_at = Set(Utc::now());
                    row.update(&txn).await?;
                }
                None => {
                    let row = product::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        external_id: Set(remote.id),
                        domain_name: Set(remote.name.clone()),
                        price: Set(remote.price),
                        image_url: Set(remote.image.clone()),
                        created_at: Set(Utc::now()),
                        updated_at: Set(Utc::now()),
                    };
                    row.insert(&txn).await?;
                }
            }
            written += 1;
        }

        txn.commit().await?;
        Ok(written)
    }
}
