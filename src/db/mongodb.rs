use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use log::info;
use mongodb::bson::{Document, doc, oid::ObjectId};
use mongodb::options::{ClientOptions, IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};

use crate::config::app_config::AppConfig;
use crate::db::store::{AnalyticsStore, PAGE_VIEWS, VISITORS, VisitorCount};
use crate::models::page_view::PageView;
use crate::models::visitor::Visitor;

/// Connect to MongoDB using the configured URI and timeouts.
pub async fn get_database(config: &AppConfig) -> Result<Database> {
    let mut options = ClientOptions::parse(&config.mongodb_uri)
        .await
        .context("Failed to parse MONGODB_URI")?;
    let timeout = Duration::from_millis(config.store_timeout_ms);
    options.server_selection_timeout = Some(timeout);
    options.connect_timeout = Some(timeout);
    options.app_name = Some("visitor-analytics".to_string());

    let client = Client::with_options(options).context("Failed to build MongoDB client")?;
    let db = client.database(&config.mongodb_database);

    db.run_command(doc! { "ping": 1 })
        .await
        .context("MongoDB did not answer ping")?;
    info!("Connected to MongoDB database {}", config.mongodb_database);

    Ok(db)
}

pub struct MongoStore {
    db: Database,
    visitors: Collection<Visitor>,
    page_views: Collection<PageView>,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self {
            visitors: db.collection::<Visitor>(VISITORS),
            page_views: db.collection::<PageView>(PAGE_VIEWS),
            db,
        }
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        let unique_fingerprint = IndexModel::builder()
            .keys(doc! { "uniqueVisitorId": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .partial_filter_expression(doc! { "uniqueVisitorId": { "$exists": true } })
                    .build(),
            )
            .build();

        let visitor_indexes = vec![
            unique_fingerprint,
            IndexModel::builder().keys(doc! { "ipAddress": 1 }).build(),
            IndexModel::builder().keys(doc! { "createdAt": -1 }).build(),
            IndexModel::builder().keys(doc! { "lastActivity": -1 }).build(),
        ];
        self.visitors
            .create_indexes(visitor_indexes)
            .await
            .context("Failed to create visitor indexes")?;

        let page_view_indexes = vec![
            IndexModel::builder()
                .keys(doc! { "visitorId": 1, "path": 1, "createdAt": -1 })
                .build(),
            IndexModel::builder().keys(doc! { "createdAt": -1 }).build(),
        ];
        self.page_views
            .create_indexes(page_view_indexes)
            .await
            .context("Failed to create page view indexes")?;

        Ok(())
    }
}

/// Translate a visitor count condition into a MongoDB filter.
pub fn visitor_count_filter(filter: &VisitorCount) -> Document {
    let mut query = doc! {};
    if let Some(since) = filter.created_since {
        query.insert("createdAt", doc! { "$gte": since });
    }
    if let Some(since) = filter.active_since {
        query.insert("lastActivity", doc! { "$gte": since });
    }
    if filter.new_only {
        query.insert("isNewVisitor", true);
    }
    if let Some(max) = filter.max_page_views {
        query.insert("pageViews", doc! { "$lte": max });
    }
    query
}

#[async_trait]
impl AnalyticsStore for MongoStore {
    async fn find_by_fingerprint(&self, unique_visitor_id: &str) -> Result<Option<Visitor>> {
        self.visitors
            .find_one(doc! { "uniqueVisitorId": unique_visitor_id })
            .await
            .context("visitors.find_one by uniqueVisitorId")
    }

    async fn find_legacy_by_ip(&self, ip_address: &str) -> Result<Option<Visitor>> {
        self.visitors
            .find_one(doc! {
                "ipAddress": ip_address,
                "deviceId": { "$exists": false },
            })
            .await
            .context("visitors.find_one legacy by ipAddress")
    }

    async fn insert_visitor(&self, visitor: &Visitor) -> Result<ObjectId> {
        let result = self
            .visitors
            .insert_one(visitor)
            .await
            .context("visitors.insert_one")?;
        result
            .inserted_id
            .as_object_id()
            .context("visitors.insert_one returned a non-ObjectId id")
    }

    async fn record_return_visit(&self, id: ObjectId, now: i64) -> Result<Option<Visitor>> {
        self.visitors
            .find_one_and_update(
                doc! { "_id": id },
                doc! {
                    "$set": { "lastActivity": now, "isNewVisitor": false },
                    "$inc": { "pageViews": 1_i64 },
                },
            )
            .return_document(ReturnDocument::After)
            .await
            .context("visitors.find_one_and_update return visit")
    }

    async fn migrate_legacy(
        &self,
        id: ObjectId,
        device_id: &str,
        unique_visitor_id: &str,
    ) -> Result<bool> {
        let result = self
            .visitors
            .update_one(
                doc! { "_id": id, "deviceId": { "$exists": false } },
                doc! {
                    "$set": {
                        "deviceId": device_id,
                        "uniqueVisitorId": unique_visitor_id,
                    }
                },
            )
            .await
            .context("visitors.update_one legacy migration")?;
        Ok(result.modified_count > 0)
    }

    async fn insert_page_view(&self, page_view: &PageView) -> Result<ObjectId> {
        let result = self
            .page_views
            .insert_one(page_view)
            .await
            .context("pageviews.insert_one")?;
        result
            .inserted_id
            .as_object_id()
            .context("pageviews.insert_one returned a non-ObjectId id")
    }

    async fn patch_time_on_page(
        &self,
        visitor_id: ObjectId,
        path: &str,
        time_on_page: i64,
    ) -> Result<bool> {
        let patched = self
            .page_views
            .find_one_and_update(
                doc! { "visitorId": visitor_id, "path": path, "timeOnPage": 0_i64 },
                doc! { "$set": { "timeOnPage": time_on_page } },
            )
            .sort(doc! { "createdAt": -1, "_id": -1 })
            .await
            .context("pageviews.find_one_and_update timeOnPage")?;
        Ok(patched.is_some())
    }

    async fn count_visitors(&self, filter: VisitorCount) -> Result<u64> {
        self.visitors
            .count_documents(visitor_count_filter(&filter))
            .await
            .context("visitors.count_documents")
    }

    async fn visitors_created_since(&self, since: i64) -> Result<Vec<Visitor>> {
        self.visitors
            .find(doc! { "createdAt": { "$gte": since } })
            .sort(doc! { "createdAt": 1 })
            .await
            .context("visitors.find by createdAt")?
            .try_collect::<Vec<Visitor>>()
            .await
            .context("visitors cursor")
    }

    async fn recent_visitors(&self, limit: i64) -> Result<Vec<Visitor>> {
        self.visitors
            .find(doc! {})
            .sort(doc! { "lastActivity": -1 })
            .limit(limit)
            .await
            .context("visitors.find recent")?
            .try_collect::<Vec<Visitor>>()
            .await
            .context("visitors cursor")
    }

    async fn page_views_since(&self, since: i64) -> Result<Vec<PageView>> {
        self.page_views
            .find(doc! { "createdAt": { "$gte": since } })
            .sort(doc! { "createdAt": 1 })
            .await
            .context("pageviews.find by createdAt")?
            .try_collect::<Vec<PageView>>()
            .await
            .context("pageviews cursor")
    }

    async fn ping(&self) -> Result<()> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .context("ping")?;
        Ok(())
    }
}
