use anyhow::{Result, bail};
use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;

use crate::db::store::{AnalyticsStore, VisitorCount};
use crate::models::page_view::PageView;
use crate::models::visitor::Visitor;

/// In-process document store with the same semantics as the MongoDB one.
#[derive(Default)]
pub struct MemoryStore {
    visitors: RwLock<Vec<Visitor>>,
    page_views: RwLock<Vec<PageView>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn all_visitors(&self) -> Vec<Visitor> {
        self.visitors.read().await.clone()
    }

    #[cfg(test)]
    pub async fn all_page_views(&self) -> Vec<PageView> {
        self.page_views.read().await.clone()
    }
}

#[async_trait]
impl AnalyticsStore for MemoryStore {
    async fn find_by_fingerprint(&self, unique_visitor_id: &str) -> Result<Option<Visitor>> {
        let visitors = self.visitors.read().await;
        Ok(visitors
            .iter()
            .find(|v| v.unique_visitor_id.as_deref() == Some(unique_visitor_id))
            .cloned())
    }

    async fn find_legacy_by_ip(&self, ip_address: &str) -> Result<Option<Visitor>> {
        let visitors = self.visitors.read().await;
        Ok(visitors
            .iter()
            .find(|v| v.ip_address == ip_address && v.is_legacy())
            .cloned())
    }

    async fn insert_visitor(&self, visitor: &Visitor) -> Result<ObjectId> {
        let mut visitors = self.visitors.write().await;
        // Mirrors the unique index on uniqueVisitorId
        if let Some(key) = &visitor.unique_visitor_id {
            if visitors
                .iter()
                .any(|v| v.unique_visitor_id.as_ref() == Some(key))
            {
                bail!("duplicate key: uniqueVisitorId {key}");
            }
        }

        let id = ObjectId::new();
        let mut row = visitor.clone();
        row.id = Some(id);
        visitors.push(row);
        Ok(id)
    }

    async fn record_return_visit(&self, id: ObjectId, now: i64) -> Result<Option<Visitor>> {
        let mut visitors = self.visitors.write().await;
        Ok(visitors.iter_mut().find(|v| v.id == Some(id)).map(|v| {
            v.page_views += 1;
            v.last_activity = now;
            v.is_new_visitor = false;
            v.clone()
        }))
    }

    async fn migrate_legacy(
        &self,
        id: ObjectId,
        device_id: &str,
        unique_visitor_id: &str,
    ) -> Result<bool> {
        let mut visitors = self.visitors.write().await;
        if visitors
            .iter()
            .any(|v| v.id != Some(id) && v.unique_visitor_id.as_deref() == Some(unique_visitor_id))
        {
            bail!("duplicate key: uniqueVisitorId {unique_visitor_id}");
        }

        match visitors.iter_mut().find(|v| v.id == Some(id) && v.is_legacy()) {
            Some(visitor) => {
                visitor.device_id = Some(device_id.to_string());
                visitor.unique_visitor_id = Some(unique_visitor_id.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_page_view(&self, page_view: &PageView) -> Result<ObjectId> {
        let id = ObjectId::new();
        let mut row = page_view.clone();
        row.id = Some(id);
        self.page_views.write().await.push(row);
        Ok(id)
    }

    async fn patch_time_on_page(
        &self,
        visitor_id: ObjectId,
        path: &str,
        time_on_page: i64,
    ) -> Result<bool> {
        let mut page_views = self.page_views.write().await;
        // max_by_key keeps the last maximum, so ties go to the latest insert
        let target = page_views
            .iter_mut()
            .filter(|pv| pv.visitor_id == visitor_id && pv.path == path && pv.time_on_page == 0)
            .max_by_key(|pv| pv.created_at);

        match target {
            Some(page_view) => {
                page_view.time_on_page = time_on_page;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_visitors(&self, filter: VisitorCount) -> Result<u64> {
        let visitors = self.visitors.read().await;
        Ok(visitors.iter().filter(|v| filter.matches(v)).count() as u64)
    }

    async fn visitors_created_since(&self, since: i64) -> Result<Vec<Visitor>> {
        let visitors = self.visitors.read().await;
        Ok(visitors
            .iter()
            .filter(|v| v.created_at >= since)
            .cloned()
            .collect())
    }

    async fn recent_visitors(&self, limit: i64) -> Result<Vec<Visitor>> {
        let mut visitors = self.visitors.read().await.clone();
        visitors.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        visitors.truncate(limit.max(0) as usize);
        Ok(visitors)
    }

    async fn page_views_since(&self, since: i64) -> Result<Vec<PageView>> {
        let page_views = self.page_views.read().await;
        Ok(page_views
            .iter()
            .filter(|pv| pv.created_at >= since)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
