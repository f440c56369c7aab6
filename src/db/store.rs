use anyhow::Result;
use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use crate::models::page_view::PageView;
use crate::models::visitor::Visitor;

pub const VISITORS: &str = "visitors";
pub const PAGE_VIEWS: &str = "pageviews";

/// Conditions for counting visitors. Unset fields do not constrain.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct VisitorCount {
    pub created_since: Option<i64>,
    pub active_since: Option<i64>,
    pub new_only: bool,
    pub max_page_views: Option<i64>,
}

impl VisitorCount {
    pub fn matches(&self, visitor: &Visitor) -> bool {
        self.created_since.is_none_or(|since| visitor.created_at >= since)
            && self.active_since.is_none_or(|since| visitor.last_activity >= since)
            && (!self.new_only || visitor.is_new_visitor)
            && self.max_page_views.is_none_or(|max| visitor.page_views <= max)
    }
}

/// Document store holding the `visitors` and `pageviews` collections.
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    async fn find_by_fingerprint(&self, unique_visitor_id: &str) -> Result<Option<Visitor>>;

    /// A pre-fingerprint visitor row (no `deviceId`) for this IP, if any.
    async fn find_legacy_by_ip(&self, ip_address: &str) -> Result<Option<Visitor>>;

    async fn insert_visitor(&self, visitor: &Visitor) -> Result<ObjectId>;

    /// Marks a returning observation: bumps `pageViews`, refreshes
    /// `lastActivity` and clears `isNewVisitor`. Returns the updated row.
    async fn record_return_visit(&self, id: ObjectId, now: i64) -> Result<Option<Visitor>>;

    /// Backfills `deviceId`/`uniqueVisitorId` on a legacy row. Only applies
    /// while the row still lacks a `deviceId`; returns whether it did.
    async fn migrate_legacy(
        &self,
        id: ObjectId,
        device_id: &str,
        unique_visitor_id: &str,
    ) -> Result<bool>;

    async fn insert_page_view(&self, page_view: &PageView) -> Result<ObjectId>;

    /// Sets `timeOnPage` on the most recent still-zero page view for
    /// `(visitor_id, path)`. Returns whether a row was patched.
    async fn patch_time_on_page(
        &self,
        visitor_id: ObjectId,
        path: &str,
        time_on_page: i64,
    ) -> Result<bool>;

    async fn count_visitors(&self, filter: VisitorCount) -> Result<u64>;

    async fn visitors_created_since(&self, since: i64) -> Result<Vec<Visitor>>;

    /// Most recently active visitors first.
    async fn recent_visitors(&self, limit: i64) -> Result<Vec<Visitor>>;

    async fn page_views_since(&self, since: i64) -> Result<Vec<PageView>>;

    async fn ping(&self) -> Result<()>;
}
