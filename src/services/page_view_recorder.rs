use log::debug;
use mongodb::bson::oid::ObjectId;

use crate::models::page_view::PageView;
use crate::services::error::AnalyticsError;
use crate::services::identity_resolver::ResolvedVisitor;
use crate::state::app_state::AppState;

/// Append a page view for a freshly resolved visitor.
pub async fn record_page_view(
    state: &AppState,
    visitor: &ResolvedVisitor,
    path: Option<String>,
    referrer: Option<String>,
) -> Result<ObjectId, AnalyticsError> {
    let page_view = PageView::new(
        visitor.id,
        visitor.unique_visitor_id.clone(),
        path,
        referrer,
        state.clock.now_millis(),
    );
    Ok(state.store.insert_page_view(&page_view).await?)
}

/// Apply an exit beacon's dwell time to the newest unpatched view of `path`.
///
/// Rows that already carry a non-zero time are never overwritten. A beacon
/// with nothing to patch is not an error; the return value says whether a
/// row changed.
pub async fn patch_time_on_page(
    state: &AppState,
    visitor_id: ObjectId,
    path: &str,
    time_on_page: i64,
) -> Result<bool, AnalyticsError> {
    if time_on_page < 0 {
        return Err(AnalyticsError::InvalidInput(
            "timeOnPage must not be negative".to_string(),
        ));
    }
    if time_on_page == 0 {
        return Ok(false);
    }

    let patched = state
        .store
        .patch_time_on_page(visitor_id, path, time_on_page)
        .await?;
    if !patched {
        debug!("No open page view for {visitor_id} on {path}");
    }
    Ok(patched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};

    use crate::db::memory::MemoryStore;
    use crate::utils::clock::{Clock, ManualClock};

    fn setup() -> (Arc<MemoryStore>, Arc<ManualClock>, AppState) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
        ));
        let state = AppState::new(store.clone(), clock.clone());
        (store, clock, state)
    }

    fn resolved() -> ResolvedVisitor {
        ResolvedVisitor {
            id: ObjectId::new(),
            unique_visitor_id: "1.2.3.4_dev1".to_string(),
            is_new: true,
            migrated: false,
        }
    }

    #[actix_web::test]
    async fn exit_beacon_never_overwrites_recorded_time() {
        let (store, clock, state) = setup();
        let visitor = resolved();

        record_page_view(&state, &visitor, Some("/pricing".into()), None)
            .await
            .unwrap();
        clock.advance(Duration::minutes(1));
        record_page_view(&state, &visitor, Some("/pricing".into()), None)
            .await
            .unwrap();

        assert!(patch_time_on_page(&state, visitor.id, "/pricing", 40).await.unwrap());
        assert!(patch_time_on_page(&state, visitor.id, "/pricing", 15).await.unwrap());
        // Both navigations now carry a time; a third beacon has nothing left
        assert!(!patch_time_on_page(&state, visitor.id, "/pricing", 99).await.unwrap());

        let mut times: Vec<_> = store
            .all_page_views()
            .await
            .into_iter()
            .map(|pv| (pv.created_at, pv.time_on_page))
            .collect();
        times.sort();
        assert_eq!(times[0].1, 15);
        assert_eq!(times[1].1, 40);
    }

    #[actix_web::test]
    async fn unmatched_beacon_is_a_quiet_no_op() {
        let (_store, _clock, state) = setup();
        let patched = patch_time_on_page(&state, ObjectId::new(), "/nowhere", 12)
            .await
            .unwrap();
        assert!(!patched);
    }

    #[actix_web::test]
    async fn negative_time_is_rejected() {
        let (_store, _clock, state) = setup();
        let result = patch_time_on_page(&state, ObjectId::new(), "/", -3).await;
        assert!(matches!(result, Err(AnalyticsError::InvalidInput(_))));
    }

    #[actix_web::test]
    async fn records_defaults() {
        let (store, clock, state) = setup();
        record_page_view(&state, &resolved(), None, None).await.unwrap();

        let views = store.all_page_views().await;
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].path, "/");
        assert_eq!(views[0].referrer, "");
        assert_eq!(views[0].created_at, clock.now_millis());
        assert_eq!(views[0].unique_visitor_id, "1.2.3.4_dev1");
    }
}
