use log::{debug, warn};
use mongodb::bson::oid::ObjectId;

use crate::models::visitor::{Visitor, VisitorProfile, fingerprint};
use crate::services::error::AnalyticsError;
use crate::state::app_state::AppState;

/// One tracked observation of a visitor, after defaults are applied.
#[derive(Debug, Clone)]
pub struct Observation {
    pub ip_address: String,
    pub device_id: Option<String>,
    pub profile: VisitorProfile,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVisitor {
    pub id: ObjectId,
    pub unique_visitor_id: String,
    pub is_new: bool,
    pub migrated: bool,
}

/// Find or create the visitor behind an observation and count the visit.
///
/// The fingerprint lock is held across lookup and write, so concurrent
/// observations of the same (ip, device) pair cannot create two rows or lose
/// a `pageViews` increment. The legacy IP-only path is best effort: two
/// different devices behind one IP may race to claim the same legacy row, and
/// the loser falls through to a fresh insert. A matched row that vanishes
/// before its visit is counted is replaced by a fresh insert as well.
pub async fn resolve_visitor(
    state: &AppState,
    observation: Observation,
) -> Result<ResolvedVisitor, AnalyticsError> {
    let unique_visitor_id = fingerprint(
        &observation.ip_address,
        observation.device_id.as_deref(),
    );
    let _guard = state.fingerprint_locks.acquire(&unique_visitor_id).await;
    let now = state.clock.now_millis();

    if let Some(existing) = state.store.find_by_fingerprint(&unique_visitor_id).await? {
        if let Some(resolved) = record_return(state, existing, &unique_visitor_id, now).await? {
            return Ok(resolved);
        }
    } else if let Some(legacy) = state.store.find_legacy_by_ip(&observation.ip_address).await? {
        if let Some(resolved) =
            migrate_and_record(state, legacy, &observation, &unique_visitor_id, now).await?
        {
            return Ok(resolved);
        }
    }

    let visitor = Visitor::new(
        observation.ip_address,
        observation.device_id,
        observation.profile,
        now,
    );
    let id = state.store.insert_visitor(&visitor).await?;
    debug!("New visitor {unique_visitor_id}");

    Ok(ResolvedVisitor {
        id,
        unique_visitor_id,
        is_new: true,
        migrated: false,
    })
}

async fn record_return(
    state: &AppState,
    existing: Visitor,
    unique_visitor_id: &str,
    now: i64,
) -> Result<Option<ResolvedVisitor>, AnalyticsError> {
    let id = existing
        .id
        .ok_or_else(|| anyhow::anyhow!("visitor {unique_visitor_id} has no _id"))?;
    if state.store.record_return_visit(id, now).await?.is_none() {
        warn!("Visitor {unique_visitor_id} disappeared before its visit was recorded");
        return Ok(None);
    }
    debug!("Returning visitor {unique_visitor_id}");

    Ok(Some(ResolvedVisitor {
        id,
        unique_visitor_id: unique_visitor_id.to_string(),
        is_new: false,
        migrated: false,
    }))
}

async fn migrate_and_record(
    state: &AppState,
    legacy: Visitor,
    observation: &Observation,
    unique_visitor_id: &str,
    now: i64,
) -> Result<Option<ResolvedVisitor>, AnalyticsError> {
    let id = legacy
        .id
        .ok_or_else(|| anyhow::anyhow!("legacy visitor {} has no _id", legacy.ip_address))?;

    let mut migrated = false;
    let mut resolved_key = legacy
        .unique_visitor_id
        .clone()
        .unwrap_or_else(|| fingerprint(&legacy.ip_address, None));

    if let Some(device_id) = observation.device_id.as_deref() {
        migrated = state
            .store
            .migrate_legacy(id, device_id, unique_visitor_id)
            .await?;
        if migrated {
            debug!("Migrated legacy visitor {} to {unique_visitor_id}", legacy.ip_address);
            resolved_key = unique_visitor_id.to_string();
        }
    }

    if state.store.record_return_visit(id, now).await?.is_none() {
        warn!("Legacy visitor {} disappeared before its visit was recorded", legacy.ip_address);
        return Ok(None);
    }

    Ok(Some(ResolvedVisitor {
        id,
        unique_visitor_id: resolved_key,
        is_new: false,
        migrated,
    }))
}
