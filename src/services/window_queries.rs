use std::collections::{HashMap, HashSet};

use mongodb::bson::oid::ObjectId;

use crate::db::store::VisitorCount;
use crate::models::page_view::PageView;
use crate::models::visitor::Visitor;
use crate::services::error::AnalyticsError;
use crate::state::app_state::AppState;
use crate::structs::analytics::{CountryShare, OverviewResponse, RecentVisitor, TopPage};
use crate::utils::format::{
    country_flag, format_duration, format_rate, palette_color, rounded_percentage,
};
use crate::utils::time_range::{TimeRange, active_since_millis};

const MAX_COUNTRIES: usize = 10;

pub async fn overview(
    state: &AppState,
    range: TimeRange,
) -> Result<OverviewResponse, AnalyticsError> {
    let now = state.clock.now();
    let start = range.start_millis(now);
    let in_window = VisitorCount {
        created_since: Some(start),
        ..Default::default()
    };

    let total_visitors = state.store.count_visitors(in_window).await?;
    let new_visitors = state
        .store
        .count_visitors(VisitorCount {
            new_only: true,
            ..in_window
        })
        .await?;
    let active_now = state
        .store
        .count_visitors(VisitorCount {
            active_since: Some(active_since_millis(now)),
            ..Default::default()
        })
        .await?;
    // Visitor-level bounce: lifetime counter, not reconstructed sessions
    let bounced = state
        .store
        .count_visitors(VisitorCount {
            max_page_views: Some(1),
            ..in_window
        })
        .await?;

    Ok(OverviewResponse {
        total_visitors,
        new_visitors,
        active_now,
        bounce_rate: format_rate(bounced, total_visitors),
    })
}

pub async fn visitor_distribution(
    state: &AppState,
    range: TimeRange,
) -> Result<Vec<CountryShare>, AnalyticsError> {
    let start = range.start_millis(state.clock.now());
    let visitors = state.store.visitors_created_since(start).await?;
    Ok(country_distribution(&visitors))
}

/// Top countries by visitor count; percentages are relative to the returned
/// groups only.
pub fn country_distribution(visitors: &[Visitor]) -> Vec<CountryShare> {
    // (first seen order, first seen country code, count)
    let mut groups: HashMap<&str, (usize, &str, u64)> = HashMap::new();
    for visitor in visitors {
        let next = groups.len();
        groups
            .entry(visitor.country.as_str())
            .or_insert((next, visitor.country_code.as_str(), 0))
            .2 += 1;
    }

    let mut ranked: Vec<_> = groups.into_iter().collect();
    ranked.sort_by(|(_, (a_seen, _, a)), (_, (b_seen, _, b))| {
        b.cmp(a).then(a_seen.cmp(b_seen))
    });
    ranked.truncate(MAX_COUNTRIES);

    let total: u64 = ranked.iter().map(|(_, (_, _, count))| count).sum();
    ranked
        .into_iter()
        .enumerate()
        .map(|(index, (name, (_, code, count)))| CountryShare {
            name: name.to_string(),
            value: count,
            color: palette_color(index).to_string(),
            flag: country_flag(name).to_string(),
            percentage: rounded_percentage(count, total),
            country_code: code.to_string(),
        })
        .collect()
}

pub async fn top_pages(
    state: &AppState,
    range: TimeRange,
    limit: i64,
) -> Result<Vec<TopPage>, AnalyticsError> {
    let start = range.start_millis(state.clock.now());
    let page_views = state.store.page_views_since(start).await?;
    Ok(rank_pages(&page_views, limit.max(0) as usize))
}

#[derive(Default)]
struct PageStats<'a> {
    views: u64,
    total_time: i64,
    visitors: HashSet<&'a ObjectId>,
    first_seen: usize,
}

/// Rank paths by views over a window's page views and attach the per-page
/// bounce rate.
///
/// A visitor bounces on a page when that page view is their only one in the
/// window. Session shapes are built once per visitor and then folded over
/// each page's visitor set, so the cost stays linear in page views. Callers
/// must pass only in-window rows.
pub fn rank_pages(page_views: &[PageView], limit: usize) -> Vec<TopPage> {
    let mut views_per_visitor: HashMap<&ObjectId, u64> = HashMap::new();
    let mut pages: HashMap<&str, PageStats> = HashMap::new();

    for page_view in page_views {
        *views_per_visitor.entry(&page_view.visitor_id).or_insert(0) += 1;

        let next = pages.len();
        let stats = pages
            .entry(page_view.path.as_str())
            .or_insert_with(|| PageStats {
                first_seen: next,
                ..Default::default()
            });
        stats.views += 1;
        stats.total_time += page_view.time_on_page;
        stats.visitors.insert(&page_view.visitor_id);
    }

    let mut ranked: Vec<_> = pages.into_iter().collect();
    ranked.sort_by(|(_, a), (_, b)| b.views.cmp(&a.views).then(a.first_seen.cmp(&b.first_seen)));
    ranked.truncate(limit);

    ranked
        .into_iter()
        .enumerate()
        .map(|(index, (path, stats))| {
            let single_page = stats
                .visitors
                .iter()
                .filter(|visitor| views_per_visitor.get(*visitor) == Some(&1))
                .count() as u64;
            let visitors = stats.visitors.len() as u64;
            let avg_time = if stats.views == 0 {
                0.0
            } else {
                stats.total_time as f64 / stats.views as f64
            };

            TopPage {
                id: index + 1,
                url: path.to_string(),
                path: path.to_string(),
                views: stats.views,
                visitors,
                avg_time: format_duration(avg_time),
                bounce_rate: rounded_percentage(single_page, visitors),
                color: palette_color(index).to_string(),
            }
        })
        .collect()
}

pub async fn recent_visitors(
    state: &AppState,
    limit: i64,
) -> Result<Vec<RecentVisitor>, AnalyticsError> {
    let visitors = state.store.recent_visitors(limit).await?;
    Ok(visitors.into_iter().map(RecentVisitor::from).collect())
}
