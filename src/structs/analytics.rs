use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::visitor::Visitor;
use crate::utils::time_range::TimeRange;

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TimeRangeParams {
    #[serde(default)]
    pub time_range: TimeRange,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TopPagesParams {
    #[serde(default)]
    pub time_range: TimeRange,
    pub limit: Option<i64>,
}

#[derive(Deserialize, Default)]
pub struct LimitParams {
    pub limit: Option<i64>,
}

pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

#[derive(Deserialize, Validate, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct TrackVisitorRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "ipAddress is required"))]
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub country_code: Option<String>,
    pub device: Option<String>,
    pub browser: Option<String>,
    pub device_id: Option<String>,
    pub path: Option<String>,
    pub referrer: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TrackVisitorResponse {
    pub success: bool,
    pub visitor_id: String,
    pub unique_visitor_id: String,
    pub is_new_device: bool,
    pub page_view_id: String,
}

#[derive(Deserialize, Validate, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePageTimeRequest {
    #[validate(length(min = 1, message = "visitorId is required"))]
    pub visitor_id: String,
    #[validate(length(min = 1, message = "path is required"))]
    pub path: String,
    #[validate(range(min = 0, message = "timeOnPage must not be negative"))]
    pub time_on_page: i64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OverviewResponse {
    pub total_visitors: u64,
    pub new_visitors: u64,
    pub active_now: u64,
    pub bounce_rate: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CountryShare {
    pub name: String,
    pub value: u64,
    pub color: String,
    pub flag: String,
    pub percentage: u32,
    #[serde(rename = "countryCode")]
    pub country_code: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopPage {
    pub id: usize,
    pub url: String,
    pub path: String,
    pub views: u64,
    pub visitors: u64,
    pub avg_time: String,
    pub bounce_rate: u32,
    pub color: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecentVisitor {
    pub id: String,
    pub ip: String,
    pub country: String,
    pub city: String,
    pub device: String,
    pub browser: String,
    pub pages: i64,
    pub last_activity: i64,
    pub unique_visitor_id: Option<String>,
    pub device_id: Option<String>,
}

impl From<Visitor> for RecentVisitor {
    fn from(visitor: Visitor) -> Self {
        Self {
            id: visitor.id.map(|id| id.to_hex()).unwrap_or_default(),
            ip: visitor.ip_address,
            country: visitor.country,
            city: visitor.city,
            device: visitor.device,
            browser: visitor.browser,
            pages: visitor.page_views,
            last_activity: visitor.last_activity,
            unique_visitor_id: visitor.unique_visitor_id,
            device_id: visitor.device_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_clamped() {
        assert_eq!(clamp_limit(None), 10);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(-4)), 1);
        assert_eq!(clamp_limit(Some(25)), 25);
        assert_eq!(clamp_limit(Some(10_000)), 100);
    }

    #[test]
    fn track_request_requires_ip() {
        let req: TrackVisitorRequest = serde_json::from_str(r#"{"deviceId":"d"}"#).unwrap();
        assert!(req.validate().is_err());

        let req: TrackVisitorRequest =
            serde_json::from_str(r#"{"ipAddress":"1.2.3.4","path":"/blog"}"#).unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.path.as_deref(), Some("/blog"));
    }

    #[test]
    fn update_request_rejects_negative_time() {
        let req = UpdatePageTimeRequest {
            visitor_id: "abc".into(),
            path: "/".into(),
            time_on_page: -1,
        };
        assert!(req.validate().is_err());
    }
}
