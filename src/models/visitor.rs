use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

pub const UNKNOWN: &str = "Unknown";
pub const UNKNOWN_COUNTRY_CODE: &str = "XX";
pub const DEFAULT_DEVICE: &str = "Desktop";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Visitor {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    // Legacy rows predate device fingerprinting and carry neither field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_visitor_id: Option<String>,
    pub ip_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    pub country: String,
    pub city: String,
    pub country_code: String,
    pub device: String,
    pub browser: String,
    pub user_agent: String,
    pub is_new_visitor: bool,
    pub page_views: i64,
    pub created_at: i64,    // epoch millis, first observation
    pub last_activity: i64, // epoch millis, most recent observation
}

/// Descriptive attributes reported by the tracking snippet, already defaulted.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitorProfile {
    pub country: String,
    pub city: String,
    pub country_code: String,
    pub device: String,
    pub browser: String,
    pub user_agent: String,
}

impl Default for VisitorProfile {
    fn default() -> Self {
        Self {
            country: UNKNOWN.to_string(),
            city: UNKNOWN.to_string(),
            country_code: UNKNOWN_COUNTRY_CODE.to_string(),
            device: DEFAULT_DEVICE.to_string(),
            browser: UNKNOWN.to_string(),
            user_agent: UNKNOWN.to_string(),
        }
    }
}

impl Visitor {
    pub fn new(
        ip_address: String,
        device_id: Option<String>,
        profile: VisitorProfile,
        now: i64,
    ) -> Self {
        let unique_visitor_id = fingerprint(&ip_address, device_id.as_deref());

        Self {
            id: None,
            unique_visitor_id: Some(unique_visitor_id),
            ip_address,
            device_id,
            country: profile.country,
            city: profile.city,
            country_code: profile.country_code,
            device: profile.device,
            browser: profile.browser,
            user_agent: profile.user_agent,
            is_new_visitor: true,
            page_views: 1,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn is_legacy(&self) -> bool {
        self.device_id.is_none()
    }
}

/// Composite identity of a visitor across sessions: `ip + "_" + deviceId`.
/// A missing device id contributes an empty suffix.
pub fn fingerprint(ip_address: &str, device_id: Option<&str>) -> String {
    format!("{}_{}", ip_address, device_id.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_joins_ip_and_device() {
        assert_eq!(fingerprint("1.2.3.4", Some("dev1")), "1.2.3.4_dev1");
        assert_eq!(fingerprint("1.2.3.4", None), "1.2.3.4_");
    }

    #[test]
    fn new_visitor_starts_with_one_page_view() {
        let visitor = Visitor::new(
            "10.0.0.1".to_string(),
            Some("abc".to_string()),
            VisitorProfile::default(),
            1_000,
        );

        assert!(visitor.is_new_visitor);
        assert_eq!(visitor.page_views, 1);
        assert_eq!(visitor.created_at, visitor.last_activity);
        assert_eq!(visitor.unique_visitor_id.as_deref(), Some("10.0.0.1_abc"));
        assert_eq!(visitor.country_code, "XX");
        assert_eq!(visitor.device, "Desktop");
        assert!(!visitor.is_legacy());
    }

    #[test]
    fn legacy_document_deserializes_without_device_fields() {
        let doc = mongodb::bson::doc! {
            "ipAddress": "1.2.3.4",
            "country": "Germany",
            "city": "Berlin",
            "countryCode": "DE",
            "device": "Mobile",
            "browser": "Firefox",
            "userAgent": "Mozilla/5.0",
            "isNewVisitor": false,
            "pageViews": 3_i64,
            "createdAt": 10_i64,
            "lastActivity": 20_i64,
        };

        let visitor: Visitor = mongodb::bson::from_document(doc).unwrap();
        assert!(visitor.is_legacy());
        assert!(visitor.unique_visitor_id.is_none());
        assert_eq!(visitor.page_views, 3);
    }
}
