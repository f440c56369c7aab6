use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PATH: &str = "/";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub visitor_id: ObjectId,
    pub unique_visitor_id: String,
    pub path: String,
    #[serde(default)]
    pub referrer: String,
    pub created_at: i64,
    // Seconds; 0 until the exit beacon reports a dwell time
    #[serde(default)]
    pub time_on_page: i64,
}

impl PageView {
    pub fn new(
        visitor_id: ObjectId,
        unique_visitor_id: String,
        path: Option<String>,
        referrer: Option<String>,
        now: i64,
    ) -> Self {
        Self {
            id: None,
            visitor_id,
            unique_visitor_id,
            path: path
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| DEFAULT_PATH.to_string()),
            referrer: referrer.unwrap_or_default(),
            created_at: now,
            time_on_page: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_path_and_referrer() {
        let view = PageView::new(ObjectId::new(), "ip_dev".to_string(), None, None, 5);
        assert_eq!(view.path, "/");
        assert_eq!(view.referrer, "");
        assert_eq!(view.time_on_page, 0);

        let view = PageView::new(ObjectId::new(), "ip_dev".to_string(), Some(String::new()), None, 5);
        assert_eq!(view.path, "/");
    }
}
