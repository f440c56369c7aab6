pub mod error;
pub mod identity_resolver;
pub mod page_view_recorder;
pub mod window_queries;
