pub mod page_view;
pub mod visitor;
