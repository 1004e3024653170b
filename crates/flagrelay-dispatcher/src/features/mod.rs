pub mod addon_management;
pub mod dispatch;
pub mod event_feed;
pub mod observability;
pub mod tag_types;
