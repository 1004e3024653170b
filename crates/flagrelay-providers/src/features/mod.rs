pub mod http_delivery;
pub mod jira;
pub mod slack;
pub mod webhook;
