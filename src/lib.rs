pub mod api;
pub mod config;
pub mod drafts;
pub mod export;
pub mod humanize;
pub mod observability;
pub mod polling;
