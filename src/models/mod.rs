//! Client-side models: query state, pages, selections, and dashboards.

pub mod bulk;
pub mod dashboard;
pub mod pagination;
pub mod query;
pub mod selection;
