//! Dashboard services: fetching, reconciling, and acting on list data.

pub mod bulk;
pub mod client;
pub mod controller;
pub mod debounce;
pub mod export;
pub mod notify;
pub mod pager;
pub mod request;
pub mod session;
pub mod status;

#[cfg(test)]
pub(crate) mod testing;
