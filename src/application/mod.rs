//! Application services layer.

pub mod entries;
pub mod error;
pub mod notify;
pub mod pagination;
pub mod render;
pub mod reply;
pub mod repos;
pub mod syndication;
