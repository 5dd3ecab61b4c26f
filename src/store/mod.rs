// Content-addressable persistence — asset files, durable index, export.

pub mod cache_store;
pub mod export;
pub mod index;
