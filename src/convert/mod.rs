// Background format conversion — worker pool, delivery-API fetcher.

pub mod dispatcher;
pub mod fetcher;
