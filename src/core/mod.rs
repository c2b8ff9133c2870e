pub mod catalog;
pub mod classify;
pub mod dedup;
pub mod jobs;
pub mod paginate;
pub mod processor;
pub mod stats;
pub mod writer;
