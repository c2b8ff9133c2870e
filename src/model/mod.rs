pub mod common;
pub mod locator;
pub mod output;
