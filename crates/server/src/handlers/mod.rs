mod health;
mod metrics;
mod scrape;

pub use health::health;
pub use metrics::metrics;
pub use scrape::{status, submit};
