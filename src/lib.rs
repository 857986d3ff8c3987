//! Portfolio tracking with benchmark comparison.
//!
//! Positions are kept in a local [`store::PositionStore`]. The
//! [`performance::PerformanceEngine`] fetches daily closes from a
//! [`source::PriceSeriesSource`] and turns them into portfolio and benchmark
//! percent-return series for a chosen [`period::TimePeriod`].

pub mod config;
pub mod error;
pub mod performance;
pub mod period;
pub mod position;
pub mod refresh;
pub mod sample;
pub mod series;
pub mod source;
pub mod store;
pub mod throttle;
pub mod weights;

pub use error::{PerformanceError, SourceError, StoreError, ValidationError};
pub use performance::{PerformanceEngine, PerformanceResult, ReturnPoint, Warning};
pub use period::TimePeriod;
pub use position::{NewPosition, Position};
pub use series::DailySeries;
pub use source::PriceSeriesSource;
pub use store::PositionStore;
