//! Domain types for ArbLab

pub mod ids;
pub mod key;
pub mod order;
pub mod price;

pub use ids::{DatasetHash, RunId};
pub use key::{InstrumentKey, KeyShape, Leg, ParseLegError};
pub use order::{Fill, Order};
pub use price::PriceRecord;
