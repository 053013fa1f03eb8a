pub mod code;
pub mod mode;
pub mod record;

pub use code::ProductCode;
pub use mode::PriceDisplayMode;
pub use record::{ExtractedRecord, FLAG_ABSENT, FLAG_PRESENT, HEADER, NO_ORDER_ACTIVITY};
