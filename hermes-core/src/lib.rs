pub mod clock;
pub mod error;
pub mod output_macros;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{HermesError, Result};
