mod clock;
mod engine;
mod source;

pub use clock::{Clock, SystemClock};
pub use engine::{Cycle, Monitor, MonitorSettings};
pub use source::{HttpPageSource, PageSource};
