//! Session and interval timers
//!
//! Both timers are passive counters advanced one logical second per tick by
//! the controller. Neither emits its completion signal more than once per arm.

mod interval;
mod session;

pub use interval::IntervalTimer;
pub use session::SessionTimer;
