//! Presentation scheduling rules: interval conflicts within a group and the
//! time-driven presentation lifecycle.

pub mod clock;
pub mod conflict;
pub mod error;
pub mod interval;
pub mod lock;
pub mod status;

pub use clock::{Clock, FixedClock, SystemClock};
pub use conflict::{ConflictChecker, ConflictDetail, ConflictQuery, ConflictReport, ScheduledSlot, SlotSource};
pub use error::{SchedulingError, SchedulingResult};
pub use interval::{Interval, OverlapPolicy};
pub use lock::{GroupGuard, GroupLocks};
pub use status::PresentationStatus;
