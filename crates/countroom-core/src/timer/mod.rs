mod clock;
mod duration;
mod machine;
mod urgency;

pub use clock::{TickDriver, TICK_INTERVAL};
pub use duration::{format_hms, from_hms, parse_duration};
pub use machine::{NewTimer, Timer, TimerStatus, MAX_DURATION_SECS, MAX_NAME_LEN};
pub use urgency::{BlinkBoard, BLINK_INTERVAL, Color, Feedback, Urgency, UrgencyThresholds};
