use std::time::SystemTime;

use crate::game::Timestamp;

/// Generate a Unix timestamp in millis.
pub fn get_timestamp() -> Timestamp {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as Timestamp)
}
