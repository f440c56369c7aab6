pub mod clock;
pub mod fingerprint_lock;
pub mod format;
pub mod time_range;
