pub mod failures;
pub mod happy_path;
pub mod session_events;
