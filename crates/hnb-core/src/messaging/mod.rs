//! Messenger abstraction: port, update model, throttling decorator and a recording double.

pub mod port;
pub mod recording;
pub mod throttled;
pub mod types;
