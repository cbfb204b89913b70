pub mod aggregate;
pub mod intent;
pub mod profiler;
pub mod types;

pub use aggregate::execute;
pub use intent::classify_intent;
pub use profiler::build_profile;
