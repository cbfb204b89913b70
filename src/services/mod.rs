pub mod analysis;
pub mod answerer;
pub mod cache;
pub mod csv_loader;
pub mod session;
