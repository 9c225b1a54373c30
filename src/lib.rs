pub mod capture;
pub mod cli;
pub mod error;
pub mod mock;
pub mod records;
pub mod sender;
