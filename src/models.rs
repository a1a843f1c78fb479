pub mod account;
pub mod gear;
pub mod location;
pub mod patch;
pub mod types;
