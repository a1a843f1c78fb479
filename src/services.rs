mod account;
mod auth;
mod inventory;
mod location;

pub use account::AccountService;
pub use auth::{AuthService, Claims, IssuedToken};
pub use inventory::InventoryService;
pub use location::LocationService;
