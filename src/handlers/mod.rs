//! Command Handlers module
//!
//! Services that apply business rules on top of the stores: the Account
//! Directory and the Money-Movement Engine.

mod account_directory;
mod commands;
mod money_movement;


pub use account_directory::AccountDirectory;
pub use commands::*;
pub use money_movement::MoneyMovement;
