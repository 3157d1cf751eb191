//! PostgreSQL queries, one free function per statement group.

pub mod ingredients;
pub mod ledgers;
pub mod recipes;
pub mod tags;
pub mod users;

pub use ingredients::*;
pub use ledgers::*;
pub use recipes::*;
pub use tags::*;
pub use users::*;
