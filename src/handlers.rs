pub mod auth;
pub mod movements;
pub mod products;
pub mod schedules;
pub mod users;
