pub mod auth;
pub mod movement;
pub mod product;
pub mod report;
pub mod schedule;
