// Regras puras (sem banco)
pub mod activities;
pub mod classification;
pub mod counts;
pub mod schedule_status;
pub mod transfer;
pub mod variance;

pub mod user_directory;

// Orquestração (banco + regras)
pub mod auth;
pub mod movement_service;
pub mod product_service;
pub mod schedule_service;
pub mod user_service;
