pub mod user_repo;
pub use user_repo::UserRepository;
pub mod product_repo;
pub use product_repo::ProductRepository;
pub mod schedule_repo;
pub use schedule_repo::ScheduleRepository;
pub mod movement_repo;
pub use movement_repo::MovementRepository;
