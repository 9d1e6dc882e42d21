pub mod app_config;
pub mod database;
pub mod inventory_repo;
pub mod lock_repo;
pub mod redis_repo;
pub mod reservation_repo;

pub use app_config::Config;
pub use database::DbClient;
pub use inventory_repo::PgInventoryStore;
pub use lock_repo::PgLockLedger;
pub use redis_repo::RedisClient;
pub use reservation_repo::PgReservationStore;
