pub mod account_repo;
pub mod connection;
pub mod convert;
pub mod migrations;
pub mod session_repo;
pub mod settings_repo;
pub mod task_repo;
pub mod unit_of_work;

pub use connection::*;
pub use unit_of_work::UnitOfWork;
