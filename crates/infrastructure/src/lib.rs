pub mod file_repository;
pub mod records;
pub mod repositories;

pub use file_repository::*;
pub use records::*;
pub use repositories::*;
