pub mod database;
pub mod entities;

pub use database::*;
pub use entities::prelude;
