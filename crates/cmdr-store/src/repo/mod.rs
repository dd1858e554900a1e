//! Repository layer over the record store tables

mod command_repo;
mod links;
mod rows;

pub use command_repo::CommandRepo;
pub use links::LinkRepo;
