//! Registrar table

mod store;

pub use store::RegistrarStore;
