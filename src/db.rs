pub mod order_repo;
pub use order_repo::{OrderRepository, OrderStore};
pub mod rbac_repo;
pub use rbac_repo::{AppRole, RbacRepository, RoleStore};
#[cfg(test)]
pub mod memory_repo;
#[cfg(test)]
pub use memory_repo::MemoryOrderStore;
