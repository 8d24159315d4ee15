pub mod blocks;
pub mod health;
pub mod transactions;
