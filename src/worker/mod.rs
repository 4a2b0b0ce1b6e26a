pub mod executor;
pub mod pool;
