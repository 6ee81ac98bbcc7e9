pub mod pool;
pub mod tcp;

pub use pool::ConnectionPool;
pub use tcp::RedisConnection;
