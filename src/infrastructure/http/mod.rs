//! Resilient HTTP layer: circuit breaker, managed connection pools, and the
//! transport error taxonomy shared by every external adapter.

pub mod circuit_breaker;
pub mod error;
pub mod pool;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState, CircuitStats};
pub use error::ServiceError;
pub use pool::{ApiConnectionPool, ApiResponse, PoolRegistry, PoolStats};
