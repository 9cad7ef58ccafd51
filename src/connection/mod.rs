//! The `connection` module establishes broker connections with bounded,
//! linearly backed-off retries.

pub mod resolver;

pub use resolver::{ConnectionResolver, ResolverState, RetryPolicy, Sleeper, TokioSleeper};
