mod executor;

pub use executor::{Executor, PoolClosed, Scope};
