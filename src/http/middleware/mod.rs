pub mod idle_reset;

pub use idle_reset::idle_reset_middleware;
