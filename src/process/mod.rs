// In: src/process/mod.rs

//! Chains and the process manager that drives them.
//!
//! A run is an ordered list of `Chain`s, each an ordered list of links. The
//! `ProcessManager` owns both the chains and the `ServiceRegistry` and walks the
//! three lifecycle phases across all of them. A chain re-runs itself while any of
//! its links has its repeat flag set in the `ConfigObject`.

pub mod chain;
pub mod manager;

pub use self::chain::Chain;
pub use self::manager::ProcessManager;
