//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `swarmplan_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("swarmplan_core ping={}", swarmplan_core::ping());
    println!("swarmplan_core version={}", swarmplan_core::core_version());
}
