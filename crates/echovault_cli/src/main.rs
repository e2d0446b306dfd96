//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `echovault_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use echovault_core::LockPolicy;

fn main() {
    println!("echovault_core ping={}", echovault_core::ping());
    println!("echovault_core version={}", echovault_core::core_version());
    let policies = LockPolicy::ALL
        .iter()
        .map(|policy| policy.as_str())
        .collect::<Vec<_>>()
        .join(",");
    println!("echovault_core lock_policies={policies}");
}
