//! Integration test suite for the updater
//!
//! End-to-end update cycles driven through the `test-utils` fakes: no network,
//! no dialogs, no process exits. Each test builds a throwaway installation in
//! a temporary directory.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! - **update_cycle**: the cycle state machine from manifest check to commit
//! - **recovery**: resuming after interrupted or corrupted cycles
//! - **scheduler_loop**: the long-running loop and its reschedule delays
//! - **cli**: the `bundle-updater` binary's offline commands

mod cli;
mod recovery;
mod scheduler_loop;
mod update_cycle;
