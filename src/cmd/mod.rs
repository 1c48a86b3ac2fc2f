//! CLI command implementations.
//!
//! | Module     | Commands handled                                                  |
//! |------------|-------------------------------------------------------------------|
//! | `workflow` | `Init`, `Status`, `Complete`, `Skip`, `Advance`, `Output`, `Recommend`, `Reset` |
//! | `config`   | `Config`                                                          |

pub mod config;
pub mod workflow;

pub use config::cmd_config;
pub use workflow::{
    cmd_advance, cmd_complete, cmd_init, cmd_output, cmd_recommend, cmd_reset, cmd_skip,
    cmd_status,
};
