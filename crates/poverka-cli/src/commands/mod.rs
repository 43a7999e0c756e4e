//! Command implementations for the CLI.

mod climate;
mod config;
mod device;
mod journal;
mod protocol;
mod remind;
mod task;
mod verify;

pub use climate::cmd_climate;
pub use config::cmd_config;
pub use device::cmd_device;
pub use journal::cmd_journal;
pub use protocol::cmd_protocol;
pub use remind::cmd_remind;
pub use task::cmd_task;
pub use verify::cmd_verify;
