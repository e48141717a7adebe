//! CLI command implementations.

mod add;
mod ask;
mod chat;
mod config;
mod delete;
mod doctor;
mod init;
mod list;
mod new;
mod process;
mod remove;

pub use add::run_add;
pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use delete::run_delete;
pub use doctor::run_doctor;
pub use init::run_init;
pub use list::run_list;
pub use new::run_new;
pub use process::{run_index, run_process, run_transcribe};
pub use remove::run_remove;
