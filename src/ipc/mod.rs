//! IPC layer: Unix domain socket server and message protocol

mod protocol;
mod server;

pub use server::Server;
