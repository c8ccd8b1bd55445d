mod memory_server;
mod remote_server;
mod server_interface;

pub use memory_server::{make_memory_server, server_for_directory, MemoryServer};
pub use remote_server::make_remote_server;
pub use server_interface::{
    AbstractServer, ErrorDetails, ErrorLayer, FileListing, FileMetadata, Result, ServerError,
};
