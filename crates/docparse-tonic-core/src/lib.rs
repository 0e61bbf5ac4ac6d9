#![doc = include_str!("../README.md")]

pub mod common;
pub use common::*;

// Generated protobuf types and service bindings.
pub mod proto {
    tonic::include_proto!("docparse");

    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("docparse_descriptor");
}
