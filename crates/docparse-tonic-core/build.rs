//! Builds the gRPC client and server code for the `docparse.proto`
//! definition using `tonic-prost-build`.
//!
//! The file descriptor set is emitted alongside the generated code so
//! that the server can expose gRPC reflection.

use std::env;
use std::path::PathBuf;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("docparse_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();
    config.file_descriptor_set_path(&descriptor_path);

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/docparse.proto"], &["proto"])
        .unwrap();
}
