/// Builds the gRPC client and server code for `tickstream.proto` using
/// `tonic-prost-build`.
///
/// The generated bindings are written to `OUT_DIR` together with an encoded
/// file descriptor set (`tickstream_descriptor.bin`) that the server registers
/// with the reflection service.
///
/// # Files and Paths
///
/// - Proto file: `proto/tickstream.proto`
/// - Includes: `proto/`
///
/// # Panics
///
/// Panics if code generation fails. Build scripts have no better channel for
/// reporting the error.
///
/// # Output
///
/// ```rust
/// pub mod proto {
///     tonic::include_proto!("tickstream");
/// }
/// ```
use std::env;
use std::path::PathBuf;
fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("tickstream_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();
    config.file_descriptor_set_path(&descriptor_path);

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/tickstream.proto"], &["proto"])
        .unwrap();
}
