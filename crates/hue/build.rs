fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var_os("PROTOC").is_none() {
        unsafe {
            std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
        }
    }

    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR")?;
    let proto_path = std::path::Path::new(&manifest_dir).join("proto");
    let proto_file = proto_path.join("hue.proto");

    tonic_build::configure().compile_protos(&[proto_file], &[proto_path])?;
    Ok(())
}
