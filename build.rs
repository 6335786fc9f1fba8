//! Build script for embedding build-time information into the program.
fn main() {
    built::write_built_file().expect("Failed to acquire build-time information");
}
