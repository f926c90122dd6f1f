/// Display version information
pub fn execute() {
    println!("modwarden {}", env!("CARGO_PKG_VERSION"));
    println!("Community-voted mod management for game servers");
}
