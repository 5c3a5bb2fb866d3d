//! Version command implementation

pub fn execute() {
    println!("🦀 stackdown");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Edition: Rust 2024");
    println!();
    println!("Backends:");
    println!("  • Instance lookup: yc compute instance list");
    println!("  • Remote shutdown: ssh + docker compose down");
}
