fn main() {
    if let Err(err) = toolrelay::cli::main() {
        eprintln!("❌ {err}");
        std::process::exit(1);
    }
}
