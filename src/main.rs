fn main() {
    if let Err(err) = layout_flow::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
