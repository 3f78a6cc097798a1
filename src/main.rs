fn main() {
    if let Err(err) = blinkify_server::app::run() {
        eprintln!("blinkify server stopped: {err}");
        std::process::exit(1);
    }
}
