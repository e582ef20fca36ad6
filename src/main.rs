fn main() {
    if let Err(err) = column_infer::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
