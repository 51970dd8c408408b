fn main() {
    std::process::exit(match roomtrace::run() {
        Ok(_) => 0,
        Err(ref e) => {
            eprintln!("{e}");
            1
        }
    })
}
