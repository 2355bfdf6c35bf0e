use std::process;

fn main() {
    if let Err(e) = ulwazi::run() {
        ulwazi::report_error(&e);
        process::exit(1);
    }
}
