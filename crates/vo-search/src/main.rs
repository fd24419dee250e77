//! `vo-search` binary entry point.

fn main() {
    if let Err(err) = vo_search::cli::cli() {
        eprintln!("vo-search: {err}");
        std::process::exit(1);
    }
}
