fn main() {
    if let Err(e) = office_ledger_lib::run() {
        eprintln!("office-ledger: {e:#}");
        std::process::exit(1);
    }
}
