fn main() {
    hubctl::run_cli();
}
