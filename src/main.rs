fn main() {
    allergen_scan_lib::run()
}
