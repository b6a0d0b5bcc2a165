fn main() {
    skein::cli::run();
}
