fn main() {
    tof_log_analyzer::cli::run();
}
