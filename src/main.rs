fn main() {
    chessmind::uci::run();
}
