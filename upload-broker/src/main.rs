fn main() {
    upload_broker::server::run()
}
