#[actix_web::main]
async fn main() {
    if let Err(e) = estimates_browser_lib::run().await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
