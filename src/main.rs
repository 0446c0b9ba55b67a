use registry_catalog_cache::cli::{Args, Runner};
use registry_catalog_cache::error::RegistryError;

#[tokio::main]
async fn main() {
    let args = Args::parse_args();

    let result = match Runner::new(args) {
        Ok(runner) => runner.run().await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        match e {
            RegistryError::CatalogUnavailable(_) => {
                eprintln!("❌ ERROR: Cannot read the registry catalog, nothing to serve: {}", e);
            }
            _ => eprintln!("❌ ERROR: {}", e),
        }
        std::process::exit(1);
    }
}
