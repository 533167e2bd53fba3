use serde::Deserialize;
use settings_sources::Config;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
struct AppConfig {
    app: AppSection,
    database: DatabaseSection,
}

#[derive(Debug, Deserialize)]
struct AppSection {
    name: String,
    debug: bool,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct DatabaseSection {
    host: String,
    port: u16,
    name: String,
    url: String,
    tags: Vec<String>,
}

fn main() -> Result<(), settings_sources::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Files under demos/config merge by name, then DEMO__* variables override.
    let config: AppConfig = Config::builder()
        .with_yaml("demos/config")
        .with_env("DEMO", "__")
        .build()?;

    println!("App: {} (debug={})", config.app.name, config.app.debug);
    println!("Database URL: {}", config.database.url);
    println!("Database tags: {:?}", config.database.tags);

    Ok(())
}
