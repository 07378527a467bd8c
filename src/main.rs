use anyhow::{Context, Result};
use price_lookup::config::AppConfig;
use price_lookup::ui::app::App;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let webview_dir = config.webview_dir();
    std::fs::create_dir_all(&webview_dir)
        .with_context(|| format!("failed to create webview dir: {}", webview_dir.display()))?;

    tracing::info!(data_dir = %config.data_dir.display(), "starting price lookup");
    dioxus::LaunchBuilder::desktop()
        .with_cfg(
            dioxus::desktop::Config::new()
                .with_window(dioxus::desktop::WindowBuilder::new().with_title("Price Lookup"))
                .with_data_directory(webview_dir),
        )
        .launch(App);
    Ok(())
}
