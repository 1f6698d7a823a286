use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(feature = "ssr")] {
        use anyhow::Context;
        use dotenv::dotenv;
        use env_logger::Env;
        use supportchat::app::{router, router_with_assets};
        use supportchat::config::AppConfig;
        use supportchat::state::AppState;

        #[tokio::main]
        async fn main() -> anyhow::Result<()> {
            dotenv().ok();
            env_logger::init_from_env(Env::default().default_filter_or("info"));

            let config = AppConfig::from_env().context("failed to load configuration")?;
            log::debug!("Loaded {config:?}");

            let addr = config.site_addr;
            let app_state = AppState::from_config(&config);

            let app = match &config.static_dir {
                Some(dir) => {
                    log::info!("Serving widget assets from {}", dir.display());
                    router_with_assets(app_state, dir)
                }
                None => router(app_state),
            };

            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;
            log::info!("listening on http://{}", &addr);
            axum::serve(listener, app).await?;
            Ok(())
        }
    } else {
        pub fn main() {
            eprintln!("The relay server requires the 'ssr' feature");
            std::process::exit(1);
        }
    }
}
