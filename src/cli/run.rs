use super::config::WardenConfig;
use modwarden::catalog::{DependencyResolver, HttpCatalog};
use modwarden::chat::{ConsoleChat, WardenBot};
use modwarden::graph::GraphStore;
use modwarden::install::{InstallCoordinator, IniSettings};
use tracing::info;

/// Run the bot service
///
/// Loads the persisted dependency graph for the configured server, then
/// serves votes over the configured chat transport until it closes.
pub async fn execute(config: WardenConfig) -> Result<(), Box<dyn std::error::Error>> {
    let policy = config.voting_policy()?;

    let settings = IniSettings::for_server(&config.server.config_dir, &config.server.name);
    if !settings.path().exists() {
        return Err(format!(
            "Server settings file '{}' not found",
            settings.path().display()
        )
        .into());
    }

    let store = GraphStore::for_server(&config.server.config_dir, &config.server.name);
    let graph = store.load_or_default()?;

    let fetcher = HttpCatalog::new(config.catalog_timeout()?)?;
    let resolver = DependencyResolver::new(
        fetcher,
        config.catalog.item_url_prefix.clone(),
        config.catalog.retry_rounds,
    );

    info!(
        server = %config.server.name,
        quorum = policy.quorum,
        hard_cap = policy.hard_cap,
        graph = %graph.summary(),
        "starting mod warden"
    );

    match config.chat.transport.as_str() {
        "console" => {
            println!("Mod Warden console. Type `<name>: /help` to begin.");
            let chat = ConsoleChat::spawn();
            let mut bot = WardenBot::new(
                chat,
                resolver,
                InstallCoordinator::new(settings),
                graph,
                store,
                policy,
            );
            bot.run().await?;
        }
        other => return Err(format!("Unsupported chat transport '{}'", other).into()),
    }

    Ok(())
}
