use scanvault_api::setup;
use scanvault_core::Config;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (state, router) = setup::initialize_app(&config).await?;

    setup::server::start_server(&config, &state, router).await?;

    Ok(())
}
