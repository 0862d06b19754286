use crate::commands::build_facade;
use crate::output;
use geodash_core::config::LayeredConfig;

pub async fn execute(config: &LayeredConfig) -> i32 {
    let facade = match build_facade(config).await {
        Ok(f) => f,
        Err(e) => return output::failure(&e),
    };

    match facade.get_countries().await {
        Ok(countries) => output::success(countries),
        Err(e) => output::failure(&e),
    }
}
