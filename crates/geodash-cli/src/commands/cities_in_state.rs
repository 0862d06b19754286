use crate::cli::CitiesInStateArgs;
use crate::commands::build_facade;
use crate::output;
use geodash_core::config::LayeredConfig;

pub async fn execute(args: CitiesInStateArgs, config: &LayeredConfig) -> i32 {
    let facade = match build_facade(config).await {
        Ok(f) => f,
        Err(e) => return output::failure(&e),
    };

    match facade.get_cities_in_state(&args.state, &args.country).await {
        Ok(cities) => output::success(cities),
        Err(e) => output::failure(&e),
    }
}
