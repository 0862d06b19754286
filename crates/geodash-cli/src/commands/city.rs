use crate::cli::CityArgs;
use crate::commands::build_facade;
use crate::output;
use geodash_core::config::LayeredConfig;
use geodash_core::error::GeodashError;

pub async fn execute(args: CityArgs, config: &LayeredConfig) -> i32 {
    let facade = match build_facade(config).await {
        Ok(f) => f,
        Err(e) => return output::failure(&e),
    };

    match facade.get_city(args.id).await {
        Ok(Some(city)) => output::success(city),
        Ok(None) => {
            output::failure(&GeodashError::DataNotFoundError(format!("no city with id {}", args.id)))
        }
        Err(e) => output::failure(&e),
    }
}
