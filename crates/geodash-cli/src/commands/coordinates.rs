use crate::cli::CoordinatesArgs;
use crate::commands::build_facade;
use crate::output;
use geodash_core::config::LayeredConfig;
use geodash_core::error::GeodashError;

pub async fn execute(args: CoordinatesArgs, config: &LayeredConfig) -> i32 {
    if args.radius <= 0.0 {
        return output::failure(&GeodashError::InvalidParameter("radius must be positive".to_string()));
    }

    let facade = match build_facade(config).await {
        Ok(f) => f,
        Err(e) => return output::failure(&e),
    };

    let mut results = match facade.find_by_coordinates(args.lat, args.lng, args.radius) {
        Ok(r) => r,
        Err(e) => return output::failure(&e),
    };
    results.truncate(config.limits_max.value);
    output::success(results)
}
