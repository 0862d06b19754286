use crate::cli::SearchArgs;
use crate::commands::build_facade;
use crate::output;
use geodash_core::config::LayeredConfig;
use geodash_search::SearchParams;

pub async fn execute(args: SearchArgs, config: &LayeredConfig) -> i32 {
    let facade = match build_facade(config).await {
        Ok(f) => f,
        Err(e) => return output::failure(&e),
    };

    let fuzzy_threshold =
        if config.fuzzy_enabled.value { config.fuzzy_threshold.value } else { 101 };

    let params = SearchParams {
        query: args.query,
        limit: config.limits_default.value,
        country_filter: None,
        user_lat: None,
        user_lng: None,
        user_country: None,
        fuzzy_threshold,
    };

    match facade.search(&params).await {
        Ok(results) => output::success(results),
        Err(e) => output::failure(&e),
    }
}
