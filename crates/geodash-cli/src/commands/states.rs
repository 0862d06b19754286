use crate::cli::StatesArgs;
use crate::commands::build_facade;
use crate::output;
use geodash_core::config::LayeredConfig;

pub async fn execute(args: StatesArgs, config: &LayeredConfig) -> i32 {
    let facade = match build_facade(config).await {
        Ok(f) => f,
        Err(e) => return output::failure(&e),
    };

    match facade.get_states(&args.country).await {
        Ok(states) => output::success(states),
        Err(e) => output::failure(&e),
    }
}
