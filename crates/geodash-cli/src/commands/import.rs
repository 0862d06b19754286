use crate::cli::ImportArgs;
use crate::output;
use crate::progress;
use geodash_core::config::LayeredConfig;
use geodash_core::error::GeodashError;
use geodash_store::{open_store, CorpusLoader, GeoStore};
use std::path::PathBuf;

pub async fn execute(args: ImportArgs, config: &LayeredConfig) -> i32 {
    let path = match args
        .csv_path
        .or_else(|| config.data_location.value.clone().map(PathBuf::from))
    {
        Some(p) => p,
        None => {
            return output::failure(&GeodashError::InvalidParameter(
                "--csv-path is required when data.location is not configured".to_string(),
            ));
        }
    };
    let batch_size = args.batch_size.unwrap_or(config.data_batch_size.value);

    let store = match open_store(config).await {
        Ok(s) => s,
        Err(e) => return output::failure(&e),
    };
    if let Err(e) = store.ensure_schema().await {
        return output::failure(&e);
    }

    let spinner = progress::spinner(&format!("importing {}", path.display()));
    let loader = CorpusLoader::new(batch_size, config.data_countries.value.clone());
    let result = loader.load_file(store.as_ref(), &path).await;
    spinner.finish_and_clear();

    match result {
        Ok(report) => output::success(report),
        Err(e) => output::failure(&e),
    }
}
