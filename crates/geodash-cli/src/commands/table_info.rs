use crate::commands::build_facade;
use crate::output;
use geodash_core::config::LayeredConfig;
use geodash_store::ports::BackendKind;
use serde::Serialize;

#[derive(Serialize)]
struct TableInfo {
    backend: BackendKind,
    row_count: u64,
}

pub async fn execute(config: &LayeredConfig) -> i32 {
    let facade = match build_facade(config).await {
        Ok(f) => f,
        Err(e) => return output::failure(&e),
    };

    match facade.status().await {
        Ok((backend, row_count)) => output::success(TableInfo { backend, row_count }),
        Err(e) => output::failure(&e),
    }
}
