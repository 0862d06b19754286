use crate::cli::{ConfigAction, ConfigArgs};
use crate::config::{self, load};
use crate::output;
use std::collections::BTreeMap;

pub fn execute(args: &ConfigArgs) -> i32 {
    let result = match &args.action {
        ConfigAction::Show { path } => show(path),
        ConfigAction::Init { path, force } => init(path, *force),
        ConfigAction::Validate { path } => validate(path),
    };
    match result {
        Ok(code) => code,
        Err(e) => output::failure(&e),
    }
}

fn show(path: &std::path::Path) -> geodash_core::error::Result<i32> {
    let config = load(path, None)?;
    let map: BTreeMap<String, serde_json::Value> = config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| {
            (key, serde_json::json!({ "value": value, "source": format!("{source:?}") }))
        })
        .collect();
    Ok(output::success(map))
}

fn init(path: &std::path::Path, force: bool) -> geodash_core::error::Result<i32> {
    config::write_default(path, force)?;
    Ok(output::success(serde_json::json!({ "path": path.display().to_string() })))
}

fn validate(path: &std::path::Path) -> geodash_core::error::Result<i32> {
    let config = load(path, None)?;
    match config.validate() {
        Ok(()) => Ok(output::success(serde_json::json!({ "valid": true }))),
        Err(e) => {
            tracing::warn!(error_code = e.error_code(), "{e}");
            Ok(output::success(serde_json::json!({ "valid": false, "reason": e.to_string() })))
        }
    }
}
