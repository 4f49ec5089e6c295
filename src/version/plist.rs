//! SDK version key in per-framework `Info.plist` files.

use crate::error::Result;
use plist::Value;
use std::path::Path;

/// Key holding the SDK version in each framework's property list.
pub const DEFAULT_VERSION_KEY: &str = "FritzSDKVersion";

/// Version reported when a property list has no version key yet.
const UNSET_VERSION: &str = "0.0.0";

/// Set `key` to `new_version` in the property list at `path`.
///
/// Every other key is written back unchanged. Returns the previous value
/// (`0.0.0` when the key was absent).
pub async fn update_info_plist(path: &Path, key: &str, new_version: &str) -> Result<String> {
    let path_buf = path.to_path_buf();
    let key_owned = key.to_string();
    let new_owned = new_version.to_string();

    let previous = tokio::task::spawn_blocking(move || -> Result<String> {
        let mut value = Value::from_file(&path_buf)?;
        let previous = match value.as_dictionary_mut() {
            Some(dict) => {
                let previous = dict
                    .get(&key_owned)
                    .and_then(Value::as_string)
                    .unwrap_or(UNSET_VERSION)
                    .to_string();
                dict.insert(key_owned, Value::String(new_owned));
                previous
            }
            None => {
                return Err(crate::error::ReleaseError::Config {
                    path: path_buf,
                    reason: "property list root is not a dictionary".to_string(),
                });
            }
        };
        value.to_file_xml(&path_buf)?;
        Ok(previous)
    })
    .await??;

    log::info!("Updating {} from {} -> {}", path.display(), previous, new_version);
    Ok(previous)
}
