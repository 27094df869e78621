//! Publishing compiled outputs
//!
//! After a production build, `compiled.css` and `compiled.js` are copied to
//! the locations the selected targets name. A `{hash}` placeholder in those
//! names is replaced by the SHA-256 digest of the content, so published
//! files can be cached forever. When `map.file` is configured, the final
//! names are written there as a JavaScript object for the page to load.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use sha2::{Digest, Sha256};

use crate::config::{Config, GssTarget, JsTarget};
use crate::defaults;
use crate::error::{Error, Result};
use crate::phases::scripts;

/// Where each output ended up, keyed by `<target>-css` / `<target>-js`
pub type PublishMapping = BTreeMap<String, String>;

/// Hex encoded SHA-256 digest of `content`.
pub fn content_hash(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Replace the hash placeholder in `name` with the digest of `content`.
pub fn hashed_name(name: &Path, content: &[u8]) -> PathBuf {
    let name = name.to_string_lossy();
    if !name.contains(defaults::HASH_PLACEHOLDER) {
        return PathBuf::from(name.as_ref());
    }
    PathBuf::from(name.replace(defaults::HASH_PLACEHOLDER, &content_hash(content)))
}

/// Copy `source` to `destination`, expanding the hash placeholder.
pub fn publish_file(source: &Path, destination: &Path) -> Result<PathBuf> {
    let content = fs::read(source).map_err(|e| Error::filesystem(source, e))?;
    let target = hashed_name(destination, &content);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::filesystem(parent, e))?;
    }
    fs::write(&target, &content).map_err(|e| Error::filesystem(&target, e))?;
    info!("Published {}", target.display());
    Ok(target)
}

/// Publish every output the targets ask for and write the name map.
pub fn publish(config: &Config, js: &JsTarget, gss: &GssTarget) -> Result<PublishMapping> {
    let mut mapping = PublishMapping::new();

    if config.gss.is_some() {
        if let Some(output) = &gss.output {
            let source = config.build.join(defaults::CSS_NAME);
            let published = publish_file(&source, output)?;
            mapping.insert(
                format!("{}-css", gss.name),
                published.display().to_string(),
            );
        }
    }

    if config.js.is_some() && scripts::is_compiled(js.mode()) {
        if let Some(output) = &js.output {
            let source = config.build.join(defaults::JS_NAME);
            let published = publish_file(&source, output)?;
            mapping.insert(format!("{}-js", js.name), published.display().to_string());
        }
    }

    if let Some(map) = &config.map {
        write_mapping(&map.file, &mapping)?;
    }

    Ok(mapping)
}

/// Write `var mapping = {...};` to `path`.
pub fn write_mapping(path: &Path, mapping: &PublishMapping) -> Result<()> {
    let json = serde_json::to_string(mapping)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::filesystem(parent, e))?;
    }
    fs::write(path, format!("var mapping = {};\n", json)).map_err(|e| Error::filesystem(path, e))
}
