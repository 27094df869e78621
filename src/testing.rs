//! Test page discovery
//!
//! Every `_test.js` file under the script root gets a test page. Pages are
//! named after the script, relative to the root, with `.html` in place of
//! `.js`.

use std::path::Path;

use crate::defaults;
use crate::error::Result;
use crate::scan::Scanner;

/// Sorted test page names under `root`.
pub fn list_tests(root: &Path) -> Result<Vec<String>> {
    let mut pages: Vec<String> = Scanner::new()
        .scan(root, defaults::TEST_EXT)?
        .iter()
        .filter_map(|path| path.strip_prefix(root).ok())
        .map(|rel| {
            let rel = rel.to_string_lossy().replace('\\', "/");
            match rel.strip_suffix(defaults::JS_EXT) {
                Some(stem) => format!("{}.html", stem),
                None => rel,
            }
        })
        .collect();
    pages.sort();
    Ok(pages)
}
