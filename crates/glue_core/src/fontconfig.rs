use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::assets::AssetSource;
use crate::error::AssetError;

pub const CONFIG_FILE_NAME: &str = "fonts.conf";

const DIR_MARKER: (&str, &str) = ("<dir>", "</dir>");
const CACHEDIR_MARKER: (&str, &str) = ("<cachedir>", "</cachedir>");

/// Inserts `dir` right after the opening tag of the first `<dir></dir>` and
/// the first `<cachedir></cachedir>`. A missing marker is left alone.
pub fn render_template(template: &[u8], dir: &[u8]) -> Vec<u8> {
    let mut rendered = template.to_vec();
    for (open, close) in [DIR_MARKER, CACHEDIR_MARKER] {
        let marker = [open.as_bytes(), close.as_bytes()].concat();
        if let Some(at) = find(&rendered, &marker) {
            let insert_at = at + open.len();
            rendered.splice(insert_at..insert_at, dir.iter().copied());
        }
    }
    rendered
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;

    Cow::Borrowed(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    match path.to_string_lossy() {
        Cow::Borrowed(text) => Cow::Borrowed(text.as_bytes()),
        Cow::Owned(text) => Cow::Owned(text.into_bytes()),
    }
}

/// Reads the packaged template, fills in `output_dir` and writes
/// `output_dir/fonts.conf`.
///
/// Returns `Ok(None)` when the container has no template.
pub fn materialize<A>(
    assets: &A,
    template_path: &str,
    output_dir: &Path,
) -> Result<Option<PathBuf>, AssetError>
where
    A: AssetSource + ?Sized,
{
    let Some(asset) = assets.open(template_path) else {
        debug!(asset = template_path, "font config template not present");
        return Ok(None);
    };
    let template = asset.read_all()?;
    let rendered = render_template(&template, &path_bytes(output_dir));

    let target = output_dir.join(CONFIG_FILE_NAME);
    fs::write(&target, rendered).map_err(|source| AssetError::Write {
        path: target.clone(),
        source,
    })?;
    debug!(path = %target.display(), "font config materialized");
    Ok(Some(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssets;
    use tempfile::tempdir;

    #[test]
    fn inserts_after_each_opening_tag() {
        let template = b"<fontconfig>\n  <dir></dir>\n  <cachedir></cachedir>\n</fontconfig>\n";
        let rendered = render_template(template, b"/data/fonts");
        assert_eq!(
            String::from_utf8(rendered).unwrap(),
            "<fontconfig>\n  <dir>/data/fonts</dir>\n  <cachedir>/data/fonts</cachedir>\n</fontconfig>\n"
        );
    }

    #[test]
    fn missing_marker_only_fills_the_present_one() {
        let rendered = render_template(b"<cachedir></cachedir>", b"/x");
        assert_eq!(rendered, b"<cachedir>/x</cachedir>");

        let rendered = render_template(b"<dir></dir><include>a</include>", b"/x");
        assert_eq!(rendered, b"<dir>/x</dir><include>a</include>");
    }

    #[test]
    fn only_first_occurrence_is_filled() {
        let rendered = render_template(b"<dir></dir><dir></dir>", b"p");
        assert_eq!(rendered, b"<dir>p</dir><dir></dir>");
    }

    #[test]
    fn non_empty_markers_are_not_touched() {
        let template = b"<dir>/system/fonts</dir>";
        assert_eq!(render_template(template, b"/x"), template.to_vec());
    }

    #[test]
    fn materialize_writes_fonts_conf() {
        let temp = tempdir().expect("tempdir");
        let assets = MemoryAssets::new().with("fonts/fonts.conf", "<dir></dir>");
        let written = materialize(&assets, "fonts/fonts.conf", temp.path())
            .expect("materialize")
            .expect("template present");
        assert_eq!(written, temp.path().join(CONFIG_FILE_NAME));
        let contents = fs::read_to_string(written).expect("read");
        assert_eq!(contents, format!("<dir>{}</dir>", temp.path().display()));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn non_utf8_directory_is_inserted_verbatim() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = tempdir().expect("tempdir");
        let output = temp.path().join(OsStr::from_bytes(b"fonts-\xff"));
        fs::create_dir(&output).expect("mkdir");
        let assets = MemoryAssets::new().with("fonts/fonts.conf", "<cachedir></cachedir>");

        let written = materialize(&assets, "fonts/fonts.conf", &output)
            .expect("materialize")
            .expect("template present");

        let expected = [
            b"<cachedir>".as_slice(),
            output.as_os_str().as_bytes(),
            b"</cachedir>".as_slice(),
        ]
        .concat();
        assert_eq!(fs::read(written).expect("read"), expected);
    }

    #[test]
    fn materialize_without_template_writes_nothing() {
        let temp = tempdir().expect("tempdir");
        let result = materialize(&MemoryAssets::new(), "fonts/fonts.conf", temp.path())
            .expect("materialize");
        assert!(result.is_none());
        assert!(!temp.path().join(CONFIG_FILE_NAME).exists());
    }
}
