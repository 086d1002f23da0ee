//! Artifact persistence.
//!
//! Each artifact is written once: bytes go to `<name>.part` (mode 0644 on
//! Unix), are synced, then renamed onto the final name so a reader never
//! sees a half-written file.

use crate::error::StorageError;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Permission bits for saved artifacts: owner rw, group/other r.
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

/// Create `dir` (and parents) and make sure files can be written in it.
///
/// Run before the walk so a bad output directory fails before any download.
pub fn prepare_output_dir(dir: &Path) -> Result<(), StorageError> {
    let fail = |source| StorageError {
        path: dir.to_path_buf(),
        source,
    };
    std::fs::create_dir_all(dir).map_err(fail)?;
    let check = dir.join(format!(".arxget-write-check{}", TEMP_SUFFIX));
    let checked = write_new(&check, b"");
    let _ = std::fs::remove_file(&check);
    checked.map_err(fail)
}

/// Write `bytes` to `dir/file_name` and return the final path.
pub fn save_artifact(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, StorageError> {
    let final_path = dir.join(file_name);
    let temp = temp_path(&final_path);

    let written = write_new(&temp, bytes).and_then(|()| std::fs::rename(&temp, &final_path));
    if let Err(source) = written {
        let _ = std::fs::remove_file(&temp);
        return Err(StorageError {
            path: final_path,
            source,
        });
    }
    Ok(final_path)
}

fn write_new(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = File::options();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(FILE_MODE);
    }
    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Path for the temp file: appends `.part` to the final path (e.g. `2308.07001v2.pdf` → `2308.07001v2.pdf.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}
