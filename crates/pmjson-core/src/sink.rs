//! JSON-lines output sink with stale-output removal and atomic tmp→rename

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Buffer size for the output writer (256KB)
const OUTPUT_BUF_SIZE: usize = 256 * 1024;

/// Buffered newline-delimited JSON writer.
///
/// Owns its final path for the lifetime of one conversion job. Anything
/// already at that path is deleted on creation; new content goes to a
/// sibling `.tmp` file that is renamed into place by [`finalize`].
/// Dropping an unfinalized sink removes the tmp file, so a failed job
/// leaves nothing at the final path.
///
/// [`finalize`]: JsonLinesSink::finalize
pub struct JsonLinesSink {
    writer: Option<BufWriter<File>>,
    tmp_path: PathBuf,
    final_path: PathBuf,
    pair_count: usize,
}

impl std::fmt::Debug for JsonLinesSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesSink")
            .field("final_path", &self.final_path)
            .field("pair_count", &self.pair_count)
            .finish_non_exhaustive()
    }
}

impl JsonLinesSink {
    /// Delete stale output at `final_path` and start writing a tmp file next to it
    pub fn create(final_path: &Path) -> io::Result<Self> {
        let final_path = final_path.to_path_buf();
        let tmp_path = tmp_path_for(&final_path);

        remove_if_exists(&final_path)?;
        remove_if_exists(&tmp_path)?;

        let file = File::create(&tmp_path)?;
        Ok(Self {
            writer: Some(BufWriter::with_capacity(OUTPUT_BUF_SIZE, file)),
            tmp_path,
            final_path,
            pair_count: 0,
        })
    }

    /// Append one bulk-index line pair: action line, then document line
    pub fn write_pair<A: Serialize, D: Serialize>(
        &mut self,
        action: &A,
        document: &D,
    ) -> io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::other("sink already finalized"))?;
        serde_json::to_writer(&mut *writer, action)?;
        writer.write_all(b"\n")?;
        serde_json::to_writer(&mut *writer, document)?;
        writer.write_all(b"\n")?;
        self.pair_count += 1;
        Ok(())
    }

    /// Flush and atomically rename tmp → final
    pub fn finalize(mut self) -> io::Result<usize> {
        if let Some(writer) = self.writer.take() {
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }
        fs::rename(&self.tmp_path, &self.final_path)?;
        Ok(self.pair_count)
    }
}

impl Drop for JsonLinesSink {
    fn drop(&mut self) {
        // Only an unfinalized sink still holds its writer
        if self.writer.take().is_some() {
            if let Err(e) = fs::remove_file(&self.tmp_path) {
                log::warn!("Failed to remove {}: {}", self.tmp_path.display(), e);
            }
        }
    }
}

/// Suffix appended to an output path while it is being written
const TMP_SUFFIX: &str = ".json.tmp";

fn tmp_path_for(final_path: &Path) -> PathBuf {
    let mut name = final_path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Remove `*.json.tmp` files an aborted run left in the output directory.
///
/// Other files, including unrelated `*.tmp` files, are left alone.
pub fn cleanup_tmp_files(output_dir: &Path) -> io::Result<()> {
    for entry in fs::read_dir(output_dir)? {
        let entry = entry?;
        let path = entry.path();
        let ours = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.len() > TMP_SUFFIX.len() && name.ends_with(TMP_SUFFIX));
        if ours && entry.file_type()?.is_file() {
            log::warn!("Removing stale tmp file: {}", path.display());
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn writes_two_lines_per_pair() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");

        let mut sink = JsonLinesSink::create(&path).unwrap();
        sink.write_pair(&json!({"index": {"_id": "1"}}), &json!({"PMID": "1"}))
            .unwrap();
        sink.write_pair(&json!({"index": {"_id": "2"}}), &json!({"PMID": "2"}))
            .unwrap();
        assert_eq!(sink.finalize().unwrap(), 2);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], r#"{"index":{"_id":"1"}}"#);
        assert_eq!(lines[1], r#"{"PMID":"1"}"#);
        assert!(content.ends_with('\n'));
        assert!(!dir.path().join("out.json.tmp").exists());
    }

    #[test]
    fn create_deletes_stale_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        fs::write(&path, "stale\n").unwrap();

        let sink = JsonLinesSink::create(&path).unwrap();
        assert!(!path.exists());
        sink.finalize().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn dropped_sink_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        fs::write(&path, "stale\n").unwrap();

        {
            let mut sink = JsonLinesSink::create(&path).unwrap();
            sink.write_pair(&json!({}), &json!({})).unwrap();
        }

        assert!(!path.exists());
        assert!(!dir.path().join("out.json.tmp").exists());
    }

    #[test]
    fn cleanup_removes_only_sink_tmp_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.json.tmp"), "").unwrap();
        fs::write(dir.path().join("b.json"), "").unwrap();
        fs::write(dir.path().join("notes.tmp"), "keep me").unwrap();
        fs::write(dir.path().join("data.xml.tmp"), "keep me").unwrap();

        cleanup_tmp_files(dir.path()).unwrap();

        assert!(!dir.path().join("a.json.tmp").exists());
        assert!(dir.path().join("b.json").exists());
        assert!(dir.path().join("notes.tmp").exists());
        assert!(dir.path().join("data.xml.tmp").exists());
    }
}
