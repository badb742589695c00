//! Write-then-rename helpers.
//!
//! Every file this tool creates on a tier goes through a temporary file in
//! the destination directory that is fsynced and renamed into place, so an
//! interrupted transfer never leaves a truncated file under the final name.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

fn temp_beside(dest: &Path) -> io::Result<NamedTempFile> {
    let parent = dest.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent)?;
    NamedTempFile::new_in(parent)
}

fn finish(temp: NamedTempFile, dest: &Path) -> io::Result<()> {
    temp.as_file().sync_all()?;
    temp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

/// Streams `reader` into `dest`. Returns the number of bytes written.
pub fn write_from_reader<R: Read>(reader: &mut R, dest: &Path) -> io::Result<u64> {
    let mut temp = temp_beside(dest)?;
    let written = io::copy(reader, &mut temp)?;
    temp.flush()?;
    finish(temp, dest)?;
    Ok(written)
}

/// Copies `src` to `dest`, creating parent directories as needed.
pub fn copy_file(src: &Path, dest: &Path) -> io::Result<u64> {
    let mut file = File::open(src)?;
    write_from_reader(&mut file, dest)
}

/// Builds a file from successive chunks produced by `next_chunk`, which
/// returns `Ok(None)` when done.
pub fn write_chunks<F>(dest: &Path, mut next_chunk: F) -> io::Result<u64>
where
    F: FnMut() -> io::Result<Option<Vec<u8>>>,
{
    let mut temp = temp_beside(dest)?;
    let mut written = 0u64;
    while let Some(chunk) = next_chunk()? {
        temp.write_all(&chunk)?;
        written += chunk.len() as u64;
    }
    finish(temp, dest)?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn copy_creates_parents_and_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src.txt");
        fs::write(&src, "payload").unwrap();

        let dest = temp.path().join("a/b/dest.txt");
        assert_eq!(copy_file(&src, &dest).unwrap(), 7);
        assert_eq!(fs::read_to_string(&dest).unwrap(), "payload");
        assert_eq!(fs::read_dir(temp.path().join("a/b")).unwrap().count(), 1);
    }

    #[test]
    fn copy_replaces_existing_file() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src.txt");
        let dest = temp.path().join("dest.txt");
        fs::write(&src, "new").unwrap();
        fs::write(&dest, "old content").unwrap();

        copy_file(&src, &dest).unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "new");
    }

    #[test]
    fn write_chunks_concatenates() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("out.bin");
        let mut chunks = vec![b"ab".to_vec(), b"cd".to_vec()].into_iter();

        let written = write_chunks(&dest, || Ok(chunks.next())).unwrap();
        assert_eq!(written, 4);
        assert_eq!(fs::read(&dest).unwrap(), b"abcd");
    }

    #[test]
    fn failed_chunk_leaves_no_destination() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("out.bin");

        let result = write_chunks(&dest, || Err(io::Error::other("boom")));
        assert!(result.is_err());
        assert!(!dest.exists());
    }

    #[test]
    fn copy_missing_source_fails() {
        let temp = TempDir::new().unwrap();
        assert!(copy_file(&temp.path().join("nope"), &temp.path().join("x")).is_err());
    }
}
