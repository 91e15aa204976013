use itertools::Itertools;
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf, StripPrefixError},
};
use thiserror::Error as ThisError;
use walkdir::WalkDir;
use zip::{result::ZipError, write::SimpleFileOptions, CompressionMethod, ZipArchive, ZipWriter};

const DIR_MODE: u32 = 0o755;
const FILE_MODE: u32 = 0o644;

#[derive(ThisError, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(
        #[source]
        #[from]
        std::io::Error,
    ),
    #[error("Zip error: {0}")]
    Zip(
        #[source]
        #[from]
        ZipError,
    ),
    #[error("Walk error: {0}")]
    Walk(
        #[source]
        #[from]
        walkdir::Error,
    ),
    #[error("Path outside of archive root: {0}")]
    Prefix(
        #[source]
        #[from]
        StripPrefixError,
    ),
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),
}

/// Archives the contents of `src_dir` into a new zip file at `dest`.
/// Entry names are relative to `src_dir`.
pub fn zip_dir(src_dir: &Path, dest: &Path) -> Result<(), ArchiveError> {
    if !src_dir.is_dir() {
        return Err(ArchiveError::NotADirectory(src_dir.to_path_buf()));
    }

    let mut zip = ZipWriter::new(File::create(dest)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let dir_options = options.unix_permissions(DIR_MODE);
    let file_options = options.unix_permissions(FILE_MODE);

    for entry in WalkDir::new(src_dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();

        // the destination may live inside the source
        if path == dest {
            continue;
        }

        let relative = path.strip_prefix(src_dir)?;
        if relative.as_os_str().is_empty() {
            continue;
        }

        let name = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .join("/");

        if entry.file_type().is_dir() {
            zip.add_directory(name, dir_options)?;
        } else if entry.file_type().is_file() {
            zip.start_file(name, file_options)?;
            let mut file = File::open(path)?;
            std::io::copy(&mut file, &mut zip)?;
        }
    }

    zip.finish()?;

    Ok(())
}

/// Extracts every entry of the zip at `archive` into `dest_dir`.
pub fn unzip(archive: &Path, dest_dir: &Path) -> Result<(), ArchiveError> {
    let file = File::open(archive)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;
    archive.extract(dest_dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{write_tree, zip_entry_names};

    #[test]
    fn zip_then_unzip_keeps_layout() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        write_tree(&src, &[("index.js", "main"), ("api/handler.js", "api")]);

        let archive = dir.path().join("bundle.zip");
        zip_dir(&src, &archive).unwrap();

        let bytes = std::fs::read(&archive).unwrap();
        assert_eq!(
            zip_entry_names(&bytes),
            vec!["api/", "api/handler.js", "index.js"]
        );

        let out = dir.path().join("out");
        unzip(&archive, &out).unwrap();
        assert_eq!(
            std::fs::read_to_string(out.join("api/handler.js")).unwrap(),
            "api"
        );
    }

    #[test]
    fn files_are_not_marked_executable() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        write_tree(&src, &[("lib/util.js", "util")]);

        let archive_path = dir.path().join("bundle.zip");
        zip_dir(&src, &archive_path).unwrap();

        let mut archive = ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
        let file_mode = archive.by_name("lib/util.js").unwrap().unix_mode().unwrap();
        let dir_mode = archive.by_name("lib/").unwrap().unix_mode().unwrap();

        assert_eq!(file_mode & 0o777, FILE_MODE);
        assert_eq!(dir_mode & 0o777, DIR_MODE);
    }

    #[test]
    fn zip_of_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = zip_dir(&dir.path().join("missing"), &dir.path().join("a.zip"));
        assert!(matches!(result, Err(ArchiveError::NotADirectory(_))));
    }
}
