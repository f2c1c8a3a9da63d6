use std::fs::{self, File};
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use flate2::read::GzDecoder;

use super::ArchiveKind;
use super::github::{USER_AGENT, agent};
use crate::error::{Error, Result};

const MAX_ARCHIVE_BYTES: u64 = 1024 * 1024 * 1024;

/// Download `url` and unpack it into `dest`.
///
/// Tarballs are decompressed while streaming; zip archives need random
/// access and are buffered in memory first.
pub(super) fn download_and_extract(url: &str, kind: ArchiveKind, dest: &Path) -> Result<()> {
    let response = agent()
        .get(url)
        .set("User-Agent", USER_AGENT)
        .call()
        .map_err(|err| Error::Http(format!("Failed to download {url}: {err}")))?;
    let mut reader = response.into_reader().take(MAX_ARCHIVE_BYTES);
    match kind {
        ArchiveKind::TarGz => extract_tar_gz(reader, dest),
        ArchiveKind::Zip => {
            let mut bytes = Vec::new();
            reader.read_to_end(&mut bytes)?;
            extract_zip(Cursor::new(bytes), dest)
        }
    }
}

/// Unpack a gzip-compressed tarball.
pub(super) fn extract_tar_gz<R: Read>(reader: R, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    archive
        .unpack(dest)
        .map_err(|err| Error::Archive(err.to_string()))
}

/// Unpack a zip archive. Entries whose names would land outside `dest` are
/// skipped.
pub(super) fn extract_zip<R: Read + Seek>(reader: R, dest: &Path) -> Result<()> {
    let mut archive = zip::ZipArchive::new(reader).map_err(|err| Error::Archive(err.to_string()))?;
    fs::create_dir_all(dest)?;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| Error::Archive(err.to_string()))?;
        let Some(relative) = entry.enclosed_name() else {
            continue;
        };
        let outpath = dest.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&outpath)?;
            continue;
        }
        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&outpath)?;
        std::io::copy(&mut entry, &mut outfile)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                let mode = if mode & 0o111 != 0 { 0o755 } else { 0o644 };
                fs::set_permissions(&outpath, fs::Permissions::from_mode(mode))?;
            }
        }
    }
    Ok(())
}
