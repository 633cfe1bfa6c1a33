//! Unpacking of downloaded input archives (zip, tar, tar.gz).

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use flate2::read::GzDecoder;
use tracing::{debug, instrument};

use crate::io::paths::OUTPUT_EXTENSION;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
    Tar,
}

/// Archive format by file name, or `None` if unsupported.
pub fn archive_kind(path: &Path) -> Option<ArchiveKind> {
    let name = path.file_name()?.to_str()?.to_ascii_lowercase();
    if name.ends_with(".zip") {
        Some(ArchiveKind::Zip)
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Some(ArchiveKind::TarGz)
    } else if name.ends_with(".tar") {
        Some(ArchiveKind::Tar)
    } else {
        None
    }
}

/// Extract `archive` into `dest` (created if missing).
#[instrument(skip_all, fields(archive = %archive.display()))]
pub fn unpack_archive(archive: &Path, dest: &Path) -> Result<()> {
    let kind = archive_kind(archive)
        .ok_or_else(|| anyhow!("unsupported archive format {}", archive.display()))?;
    fs::create_dir_all(dest).with_context(|| format!("create {}", dest.display()))?;
    let reader = BufReader::new(
        File::open(archive).with_context(|| format!("open {}", archive.display()))?,
    );
    match kind {
        ArchiveKind::Zip => zip::ZipArchive::new(reader)
            .and_then(|mut zip| zip.extract(dest))
            .with_context(|| format!("unpack {}", archive.display()))?,
        ArchiveKind::TarGz => tar::Archive::new(GzDecoder::new(reader))
            .unpack(dest)
            .with_context(|| format!("unpack {}", archive.display()))?,
        ArchiveKind::Tar => tar::Archive::new(reader)
            .unpack(dest)
            .with_context(|| format!("unpack {}", archive.display()))?,
    }
    debug!(dest = %dest.display(), kind = ?kind, "archive unpacked");
    Ok(())
}

/// Move `*.out` files shipped inside the input archive to the output directory.
pub fn relocate_outputs(input_dir: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir).with_context(|| format!("create {}", output_dir.display()))?;
    let mut moved = Vec::new();
    for entry in fs::read_dir(input_dir).with_context(|| format!("read {}", input_dir.display()))? {
        let path = entry.context("read input entry")?.path();
        if !path.is_file() || path.extension().is_none_or(|ext| ext != OUTPUT_EXTENSION) {
            continue;
        }
        let Some(name) = path.file_name() else {
            continue;
        };
        let target = output_dir.join(name);
        fs::rename(&path, &target)
            .with_context(|| format!("move {} to {}", path.display(), target.display()))?;
        moved.push(target);
    }
    moved.sort();
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_zip;

    #[test]
    fn archive_kind_by_extension() {
        assert_eq!(archive_kind(Path::new("level1.zip")), Some(ArchiveKind::Zip));
        assert_eq!(archive_kind(Path::new("LEVEL1.ZIP")), Some(ArchiveKind::Zip));
        assert_eq!(archive_kind(Path::new("in.tar.gz")), Some(ArchiveKind::TarGz));
        assert_eq!(archive_kind(Path::new("in.tgz")), Some(ArchiveKind::TarGz));
        assert_eq!(archive_kind(Path::new("in.tar")), Some(ArchiveKind::Tar));
        assert_eq!(archive_kind(Path::new("level1.pdf")), None);
    }

    #[test]
    fn unsupported_archive_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = unpack_archive(&temp.path().join("level1.rar"), temp.path()).expect_err("rar");
        assert!(err.to_string().contains("unsupported archive format"));
    }

    #[test]
    fn zip_inputs_are_extracted() {
        let temp = tempfile::tempdir().expect("tempdir");
        let archive = temp.path().join("level1.zip");
        write_zip(
            &archive,
            &[("level1_1.in", "1 2 3\n"), ("level1_example.out", "6\n")],
        )
        .expect("zip");
        let dest = temp.path().join("in");

        unpack_archive(&archive, &dest).expect("unpack");

        assert_eq!(
            fs::read_to_string(dest.join("level1_1.in")).expect("read"),
            "1 2 3\n"
        );
        assert!(dest.join("level1_example.out").is_file());
    }

    #[test]
    fn tar_gz_inputs_are_extracted() {
        let temp = tempfile::tempdir().expect("tempdir");
        let archive = temp.path().join("level2.tar.gz");
        let encoder = flate2::write::GzEncoder::new(
            File::create(&archive).expect("create"),
            flate2::Compression::fast(),
        );
        let mut builder = tar::Builder::new(encoder);
        let contents = b"4\n";
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, "level2_1.in", &contents[..]).expect("append");
        builder.into_inner().expect("tar").finish().expect("gzip");
        let dest = temp.path().join("in");

        unpack_archive(&archive, &dest).expect("unpack");

        assert_eq!(
            fs::read_to_string(dest.join("level2_1.in")).expect("read"),
            "4\n"
        );
    }

    #[test]
    fn corrupt_zip_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let archive = temp.path().join("level1.zip");
        fs::write(&archive, "not a zip").expect("write");
        let err = unpack_archive(&archive, &temp.path().join("in")).expect_err("corrupt");
        assert!(err.to_string().contains("unpack"));
    }

    #[test]
    fn relocate_moves_only_out_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        let input_dir = temp.path().join("in");
        let output_dir = temp.path().join("out");
        fs::create_dir_all(&input_dir).expect("mkdir");
        for name in ["level1_example.out", "level1_example.in", "level1_1.in"] {
            fs::write(input_dir.join(name), "x").expect("write");
        }
        let moved = relocate_outputs(&input_dir, &output_dir).expect("relocate");
        assert_eq!(moved, vec![output_dir.join("level1_example.out")]);
        assert!(input_dir.join("level1_example.in").exists());
        assert!(!input_dir.join("level1_example.out").exists());
    }
}
