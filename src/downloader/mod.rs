use crate::models::QgenModel;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Downloads and extracts a model archive unless the completion marker is
/// already present. Repeated invocation performs no redundant network calls.
///
/// The sequence mirrors a fresh install: download the `.tgz` (skipped when a
/// previous run left one behind), extract it into the model directory, then
/// delete the archive.
pub async fn ensure_downloaded(model: QgenModel, base_dir: &Path) -> crate::Result<()> {
    if model.is_downloaded(base_dir) {
        log::info!(
            "Skipping {} as this model is already downloaded.",
            model.cli_name()
        );
        return Ok(());
    }

    tokio::fs::create_dir_all(base_dir).await?;
    let archive_path = base_dir.join(model.archive_filename());

    if archive_path.exists() {
        log::info!(
            "Skipping download. The file {} already exists.",
            archive_path.display()
        );
    } else {
        download_archive(model.archive_url(), &archive_path).await?;
    }

    let model_dir = model.model_dir(base_dir);
    log::info!(
        "Extracting {} to {}",
        model.archive_filename(),
        model_dir.display()
    );
    extract_archive(&archive_path, &model_dir)?;

    log::info!("Deleting {}", archive_path.display());
    tokio::fs::remove_file(&archive_path).await?;

    log::info!("Processing {} complete", model.archive_filename());
    Ok(())
}

/// Streams `url` to `dest` with a byte progress bar sized from the
/// content-length header.
pub async fn download_archive(url: &str, dest: &Path) -> crate::Result<()> {
    log::info!("Downloading {} from {}", dest.display(), url);
    let response = reqwest::get(url).await?;
    if !response.status().is_success() {
        crate::bail!("Failed to download {}: HTTP {}", url, response.status());
    }

    let total = response.content_length().unwrap_or(0);
    let bar = ProgressBar::new(total);
    bar.set_style(ProgressStyle::with_template(
        "{bar:40} {bytes}/{total_bytes} {bytes_per_sec} eta {eta}",
    )?);

    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        bar.inc(chunk.len() as u64);
    }
    file.flush().await?;
    bar.finish_and_clear();
    Ok(())
}

/// Extracts a gzipped tar archive into `dest`, flattening member paths to
/// their basename and keeping only members that carry a file extension
/// (directory members carry none).
///
/// Any member whose path would resolve outside `dest` aborts extraction.
pub fn extract_archive(archive_path: &Path, dest: &Path) -> crate::Result<()> {
    std::fs::create_dir_all(dest)?;
    let file = std::fs::File::open(archive_path)?;
    let gz = flate2::read::GzDecoder::new(file);
    let mut archive = tar::Archive::new(gz);

    for entry in archive.entries()? {
        let mut entry = entry?;
        let member_path = entry.path()?.into_owned();

        if !is_within_directory(dest, &dest.join(&member_path)) {
            crate::bail!(
                "Attempted path traversal in tar file: {}",
                member_path.display()
            );
        }
        if member_path.extension().is_none() {
            continue;
        }
        let file_name = match member_path.file_name() {
            Some(file_name) => file_name.to_owned(),
            None => continue,
        };
        entry.unpack(dest.join(file_name))?;
    }
    Ok(())
}

/// Lexical containment check: `target` must stay inside `directory` after
/// resolving `.` and `..` components. No filesystem access, so it also
/// covers paths that do not exist yet.
pub fn is_within_directory(directory: &Path, target: &Path) -> bool {
    let directory = match resolve_lexical(directory) {
        Some(directory) => directory,
        None => return false,
    };
    match resolve_lexical(target) {
        Some(target) => target.starts_with(&directory),
        None => false,
    }
}

fn resolve_lexical(path: &Path) -> Option<PathBuf> {
    let mut resolved = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Popping past the start escapes whatever root the caller had.
                if !resolved.pop() {
                    return None;
                }
            }
            other => resolved.push(other),
        }
    }
    Some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QgenModel, CHECKPOINT_FILENAME};
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn build_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let gz = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(gz);
        for (path, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            builder.append_data(&mut header, path, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    // tar::Builder refuses to write `..` components, so the traversal member
    // is written into the raw gnu header instead.
    fn build_traversal_archive() -> Vec<u8> {
        let gz = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(gz);

        let name = b"../evil.txt";
        let mut header = tar::Header::new_gnu();
        header.as_gnu_mut().unwrap().name[..name.len()].copy_from_slice(name);
        header.set_size(4);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, &b"boom"[..]).unwrap();

        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn containment_accepts_nested_paths() {
        let dir = Path::new("models/generator_qa_squad");
        assert!(is_within_directory(dir, &dir.join("checkpoint_best.pt")));
        assert!(is_within_directory(dir, &dir.join("sub/tokenizer.json")));
        assert!(is_within_directory(dir, &dir.join("a/../tokenizer.json")));
    }

    #[test]
    fn containment_rejects_traversal() {
        let dir = Path::new("models/generator_qa_squad");
        assert!(!is_within_directory(dir, &dir.join("../evil.txt")));
        assert!(!is_within_directory(dir, &dir.join("a/../../../evil.txt")));
        assert!(!is_within_directory(dir, Path::new("/etc/passwd")));
        assert!(!is_within_directory(dir, Path::new("models/evil.txt")));
    }

    #[test]
    fn extraction_flattens_member_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let archive_path = tmp.path().join("model.tgz");
        let bytes = build_archive(&[
            ("release/checkpoint_best.pt", &b"weights"[..]),
            ("release/sub/tokenizer.json", &b"{}"[..]),
        ]);
        std::fs::write(&archive_path, bytes).unwrap();

        let dest = tmp.path().join("out");
        extract_archive(&archive_path, &dest).unwrap();

        assert_eq!(
            std::fs::read(dest.join("checkpoint_best.pt")).unwrap(),
            b"weights"
        );
        assert_eq!(std::fs::read(dest.join("tokenizer.json")).unwrap(), b"{}");
        assert!(!dest.join("release").exists());
    }

    #[test]
    fn extraction_skips_directory_members() {
        let gz = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(gz);
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Directory);
        header.set_size(0);
        header.set_mode(0o755);
        builder
            .append_data(&mut header, "release", std::io::empty())
            .unwrap();
        let bytes = builder.into_inner().unwrap().finish().unwrap();

        let tmp = tempfile::tempdir().unwrap();
        let archive_path = tmp.path().join("model.tgz");
        std::fs::write(&archive_path, bytes).unwrap();

        let dest = tmp.path().join("out");
        extract_archive(&archive_path, &dest).unwrap();
        assert!(!dest.join("release").exists());
    }

    #[test]
    fn extraction_rejects_traversal_member() {
        let tmp = tempfile::tempdir().unwrap();
        let archive_path = tmp.path().join("model.tgz");
        std::fs::write(&archive_path, build_traversal_archive()).unwrap();

        let dest = tmp.path().join("out");
        let err = extract_archive(&archive_path, &dest).unwrap_err();
        assert!(err.to_string().contains("path traversal"));
        assert!(!tmp.path().join("evil.txt").exists());
    }

    #[tokio::test]
    async fn ensure_downloaded_skips_when_marker_present() {
        let tmp = tempfile::tempdir().unwrap();
        let model = QgenModel::Squad;
        std::fs::create_dir_all(model.model_dir(tmp.path())).unwrap();
        std::fs::write(model.checkpoint_path(tmp.path()), b"weights").unwrap();

        // Must return without touching the network.
        ensure_downloaded(model, tmp.path()).await.unwrap();
        assert!(model.is_downloaded(tmp.path()));
    }

    #[tokio::test]
    async fn ensure_downloaded_extracts_existing_archive_and_deletes_it() {
        let tmp = tempfile::tempdir().unwrap();
        let model = QgenModel::AdversarialQa;
        let archive_path = tmp.path().join(model.archive_filename());
        let member = format!("release/{CHECKPOINT_FILENAME}");
        let bytes = build_archive(&[(member.as_str(), &b"weights"[..])]);
        std::fs::write(&archive_path, bytes).unwrap();

        ensure_downloaded(model, tmp.path()).await.unwrap();

        assert!(model.is_downloaded(tmp.path()));
        assert!(!archive_path.exists());
    }
}
