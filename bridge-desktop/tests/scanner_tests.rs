//! Directory scanning against a scratch music folder.

use bridge_desktop::{DirectoryMediaScanner, FileContentResolver, UNKNOWN_ARTIST};
use bridge_traits::{ContentResolver, MediaScanner};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn music_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "bridge-desktop-{}-{}-{}",
        tag,
        std::process::id(),
        nanos
    ));
    std::fs::create_dir_all(dir.join("nested")).unwrap();
    dir
}

fn touch(path: PathBuf) {
    std::fs::write(path, b"not really audio").unwrap();
}

#[tokio::test]
async fn test_scan_filters_and_sorts() {
    let dir = music_dir("scan");
    touch(dir.join("zulu.mp3"));
    touch(dir.join("nested").join("Alpha.flac"));
    touch(dir.join("memo.amr"));
    touch(dir.join("clip.aac"));
    touch(dir.join("cover.jpg"));
    touch(dir.join("notes.txt"));

    let scanner = DirectoryMediaScanner::new(vec![dir.clone()]);
    let found = scanner.scan_device_audio_files().await.unwrap();

    let names: Vec<_> = found.iter().map(|a| a.display_name.as_str()).collect();
    assert_eq!(names, vec!["Alpha.flac", "zulu.mp3"]);

    let alpha = &found[0];
    assert_eq!(alpha.mime_type, "audio/flac");
    assert_eq!(alpha.title, "Alpha");
    assert_eq!(alpha.artist, UNKNOWN_ARTIST);
    assert_eq!(alpha.duration_ms, 0);
    assert!(alpha.id >= 0);

    // The locator resolves back to the file without copying.
    let resolver = FileContentResolver::new();
    let path = resolver.local_path(&alpha.content_uri).unwrap();
    assert!(path.exists());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_ids_are_stable_and_roots_deduplicated() {
    let dir = music_dir("ids");
    touch(dir.join("nested").join("song.ogg"));

    let scanner = DirectoryMediaScanner::new(vec![dir.clone(), dir.join("nested")]);
    let first = scanner.scan_device_audio_files().await.unwrap();
    let second = scanner.scan_device_audio_files().await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(first, second);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_missing_root_is_skipped() {
    let scanner = DirectoryMediaScanner::new(vec![PathBuf::from("/definitely/not/here")]);
    assert!(scanner.scan_device_audio_files().await.unwrap().is_empty());
}
