use std::fs;

use hls_mirror::{ErrorKind, HttpClient, MirrorOptions, PlaylistMirror};
use url::Url;

use super::{assert_self_contained, file_names, read_playlist};
use crate::AssertWrapper;

fn local_mirror(source: &std::path::Path, output: &std::path::Path) -> PlaylistMirror<HttpClient> {
    let base = Url::from_directory_path(source).unwrap();
    PlaylistMirror::new(
        HttpClient::default(),
        base,
        MirrorOptions::default().with_output_dir(output),
    )
}

#[tokio::test]
async fn mirror_local_tree() -> anyhow::Result<()> {
    let source = tempfile::tempdir()?;
    let output = tempfile::tempdir()?;
    let output_dir = output.path().join("mirror");

    fs::create_dir(source.path().join("video"))?;
    fs::write(
        source.path().join("master.m3u8"),
        "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=1280000
video/360p.m3u8
",
    )?;
    fs::write(
        source.path().join("video/360p.m3u8"),
        "#EXTM3U
#EXT-X-TARGETDURATION:6
#EXT-X-MAP:URI=\"init.mp4\"
#EXTINF:6.0,
seg0.m4s
#EXTINF:6.0,
seg1.m4s
#EXT-X-ENDLIST
",
    )?;
    fs::write(source.path().join("video/init.mp4"), b"init")?;
    fs::write(source.path().join("video/seg0.m4s"), b"seg0")?;
    fs::write(source.path().join("video/seg1.m4s"), b"seg1")?;

    local_mirror(source.path(), &output_dir)
        .mirror("master.m3u8")
        .await
        .assert_success();

    assert_eq!(
        file_names(&output_dir),
        ["360p.m3u8", "init.mp4", "master.m3u8", "seg0.m4s", "seg1.m4s"]
    );
    assert!(read_playlist(&output_dir, "master.m3u8").contains("\n360p.m3u8\n"));
    assert!(read_playlist(&output_dir, "360p.m3u8").contains("URI=\"init.mp4\""));
    assert_eq!(fs::read(output_dir.join("seg1.m4s"))?, b"seg1");

    assert_self_contained(&output_dir);
    Ok(())
}

#[tokio::test]
async fn missing_local_segment() -> anyhow::Result<()> {
    let source = tempfile::tempdir()?;
    let output = tempfile::tempdir()?;

    fs::write(
        source.path().join("720p.m3u8"),
        "#EXTM3U
#EXT-X-TARGETDURATION:6
#EXTINF:6.0,
seg0.ts
#EXT-X-ENDLIST
",
    )?;

    let error = local_mirror(source.path(), output.path())
        .mirror("720p.m3u8")
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Fetch);
    assert!(file_names(output.path()).is_empty());
    Ok(())
}
