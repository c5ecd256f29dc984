use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use super::{assert_self_contained, file_names, read_playlist, server_mirror, HlsMock};
use crate::AssertWrapper;

#[tokio::test]
async fn byte_range_segments_share_one_file() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let output = tempfile::tempdir()?;

    server
        .mock(
            "/media.m3u8",
            include_str!("../fixtures/hls/media-playlist-with-byterange.m3u8"),
        )
        .await
        .mock_segment("/video.ts", b"whole video")
        .await;

    server_mirror(&server, output.path())
        .mirror("media.m3u8")
        .await
        .assert_success();

    let dir = output.path();
    assert_eq!(file_names(dir), ["media.m3u8", "video.ts"]);

    let media = read_playlist(dir, "media.m3u8");
    assert_eq!(media.matches("\nvideo.ts").count(), 3);
    assert!(media.contains("#EXT-X-BYTERANGE:75232@0"));
    assert!(media.contains("#EXT-X-BYTERANGE:82112@752321"));
    assert!(media.contains("#EXT-X-BYTERANGE:69864"));

    assert_self_contained(dir);
    Ok(())
}

#[tokio::test]
async fn partial_response_is_stored_under_range_name() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let output = tempfile::tempdir()?;

    server.mock_playlist("/720p.m3u8", "seg0.ts").await;
    Mock::given(method("GET"))
        .and(path("/seg0.ts"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("Content-Range", "bytes 0-99/1000")
                .set_body_bytes(vec![0u8; 100]),
        )
        .expect(1)
        .mount(&server)
        .await;

    server_mirror(&server, output.path())
        .mirror("720p.m3u8")
        .await
        .assert_success();

    let dir = output.path();
    assert_eq!(file_names(dir), ["720p.m3u8", "ranged-0-99-seg0.ts"]);
    assert_eq!(std::fs::read(dir.join("ranged-0-99-seg0.ts"))?.len(), 100);
    assert!(read_playlist(dir, "720p.m3u8").contains("\nranged-0-99-seg0.ts"));

    assert_self_contained(dir);
    Ok(())
}
