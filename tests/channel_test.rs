//! Channel lifecycle under release and recreation at the same path.

use std::fs;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use envmirror::{ContentChannel, EnvRenderer, release_channel};

async fn read_pipe(path: &Path) -> Vec<u8> {
    let path = path.to_path_buf();
    tokio::time::timeout(
        Duration::from_secs(5),
        tokio::task::spawn_blocking(move || fs::read(path).unwrap()),
    )
    .await
    .expect("reading the mirrored file timed out")
    .unwrap()
}

async fn join_within(handle: tokio::task::JoinHandle<()>, what: &str) {
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap_or_else(|_| panic!("{what} did not exit"))
        .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn released_channel_never_adopts_a_replacement_pipe() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let conf = src.path().join("v.conf");
    fs::write(&conf, "v").unwrap();
    let pipe = dest.path().join("v.conf");

    let renderer = Arc::new(EnvRenderer::new());
    let first = ContentChannel::create(&conf, &pipe, dest.path(), renderer.clone())
        .unwrap()
        .spawn();

    release_channel(&pipe);

    // A successor channel reuses the name immediately. The released task
    // must exit rather than park on the new pipe.
    let second = ContentChannel::create(&conf, &pipe, dest.path(), renderer)
        .unwrap()
        .spawn();
    join_within(first, "released channel task").await;

    // The successor owns the name: exactly one serve per read, and the pipe
    // survives the predecessor's teardown.
    assert_eq!(read_pipe(&pipe).await, b"v");
    assert!(fs::symlink_metadata(&pipe).unwrap().file_type().is_fifo());

    release_channel(&pipe);
    join_within(second, "successor channel task").await;
    assert!(fs::symlink_metadata(&pipe).is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn released_channel_exits_and_unlinks_nothing_twice() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let conf = src.path().join("k.conf");
    fs::write(&conf, "k").unwrap();
    let pipe = dest.path().join("k.conf");

    let handle = ContentChannel::create(&conf, &pipe, dest.path(), Arc::new(EnvRenderer::new()))
        .unwrap()
        .spawn();

    release_channel(&pipe);
    join_within(handle, "released channel task").await;
    assert!(fs::symlink_metadata(&pipe).is_err());

    // Releasing an already-removed pipe is a no-op.
    release_channel(&pipe);
}
