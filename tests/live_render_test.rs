//! Live rendering semantics: every read reflects the environment at read
//! time, not at mirror creation time.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use envmirror::{CleanupRegistry, EnvRenderer, TreeMirror, paths};

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

fn mirror_file(
    destination: &Path,
    source_file: &Path,
    registry: Arc<CleanupRegistry>,
) -> PathBuf {
    let mirror = TreeMirror::new(
        destination,
        source_file,
        registry,
        Arc::new(EnvRenderer::new()),
    )
    .unwrap();
    mirror.mirror().unwrap();
    paths::mirror_base(destination, source_file)
}

#[tokio::test(flavor = "multi_thread")]
async fn reads_reflect_environment_at_read_time() {
    unsafe { std::env::set_var("ENVMIRROR_IT_PORT", "8080") };

    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let conf = src.path().join("b.conf");
    fs::write(&conf, "PORT=${ENVMIRROR_IT_PORT}\n").unwrap();

    let registry = Arc::new(CleanupRegistry::new());
    let pipe = mirror_file(dest.path(), &conf, registry.clone());

    assert_eq!(read_pipe(&pipe).await, b"PORT=8080\n");

    // No restart, no re-mirror: the next read sees the new value.
    unsafe { std::env::set_var("ENVMIRROR_IT_PORT", "9090") };
    assert_eq!(read_pipe(&pipe).await, b"PORT=9090\n");

    unsafe { std::env::remove_var("ENVMIRROR_IT_PORT") };
    registry.run_all();
}

#[tokio::test(flavor = "multi_thread")]
async fn reads_reflect_source_edits() {
    unsafe { std::env::set_var("ENVMIRROR_IT_HOST", "first.local") };

    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let conf = src.path().join("host.conf");
    fs::write(&conf, "host=$ENVMIRROR_IT_HOST\n").unwrap();

    let registry = Arc::new(CleanupRegistry::new());
    let pipe = mirror_file(dest.path(), &conf, registry.clone());

    assert_eq!(read_pipe(&pipe).await, b"host=first.local\n");

    // The source bytes are re-read on every activation too.
    fs::write(&conf, "address=$ENVMIRROR_IT_HOST\n").unwrap();
    assert_eq!(read_pipe(&pipe).await, b"address=first.local\n");

    unsafe { std::env::remove_var("ENVMIRROR_IT_HOST") };
    registry.run_all();
}

#[tokio::test(flavor = "multi_thread")]
async fn channel_survives_multiple_consumers() {
    unsafe { std::env::set_var("ENVMIRROR_IT_N", "42") };

    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let conf = src.path().join("n.conf");
    fs::write(&conf, "n=${ENVMIRROR_IT_N}").unwrap();

    let registry = Arc::new(CleanupRegistry::new());
    let pipe = mirror_file(dest.path(), &conf, registry.clone());

    for _ in 0..3 {
        assert_eq!(read_pipe(&pipe).await, b"n=42");
    }

    unsafe { std::env::remove_var("ENVMIRROR_IT_N") };
    registry.run_all();
}
