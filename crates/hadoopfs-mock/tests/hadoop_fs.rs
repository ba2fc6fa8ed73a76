//! HadoopFs and MultiFs driven end to end through the mock client.

use std::io::Write;
use std::sync::Arc;

use hadoopfs_core::{DirEntry, EntryKind, Filesystem, FsError, FsResult, LineStream};
use hadoopfs_mock::MockHadoop;
use rstest::{fixture, rstest};

#[fixture]
fn mock() -> Arc<MockHadoop> {
    Arc::new(MockHadoop::new().unwrap())
}

fn lines(stream: LineStream) -> Vec<String> {
    stream
        .map(|l| l.map(|b| String::from_utf8(b).unwrap()))
        .collect::<FsResult<_>>()
        .unwrap()
}

#[rstest]
#[tokio::test]
async fn ls_empty(mock: Arc<MockHadoop>) {
    let fs = mock.multi_fs();
    assert!(fs.list("hdfs:///").await.unwrap().uris().unwrap().is_empty());
}

#[rstest]
#[tokio::test]
async fn ls_empty_twice_gives_same_result(mock: Arc<MockHadoop>) {
    let fs = mock.multi_fs();
    let first = fs.list("hdfs:///").await.unwrap().uris().unwrap();
    let second = fs.list("hdfs:///").await.unwrap().uris().unwrap();
    assert_eq!(first, second);
}

#[rstest]
#[tokio::test]
async fn ls_basic(mock: Arc<MockHadoop>) {
    mock.make_file("f", "contents").unwrap();
    let fs = mock.multi_fs();
    assert_eq!(fs.list("hdfs:///").await.unwrap().uris().unwrap(), vec!["hdfs:///f"]);
}

#[rstest]
#[tokio::test]
async fn ls_basic_2(mock: Arc<MockHadoop>) {
    mock.make_file("f", "contents").unwrap();
    mock.make_file("f2", "contents").unwrap();
    let fs = mock.multi_fs();
    assert_eq!(
        fs.list("hdfs:///").await.unwrap().uris().unwrap(),
        vec!["hdfs:///f", "hdfs:///f2"]
    );
}

#[rstest]
#[tokio::test]
async fn ls_recurse(mock: Arc<MockHadoop>) {
    mock.make_file("f", "contents").unwrap();
    mock.make_file("d/f2", "contents").unwrap();
    let fs = mock.multi_fs();

    let entries: Vec<DirEntry> = fs
        .list("hdfs:///")
        .await
        .unwrap()
        .collect::<FsResult<_>>()
        .unwrap();
    assert_eq!(
        entries,
        vec![
            DirEntry::file("hdfs:///f", 8),
            DirEntry::file("hdfs:///d/f2", 8),
        ]
    );
    assert!(entries.iter().all(|e| e.kind == EntryKind::File));
}

#[rstest]
#[tokio::test]
async fn ls_keeps_authority(mock: Arc<MockHadoop>) {
    mock.make_file("data/part-00000", "x").unwrap();
    let fs = mock.multi_fs();
    assert_eq!(
        fs.list("hdfs://namenode:8020/data").await.unwrap().uris().unwrap(),
        vec!["hdfs://namenode:8020/data/part-00000"]
    );
}

#[rstest]
#[tokio::test]
async fn ls_glob(mock: Arc<MockHadoop>) {
    mock.make_file("logs/a.log", "1").unwrap();
    mock.make_file("logs/b.txt", "2").unwrap();
    mock.make_file("logs/c.log", "3").unwrap();
    let fs = mock.multi_fs();
    assert_eq!(
        fs.list("hdfs:///logs/*.log").await.unwrap().uris().unwrap(),
        vec!["hdfs:///logs/a.log", "hdfs:///logs/c.log"]
    );
}

#[rstest]
#[tokio::test]
async fn ls_missing(mock: Arc<MockHadoop>) {
    let err = mock.multi_fs().list("hdfs:///nope").await.unwrap_err();
    assert!(matches!(err, FsError::PathNotFound(p) if p == "hdfs:///nope"));
}

#[rstest]
#[tokio::test]
async fn listing_is_single_pass(mock: Arc<MockHadoop>) {
    mock.make_file("f", "x").unwrap();
    let mut listing = mock.multi_fs().list("hdfs:///").await.unwrap();
    assert!(listing.next_entry().unwrap().is_some());
    assert!(listing.next_entry().unwrap().is_none());
    assert!(matches!(listing.next_entry(), Err(FsError::StreamClosed)));
}

#[rstest]
#[tokio::test]
async fn cat_uncompressed(mock: Arc<MockHadoop>) {
    mock.make_file("data/foo", "foo\nfoo\n").unwrap();
    let fs = mock.multi_fs();
    let uri = fs.join("hdfs:///data", "foo");
    assert_eq!(uri, "hdfs:///data/foo");
    assert_eq!(lines(fs.cat(&uri).await.unwrap()), vec!["foo\n", "foo\n"]);
}

#[rstest]
#[tokio::test]
async fn cat_gz(mock: Arc<MockHadoop>) {
    let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    enc.write_all(b"foo\nbar\n").unwrap();
    mock.make_file("data/foo.gz", enc.finish().unwrap()).unwrap();

    let fs = mock.multi_fs();
    assert_eq!(
        lines(fs.cat("hdfs:///data/foo.gz").await.unwrap()),
        vec!["foo\n", "bar\n"]
    );
}

#[rstest]
#[tokio::test]
async fn cat_bz2(mock: Arc<MockHadoop>) {
    let mut enc = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    enc.write_all(b"foo\nfoo\n").unwrap();
    mock.make_file("data/foo.bz2", enc.finish().unwrap()).unwrap();

    let fs = mock.multi_fs();
    assert_eq!(
        lines(fs.cat("hdfs:///data/foo.bz2").await.unwrap()),
        vec!["foo\n", "foo\n"]
    );
}

#[rstest]
#[tokio::test]
async fn cat_missing(mock: Arc<MockHadoop>) {
    let err = mock.multi_fs().cat("hdfs:///data/nope").await.unwrap_err();
    assert!(err.is_not_found());
}

#[rstest]
#[tokio::test]
async fn cat_directory_fails_up_front(mock: Arc<MockHadoop>) {
    mock.make_file("dir/f", "x").unwrap();
    match mock.multi_fs().read("hdfs:///dir").await {
        Err(FsError::BackendCommand { status, stderr, .. }) => {
            assert_eq!(status, 1);
            assert!(stderr.contains("Is a directory"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[rstest]
#[tokio::test]
async fn local_directory_read_fails_up_front(mock: Arc<MockHadoop>) {
    let local = tempfile::tempdir().unwrap();
    let err = mock
        .multi_fs()
        .read(&local.path().to_string_lossy())
        .await
        .unwrap_err();
    assert!(matches!(err, FsError::Io(e) if e.kind() == std::io::ErrorKind::IsADirectory));
}

#[rstest]
#[tokio::test]
async fn read_streams_raw_bytes(mock: Arc<MockHadoop>) {
    mock.make_file("blob", [0u8, 159, 146, 150]).unwrap();
    let data = mock
        .multi_fs()
        .read("hdfs:///blob")
        .await
        .unwrap()
        .read_to_vec()
        .unwrap();
    assert_eq!(data, vec![0u8, 159, 146, 150]);
}

#[rstest]
#[tokio::test]
async fn du(mock: Arc<MockHadoop>) {
    mock.make_file("data1", "abcd").unwrap();
    mock.make_file("more/data2", "defg").unwrap();
    mock.make_file("more/data3", "hijk").unwrap();
    let fs = mock.multi_fs();

    assert_eq!(fs.disk_usage("hdfs:///").await.unwrap(), 12);
    assert_eq!(fs.disk_usage("hdfs:///data1").await.unwrap(), 4);
    assert_eq!(fs.disk_usage("hdfs:///more").await.unwrap(), 8);
    assert_eq!(fs.disk_usage("hdfs:///more/*").await.unwrap(), 8);
    assert_eq!(fs.disk_usage("hdfs:///more/data2").await.unwrap(), 4);
    assert_eq!(fs.disk_usage("hdfs:///more/data3").await.unwrap(), 4);
}

#[rstest]
#[tokio::test]
async fn du_missing(mock: Arc<MockHadoop>) {
    let err = mock.multi_fs().disk_usage("hdfs:///nope").await.unwrap_err();
    assert!(err.is_not_found());
}

#[rstest]
#[tokio::test]
async fn mkdir(mock: Arc<MockHadoop>) {
    let fs = mock.multi_fs();
    fs.make_directory("hdfs:///d/e").await.unwrap();
    assert!(mock.real_path("d/e").is_dir());
}

#[rstest]
#[tokio::test]
async fn mkdir_is_idempotent(mock: Arc<MockHadoop>) {
    mock.make_file("d/keep", "x").unwrap();
    let fs = mock.multi_fs();
    fs.make_directory("hdfs:///d").await.unwrap();
    fs.make_directory("hdfs:///d").await.unwrap();
    assert_eq!(fs.list("hdfs:///").await.unwrap().uris().unwrap(), vec!["hdfs:///d/keep"]);
}

#[rstest]
#[tokio::test]
async fn mkdir_over_file_fails(mock: Arc<MockHadoop>) {
    mock.make_file("f", "contents").unwrap();
    let fs = mock.multi_fs();

    match fs.make_directory("hdfs:///f").await {
        Err(FsError::BackendCommand { status, stderr, .. }) => {
            assert_eq!(status, 1);
            assert!(stderr.contains("Is not a directory"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(fs.make_directory("hdfs:///f/sub").await.is_err());
    assert!(mock.real_path("f").is_file());
}

#[rstest]
#[tokio::test]
async fn rm(mock: Arc<MockHadoop>) {
    mock.make_file("f", "contents").unwrap();
    mock.make_file("d/f2", "contents").unwrap();
    let fs = mock.multi_fs();

    fs.remove("hdfs:///f").await.unwrap();
    fs.remove("hdfs:///d").await.unwrap();
    assert!(!fs.exists("hdfs:///f").await.unwrap());
    assert!(!fs.exists("hdfs:///d").await.unwrap());
    assert!(fs.list("hdfs:///").await.unwrap().uris().unwrap().is_empty());
}

#[rstest]
#[tokio::test]
async fn rm_missing(mock: Arc<MockHadoop>) {
    let err = mock.multi_fs().remove("hdfs:///nope").await.unwrap_err();
    assert!(matches!(err, FsError::PathNotFound(p) if p == "hdfs:///nope"));
}

#[rstest]
#[tokio::test]
async fn touchz(mock: Arc<MockHadoop>) {
    let fs = mock.multi_fs();
    fs.touch("hdfs:///empty").await.unwrap();
    assert_eq!(std::fs::read(mock.real_path("empty")).unwrap(), b"");
    assert_eq!(fs.disk_usage("hdfs:///empty").await.unwrap(), 0);
}

#[rstest]
#[tokio::test]
async fn touchz_existing_keeps_contents(mock: Arc<MockHadoop>) {
    mock.make_file("f", "contents").unwrap();
    mock.multi_fs().touch("hdfs:///f").await.unwrap();
    assert_eq!(std::fs::read(mock.real_path("f")).unwrap(), b"contents");
}

#[rstest]
#[tokio::test]
async fn touchz_missing_parent(mock: Arc<MockHadoop>) {
    let err = mock.multi_fs().touch("hdfs:///no/such/f").await.unwrap_err();
    assert!(err.is_not_found());
}

#[rstest]
#[tokio::test]
async fn exists(mock: Arc<MockHadoop>) {
    mock.make_file("f", "x").unwrap();
    let fs = mock.multi_fs();
    assert!(fs.exists("hdfs:///f").await.unwrap());
    assert!(fs.exists("hdfs:///").await.unwrap());
    assert!(!fs.exists("hdfs:///g").await.unwrap());
}

#[rstest]
#[tokio::test]
async fn relative_paths_live_under_user_home(mock: Arc<MockHadoop>) {
    let hadoop = mock.hadoop_fs();
    hadoop.make_directory("data").await.unwrap();
    hadoop.touch("data/x").await.unwrap();

    let home = format!("user/{}/data/x", mock.user());
    assert!(mock.real_path(&home).is_file());
    assert!(hadoop.exists("data/x").await.unwrap());
}

#[rstest]
#[tokio::test]
async fn invocation_log(mock: Arc<MockHadoop>) {
    mock.make_file("f", "contents").unwrap();
    let fs = mock.multi_fs();
    fs.list("hdfs:///").await.unwrap();
    fs.disk_usage("hdfs:///f").await.unwrap();
    let _ = fs.remove("hdfs:///nope").await;

    assert_eq!(
        mock.command_log(),
        vec![
            vec!["hadoop", "fs", "-ls", "-R", "hdfs:///"],
            vec!["hadoop", "fs", "-du", "-s", "hdfs:///f"],
            vec!["hadoop", "fs", "-rm", "-R", "hdfs:///nope"],
        ]
    );

    let calls = mock.invocations();
    assert_eq!(calls[1].stdout, b"8\t/f\n");
    assert_eq!(calls[2].status, 1);
    assert!(calls[2].stderr.contains("No such file or directory"));
    assert_eq!(calls[0].env.get("USER").map(String::as_str), Some(mock.user()));

    mock.clear_log();
    assert!(mock.command_log().is_empty());
}

#[rstest]
#[tokio::test]
async fn env_overlay_reaches_client(mock: Arc<MockHadoop>) {
    let hadoop = mock.hadoop_fs().with_env([("USER", "someone_else")]);
    hadoop.make_directory("x").await.unwrap();
    assert!(mock.real_path("user/someone_else/x").is_dir());
}

#[rstest]
#[tokio::test]
async fn unknown_scheme_is_rejected(mock: Arc<MockHadoop>) {
    let err = mock.multi_fs().list("s3://bucket/x").await.unwrap_err();
    assert!(matches!(err, FsError::UnsupportedScheme(_)));
    assert!(mock.command_log().is_empty());
}

#[rstest]
#[tokio::test]
async fn local_and_cluster_side_by_side(mock: Arc<MockHadoop>) {
    let local = tempfile::tempdir().unwrap();
    let path = local.path().join("local.txt");
    std::fs::write(&path, "here\n").unwrap();
    mock.make_file("remote.txt", "there\n").unwrap();

    let fs = mock.multi_fs();
    assert_eq!(lines(fs.cat(&path.to_string_lossy()).await.unwrap()), vec!["here\n"]);
    assert_eq!(lines(fs.cat("hdfs:///remote.txt").await.unwrap()), vec!["there\n"]);
    assert_eq!(mock.command_log().len(), 1);
}

#[cfg(unix)]
#[rstest]
#[tokio::test]
async fn mock_failure_propagates(mock: Arc<MockHadoop>) {
    // Dangling symlink: listed as a file, but its metadata can't be read.
    let root = mock.hdfs_root();
    std::os::unix::fs::symlink(root.join("gone"), root.join("dangling")).unwrap();

    let err = mock.multi_fs().list("hdfs:///").await.unwrap_err();
    assert!(matches!(err, FsError::Io(_)));
}
