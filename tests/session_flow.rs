// End to end: load -> compress on the worker -> save
use greedy_compress::prelude::*;
use std::sync::mpsc;

fn write_fixture(dir: &std::path::Path) -> std::path::PathBuf {
    let rows = vec![
        vec![[10, 200, 5], [50, 150, 0]],
        vec![[255, 99, 100], [100, 100, 100]],
    ];
    let path = dir.join("input.png");
    save(&PixelBuffer::from_rows(&rows).unwrap(), &path).unwrap();
    path
}

#[test]
fn load_compress_save() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(dir.path());

    let mut session = Session::default();
    let original = session.select(&input).unwrap();
    assert_eq!(original.shape(), (2, 2, 3));
    session.set_threshold(100);

    let (status_tx, status_rx) = mpsc::channel::<TaskStatusContainer>();
    let (done_tx, done_rx) = mpsc::channel();
    session
        .compress(StatusSink::new(status_tx, "Compressing"), move |r| {
            let _ = done_tx.send(r);
        })
        .unwrap();
    session.wait();

    let outcome = done_rx.recv().unwrap().unwrap();
    assert_eq!(outcome.threshold, Threshold(100));
    assert_eq!(outcome.stats.zeroed_channels, 4);

    let percents: Vec<f64> = status_rx
        .try_iter()
        .filter_map(|c| match c.status {
            Some(TaskStatus::TaskPercentage(_, p)) => Some(p),
            None => None,
        })
        .collect();
    assert_eq!(percents, vec![100.0]);

    // Saved without extension gets .png appended
    let written = session.save_compressed(dir.path().join("result")).unwrap();
    assert_eq!(written, dir.path().join("result.png"));

    let reloaded = load(&written).unwrap();
    let expected = PixelBuffer::from_rows(&[
        vec![[0, 200, 0], [0, 150, 0]],
        vec![[255, 0, 100], [100, 100, 100]],
    ])
    .unwrap();
    assert_eq!(reloaded, expected);
    // The original stays displayable and unchanged
    assert_eq!(session.original().unwrap().get(0, 0), [10, 200, 5]);
}

#[test]
fn jpeg_output_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(dir.path());

    let mut session = Session::default();
    session.select(&input).unwrap();
    session.compress(|_: f64| {}, |_| {}).unwrap();
    session.wait();

    let written = session.save_compressed(dir.path().join("out.jpg")).unwrap();
    assert!(written.exists());
    assert_eq!(load(&written).unwrap().shape(), (2, 2, 3));
}

#[test]
fn unsupported_output_and_cancel_are_encode_errors() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(dir.path());

    let mut session = Session::default();
    session.select(&input).unwrap();
    session.compress(|_: f64| {}, |_| {}).unwrap();
    session.wait();

    assert!(matches!(
        session.save_compressed(dir.path().join("out.gif")),
        Err(AppError::EncodeError(_))
    ));
    assert!(matches!(
        session.save_compressed_opt(None::<&std::path::Path>),
        Err(AppError::EncodeError(_))
    ));
}

#[test]
fn garbage_file_is_a_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.png");
    std::fs::write(&path, b"not an image").unwrap();

    let mut session = Session::default();
    assert!(matches!(session.select(&path), Err(AppError::DecodeError(_))));
    assert!(session.selected_path().is_none());
}
