// Property tests for threshold masking
use greedy_compress::prelude::*;
use proptest::prelude::*;

fn buffer_strategy() -> impl Strategy<Value = PixelBuffer> {
    (0usize..40, 0usize..40).prop_flat_map(|(width, height)| {
        proptest::collection::vec(any::<u8>(), width * height * CHANNELS)
            .prop_map(move |data| PixelBuffer::from_raw(width, height, data).unwrap())
    })
}

fn run(buffer: &PixelBuffer, threshold: u8) -> PixelBuffer {
    compress(buffer, Threshold(threshold), |_: f64| {}).unwrap()
}

proptest! {
    #[test]
    fn shape_is_preserved(buffer in buffer_strategy(), t in any::<u8>()) {
        prop_assert_eq!(run(&buffer, t).shape(), buffer.shape());
    }

    #[test]
    fn every_value_follows_the_rule(buffer in buffer_strategy(), t in any::<u8>()) {
        let output = run(&buffer, t);
        for (v, o) in buffer.as_raw().iter().zip(output.as_raw()) {
            prop_assert_eq!(*o, if *v < t { 0 } else { *v });
        }
    }

    #[test]
    fn idempotent(buffer in buffer_strategy(), t in any::<u8>()) {
        let once = run(&buffer, t);
        prop_assert_eq!(run(&once, t), once);
    }

    #[test]
    fn sequential_thresholds_compose_to_max(buffer in buffer_strategy(), t1 in any::<u8>(), t2 in any::<u8>()) {
        prop_assert_eq!(run(&run(&buffer, t1), t2), run(&buffer, t1.max(t2)));
    }

    #[test]
    fn progress_is_monotonic_and_ends_at_100(width in 1usize..300, height in 1usize..40, t in any::<u8>()) {
        let buffer = PixelBuffer::from_raw(width, height, vec![200; width * height * CHANNELS]).unwrap();
        let mut seen = vec![];
        compress(&buffer, Threshold(t), |p: f64| seen.push(p)).unwrap();

        prop_assert!(!seen.is_empty());
        prop_assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        prop_assert!(seen.iter().all(|p| (0.0..=100.0).contains(p)));
        prop_assert_eq!(*seen.last().unwrap(), 100.0);
        prop_assert_eq!(seen.len(), width * height / CHECKPOINT_PIXELS + 1);
    }
}

#[test]
fn threshold_zero_is_identity() {
    let buffer = PixelBuffer::from_rows(&[vec![[0, 1, 2], [253, 254, 255]]]).unwrap();
    assert_eq!(run(&buffer, 0), buffer);
}

#[test]
fn threshold_255_keeps_only_saturated() {
    let buffer = PixelBuffer::from_rows(&[vec![[0, 254, 255], [255, 128, 255]]]).unwrap();
    let expected = PixelBuffer::from_rows(&[vec![[0, 0, 255], [255, 0, 255]]]).unwrap();
    assert_eq!(run(&buffer, 255), expected);
}

#[test]
fn documented_examples() {
    let one = PixelBuffer::from_rows(&[vec![[10, 200, 5]]]).unwrap();
    assert_eq!(
        run(&one, 100),
        PixelBuffer::from_rows(&[vec![[0, 200, 0]]]).unwrap()
    );

    let two = PixelBuffer::from_rows(&[vec![[50, 150, 0], [255, 99, 100]]]).unwrap();
    assert_eq!(
        run(&two, 100),
        PixelBuffer::from_rows(&[vec![[0, 150, 0], [255, 0, 100]]]).unwrap()
    );
}

#[test]
fn empty_buffer_never_reports() {
    let mut calls = 0;
    let output = compress(&PixelBuffer::empty(0, 0), Threshold(100), |_: f64| calls += 1).unwrap();
    assert_eq!(output.shape(), (0, 0, 3));
    assert_eq!(calls, 0);
}
