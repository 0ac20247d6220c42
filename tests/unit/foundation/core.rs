use super::*;

#[test]
fn fmt_num_trims_trailing_zeros() {
    assert_eq!(fmt_num(2.0), "2");
    assert_eq!(fmt_num(2.5), "2.5");
    assert_eq!(fmt_num(0.1 + 0.2), "0.3");
    assert_eq!(fmt_num(1.23456), "1.235");
    assert_eq!(fmt_num(-0.0001), "0");
    assert_eq!(fmt_num(100.0), "100");
}

#[test]
fn scale_axis_is_per_axis_ratio() {
    assert_eq!(scale_axis(50.0, 960.0, 1920.0), 100.0);
    assert_eq!(scale_axis(30.0, 540.0, 1080.0), 60.0);
    assert_eq!(scale_axis(7.0, 0.0, 1080.0), 7.0);
}

#[test]
fn pixel_size_rejects_zero_and_formats_arg() {
    assert!(PixelSize::new(0, 10).is_err());
    let s = PixelSize::new(1280, 720).unwrap();
    assert_eq!(s.to_arg(), "1280x720");
    assert_eq!(s.to_size(), Size::new(1280.0, 720.0));
}
