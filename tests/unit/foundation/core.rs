use super::*;

#[test]
fn premul_opaque_is_identity() {
    let p = Rgba8::opaque(10, 20, 30).premultiplied();
    assert_eq!(p, Rgba8Premul::from_straight_rgba(10, 20, 30, 255));
    assert_eq!((p.r, p.g, p.b, p.a), (10, 20, 30, 255));
}

#[test]
fn premul_round_trips_close_to_source() {
    let src = Rgba8::new(200, 100, 50, 128);
    let back = src.premultiplied().to_straight();
    assert_eq!(back.a, 128);
    assert!((i16::from(back.r) - 200).abs() <= 2);
    assert!((i16::from(back.g) - 100).abs() <= 2);
    assert!((i16::from(back.b) - 50).abs() <= 2);
}

#[test]
fn transparent_unpremul_is_zero() {
    assert_eq!(Rgba8Premul::transparent().to_straight(), Rgba8::new(0, 0, 0, 0));
}
