use super::*;

#[test]
fn size_rejects_zero_dimensions() {
    assert!(Size::new(0, 4).is_err());
    assert!(Size::new(4, 0).is_err());
    assert_eq!(Size::new(3, 2).unwrap().pixel_count(), 6);
}

#[test]
fn index_and_coords_are_inverse() {
    let s = Size::new(5, 3).unwrap();
    for y in 0..3 {
        for x in 0..5 {
            let i = s.index_of(x, y);
            assert_eq!(s.coords_of(i), (x, y));
        }
    }
    assert_eq!(s.index_of(4, 2), 14);
    assert!(s.contains(4, 2));
    assert!(!s.contains(5, 0));
}

#[test]
fn argb_packing_matches_channel_order() {
    let c = Rgba8::new(0x11, 0x22, 0x33, 0x44);
    assert_eq!(c.to_argb_u32(), 0x4411_2233);
    assert_eq!(Rgba8::from_argb_u32(0x4411_2233), c);
}

#[test]
fn hex_parsing_accepts_rgb_and_rgba() {
    assert_eq!(Rgba8::from_hex("#ff8000").unwrap(), Rgba8::opaque(255, 128, 0));
    assert_eq!(
        Rgba8::from_hex("01020304").unwrap(),
        Rgba8::new(1, 2, 3, 4)
    );
    assert!(Rgba8::from_hex("#fff").is_err());
    assert!(Rgba8::from_hex("#gg0000").is_err());
}

#[test]
fn luma_of_extremes() {
    assert_eq!(Rgba8::BLACK.luma(), 0);
    assert_eq!(Rgba8::WHITE.luma(), 255);
}

#[test]
fn lerp_hits_endpoints_and_clamps() {
    let a = Rgba8::BLACK;
    let b = Rgba8::WHITE;
    assert_eq!(a.lerp(b, 0.0), a);
    assert_eq!(a.lerp(b, 1.0), b);
    assert_eq!(a.lerp(b, 7.0), b);
    assert_eq!(a.lerp(b, 0.5).r, 128);
}
