use super::*;

#[test]
fn new_buffer_is_default_filled() {
    let b = RasterBuffer::<u32>::new(3, 2).unwrap();
    assert_eq!(b.len(), 6);
    assert!(b.as_slice().iter().all(|&v| v == 0));
    assert!(!b.is_empty());
}

#[test]
fn zero_sized_buffers_are_rejected() {
    assert!(RasterBuffer::<f64>::new(0, 1).is_err());
    assert!(RasterBuffer::<f64>::from_vec(2, 2, vec![0.0; 3]).is_err());
}

#[test]
fn get_and_set_use_row_major_layout() {
    let mut b = RasterBuffer::<u32>::new(4, 3).unwrap();
    b.set(1, 2, 9).unwrap();
    assert_eq!(b.get(1, 2), Some(9));
    assert_eq!(b.get_index(2 * 4 + 1), Some(9));
    assert_eq!(b.get(4, 0), None);
    assert!(b.set(0, 3, 1).is_err());
}

#[test]
fn snapshot_is_detached_from_live_buffer() {
    let mut b = RasterBuffer::<u32>::filled(2, 2, 7).unwrap();
    let snap = b.snapshot();
    b.fill(1);
    assert!(snap.iter().all(|&v| v == 7));
    assert!(b.as_slice().iter().all(|&v| v == 1));
}
