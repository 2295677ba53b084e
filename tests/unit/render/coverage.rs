use super::*;
use std::sync::atomic::AtomicUsize;

#[test]
fn first_claim_wins() {
    let c = Coverage::new(4);
    assert!(c.claim(2));
    assert!(!c.claim(2));
    assert!(c.is_claimed(2));
    assert!(!c.is_claimed(1));
    assert_eq!(c.claimed(), 1);
    assert_eq!(c.len(), 4);
}

#[test]
fn contended_claims_hand_out_each_index_once() {
    let c = Coverage::new(1000);
    let wins = AtomicUsize::new(0);
    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for i in (0..1000).rev() {
                    if c.claim(i) {
                        wins.fetch_add(1, Ordering::Relaxed);
                    }
                }
            });
        }
    });
    assert_eq!(wins.load(Ordering::Relaxed), 1000);
    assert_eq!(c.claimed(), 1000);
}
