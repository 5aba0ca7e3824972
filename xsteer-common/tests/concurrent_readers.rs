//! Single-writer / many-reader behavior of the queue registry: readers never
//! block, never see a torn binding, and are undisturbed by writer churn on
//! unrelated queues.

use std::{sync::Arc, thread};

use xsteer_common::{QueueRegistry, Verdict};

const SOCKET_A: u32 = 0x1111_1111;
const SOCKET_B: u32 = 0x2222_2222;

#[test]
fn readers_never_observe_a_torn_binding() {
    let registry = Arc::new(QueueRegistry::new());
    registry.bind(9, SOCKET_A).unwrap();

    let readers: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..100_000 {
                    let socket = registry.lookup(9).expect("queue 9 stays bound");
                    assert!(
                        socket == SOCKET_A || socket == SOCKET_B,
                        "torn read: {socket:#x}"
                    );
                    assert_eq!(registry.decide(9), Verdict::Redirect(9));
                }
            })
        })
        .collect();

    for round in 0..10_000 {
        let socket = if round % 2 == 0 { SOCKET_B } else { SOCKET_A };
        registry.bind(9, socket).unwrap();
    }

    for reader in readers {
        reader.join().unwrap();
    }
}

#[test]
fn writer_churn_on_one_queue_does_not_disturb_others() {
    let registry = Arc::new(QueueRegistry::new());
    registry.bind(3, 7).unwrap();

    let reader = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            for _ in 0..100_000 {
                assert_eq!(registry.lookup(3), Some(7));
                assert_eq!(registry.decide(3), Verdict::Redirect(3));
                assert_eq!(registry.decide(5), Verdict::Pass);
            }
        })
    };

    for round in 0..10_000u32 {
        registry.bind(60, round).unwrap();
        registry.unbind(60);
    }

    reader.join().unwrap();
}
