#![no_main]

use libfuzzer_sys::fuzz_target;
use skipindex::{Config, SkipList};
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    let config = Config::default().max_level(8).retry_budget(usize::MAX);
    let list = Arc::new(SkipList::with_config(config).unwrap());

    let threads = data
        .chunks(64)
        .take(20)
        .map(|ops| {
            let list = list.clone();
            let ops = ops.to_vec();
            std::thread::spawn(move || {
                for pair in ops.chunks(2) {
                    let target = pair[0];
                    if pair.get(1).map_or(false, |op| op % 5 == 0) {
                        list.remove(&target).unwrap();
                    } else {
                        list.insert(target, ()).unwrap();
                    }

                    let _ = list.scan(Some(&target)).take(4).count();
                }
            })
        })
        .collect::<Vec<_>>();

    for thread in threads {
        thread.join().unwrap()
    }

    let mut list = Arc::try_unwrap(list).unwrap();
    list.check_invariants();
});
