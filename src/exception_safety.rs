//! Strong exception safety under injected allocation failures.
//!
//! Each test runs its body through [`fault::faulty_run`], which fails the first, then the
//! second, then the third allocation, and so on, until the body completes. Operations that
//! may fail are wrapped in [`fault::guarded`], which checks that a failed call leaves its
//! target untouched.

use crate::fault::{self, faulty_run, guarded};
use crate::{BiMap, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

type Container = BiMap<i32, i32>;

fn mass_insert(map: &mut Container, pairs: &[(i32, i32)]) -> Result<()> {
    for &(left, right) in pairs {
        map.insert(left, right)?;
    }
    Ok(())
}

fn expect_equals(map: &Container, pairs: &[(i32, i32)]) {
    fault::suspend(|| {
        map.assert_correctness();
        let actual: Vec<_> = map.iter_left().map(|(l, r)| (*l, *r)).collect();
        assert_eq!(actual, pairs);
    })
}

fn expect_empty(map: &Container) {
    assert!(map.is_empty());
    assert_eq!(map.len(), 0);
}

const SAMPLE: [(i32, i32); 4] = [(1, 2), (8, 7), (5, 6), (4, 3)];
const SAMPLE_SORTED: [(i32, i32); 4] = [(1, 2), (4, 3), (5, 6), (8, 7)];

#[test]
fn default_constructor_never_fails() {
    let runs = faulty_run(|| {
        let map = Container::new();
        expect_empty(&map);
        Ok(())
    });
    assert_eq!(runs, 0);
}

#[test]
fn copy_constructor() {
    let runs = faulty_run(|| {
        let mut c1 = Container::new();
        mass_insert(&mut c1, &SAMPLE)?;
        let c2 = guarded(&mut c1, |c1| c1.try_clone())?;
        assert_eq!(c1, c2);
        c2.assert_correctness();
        Ok(())
    });
    assert!(runs > SAMPLE.len());
}

#[test]
fn copy_assignment_to_empty() {
    faulty_run(|| {
        let mut c1 = Container::new();
        mass_insert(&mut c1, &SAMPLE)?;
        let source = c1.try_clone()?;
        let mut c2 = Container::new();
        guarded(&mut c2, |c2| c2.try_clone_from(&source))?;
        assert_eq!(source, c2);
        Ok(())
    });
}

#[test]
fn copy_assignment() {
    faulty_run(|| {
        let mut c1 = Container::new();
        mass_insert(&mut c1, &[(5, 6), (3, 4), (1, 2)])?;
        let mut c2 = Container::new();
        mass_insert(&mut c2, &[(11, 12), (9, 10), (7, 8)])?;
        guarded(&mut c1, |c1| c1.try_clone_from(&c2))?;
        assert_eq!(c1, c2);
        expect_equals(&c1, &[(7, 8), (9, 10), (11, 12)]);
        Ok(())
    });
}

#[test]
fn swap_never_fails() {
    faulty_run(|| {
        let mut c1 = Container::new();
        mass_insert(&mut c1, &SAMPLE)?;
        let mut c2 = Container::new();
        mass_insert(&mut c2, &[(3, 4), (1, 2), (7, 8), (5, 6)])?;
        fault::fail_after(0);
        c1.swap(&mut c2);
        fault::reset();
        expect_equals(&c1, &[(1, 2), (3, 4), (5, 6), (7, 8)]);
        expect_equals(&c2, &SAMPLE_SORTED);
        Ok(())
    });
}

#[test]
fn move_never_fails() {
    faulty_run(|| {
        let mut c1 = Container::new();
        mass_insert(&mut c1, &SAMPLE)?;
        let mut c3 = Container::new();
        mass_insert(&mut c3, &[(9, 9)])?;
        fault::fail_after(0);
        let c2 = std::mem::take(&mut c1);
        c3 = c2;
        fault::reset();
        expect_empty(&c1);
        expect_equals(&c3, &SAMPLE_SORTED);
        Ok(())
    });
}

#[test]
fn clear_never_fails() {
    faulty_run(|| {
        let mut c = Container::new();
        mass_insert(&mut c, &[(3, 4), (5, 6), (1, 2), (0, 7)])?;
        fault::fail_after(0);
        c.clear();
        fault::reset();
        expect_empty(&c);
        c.assert_correctness();
        Ok(())
    });
}

#[test]
fn insert() {
    faulty_run(|| {
        let mut c = Container::new();
        mass_insert(&mut c, &[(4, 2), (5, 6), (1, 3), (2, 4)])?;
        guarded(&mut c, |c| c.insert(3, 7))?;
        expect_equals(&c, &[(1, 3), (2, 4), (3, 7), (4, 2), (5, 6)]);
        Ok(())
    });
}

fn random_keys(count: usize) -> (Vec<i32>, Vec<i32>) {
    let mut rng = StdRng::seed_from_u64(5489);
    let mut keys: BTreeSet<i32> = BTreeSet::new();
    let mut values: BTreeSet<i32> = BTreeSet::new();
    for _ in 0..count {
        keys.insert(rng.gen_range(0..=1000));
        values.insert(rng.gen_range(0..=1000));
    }
    let len = keys.len().min(values.len());
    (
        keys.into_iter().take(len).collect(),
        values.into_iter().take(len).collect(),
    )
}

#[test]
fn mass_insert_stays_consistent() {
    let (keys, values) = random_keys(16);
    let len = keys.len();
    faulty_run(|| {
        let mut c = Container::new();
        for i in (0..len).rev() {
            guarded(&mut c, |c| c.insert(keys[i], values[i]))?;
            assert_eq!(c.len(), len - i);
            for j in i..len {
                assert_eq!(c.find_left(&keys[j]).flip().get(), Some(&values[j]));
            }
        }
        Ok(())
    });
}

const SEVEN: [(i32, i32); 7] = [(1, 6), (4, 3), (7, 8), (2, 2), (5, 4), (3, 7), (6, 10)];

#[test]
fn erase_left() {
    faulty_run(|| {
        let mut c = Container::new();
        mass_insert(&mut c, &SEVEN)?;
        let handle = c.find_left(&6).handle();
        guarded(&mut c, |c| {
            c.erase_left_at(handle.unwrap());
            Ok(())
        })?;
        expect_equals(&c, &[(1, 6), (2, 2), (3, 7), (4, 3), (5, 4), (7, 8)]);
        Ok(())
    });
}

#[test]
fn erase_right() {
    faulty_run(|| {
        let mut c = Container::new();
        mass_insert(&mut c, &SEVEN)?;
        let handle = c.find_right(&7).handle();
        guarded(&mut c, |c| {
            c.erase_right_at(handle.unwrap());
            Ok(())
        })?;
        expect_equals(&c, &[(1, 6), (2, 2), (4, 3), (5, 4), (6, 10), (7, 8)]);
        Ok(())
    });
}

#[test]
fn erase_left_and_right() {
    faulty_run(|| {
        let mut c = Container::new();
        mass_insert(&mut c, &SEVEN)?;
        guarded(&mut c, |c| {
            assert!(c.erase_left(&3));
            Ok(())
        })?;
        expect_equals(&c, &[(1, 6), (2, 2), (4, 3), (5, 4), (6, 10), (7, 8)]);
        guarded(&mut c, |c| {
            assert!(c.erase_right(&4));
            Ok(())
        })?;
        expect_equals(&c, &[(1, 6), (2, 2), (4, 3), (6, 10), (7, 8)]);
        Ok(())
    });
}

#[test]
fn mass_erase() {
    let (keys, values) = random_keys(14);
    let len = keys.len();
    let mut a = Container::new();
    for i in 0..len {
        a.insert(keys[i], values[i]).unwrap();
    }

    faulty_run(|| {
        let mut c = a.try_clone()?;
        for i in (0..len).rev() {
            guarded(&mut c, |c| {
                if i % 2 == 1 {
                    c.erase_left(&keys[i]);
                } else {
                    c.erase_right(&values[i]);
                }
                Ok(())
            })?;
            assert_eq!(c.len(), i);
            for j in 0..i {
                assert_eq!(c.find_left(&keys[j]).flip().get(), Some(&values[j]));
            }
        }
        expect_empty(&c);
        Ok(())
    });
}

#[test]
fn or_default_is_strongly_safe() {
    faulty_run(|| {
        let mut c = Container::new();
        mass_insert(&mut c, &[(1, 0), (2, 5), (3, 9)])?;
        let value = guarded(&mut c, |c| c.at_left_or_default(7).map(|r| *r))?;
        assert_eq!(value, 0);
        expect_equals(&c, &[(2, 5), (3, 9), (7, 0)]);
        Ok(())
    });
}

#[test]
fn reserve_then_insert() {
    faulty_run(|| {
        let mut c = Container::new();
        guarded(&mut c, |c| c.reserve(8))?;
        mass_insert(&mut c, &SAMPLE)?;
        expect_equals(&c, &SAMPLE_SORTED);
        Ok(())
    });
}

/// A key that counts its live instances, and whose comparisons and clones can be
/// made to panic.
mod tracked {
    use std::cell::Cell;
    use std::cmp::Ordering;

    thread_local! {
        static LIVE: Cell<isize> = Cell::new(0);
        static BUDGET: Cell<Option<usize>> = Cell::new(None);
    }

    /// The number of `Tracked` values alive on this thread.
    pub fn live() -> isize {
        LIVE.with(Cell::get)
    }

    /// Lets the next `n` comparisons or clones succeed, and makes the one after them panic.
    pub fn panic_after(n: Option<usize>) {
        BUDGET.with(|b| b.set(n));
    }

    fn spend() {
        BUDGET.with(|b| match b.get() {
            None => (),
            Some(0) => {
                b.set(None);
                panic!("injected panic in a key operation");
            }
            Some(n) => b.set(Some(n - 1)),
        })
    }

    #[derive(Debug, Default)]
    pub struct Tracked {
        pub value: i32,
        _live: Live,
    }

    #[derive(Debug)]
    struct Live;

    impl Default for Live {
        fn default() -> Self {
            LIVE.with(|l| l.set(l.get() + 1));
            Live
        }
    }

    impl Drop for Live {
        fn drop(&mut self) {
            LIVE.with(|l| l.set(l.get() - 1));
        }
    }

    impl Tracked {
        pub fn new(value: i32) -> Self {
            Tracked {
                value,
                _live: Live::default(),
            }
        }
    }

    impl Clone for Tracked {
        fn clone(&self) -> Self {
            spend();
            Tracked::new(self.value)
        }
    }

    impl PartialEq for Tracked {
        fn eq(&self, other: &Self) -> bool {
            self.value == other.value
        }
    }

    impl Eq for Tracked {}

    impl PartialOrd for Tracked {
        fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
            Some(self.cmp(other))
        }
    }

    impl Ord for Tracked {
        fn cmp(&self, other: &Self) -> Ordering {
            spend();
            self.value.cmp(&other.value)
        }
    }
}

use std::panic::{catch_unwind, AssertUnwindSafe};
use tracked::{live, panic_after, Tracked};

type TrackedMap = BiMap<Tracked, Tracked>;

fn tracked_map(pairs: &[(i32, i32)]) -> TrackedMap {
    let mut map = TrackedMap::new();
    for &(left, right) in pairs {
        map.insert(Tracked::new(left), Tracked::new(right)).unwrap();
    }
    map
}

fn values(map: &TrackedMap) -> Vec<(i32, i32)> {
    map.iter_left().map(|(l, r)| (l.value, r.value)).collect()
}

/// Runs `op` on a fresh map built from `pairs`, with a panic injected at the first,
/// then the second, then the third key operation, and so on, until `op` completes.
/// Every run that panics must leave its map exactly as it was.
/// Returns the map and the result of the run that completed.
fn panicking_run<T, F>(pairs: &[(i32, i32)], mut op: F) -> (TrackedMap, T)
where
    F: FnMut(&mut TrackedMap) -> T,
{
    for budget in 0.. {
        let mut map = tracked_map(pairs);
        let before = values(&map);
        panic_after(Some(budget));
        let res = catch_unwind(AssertUnwindSafe(|| op(&mut map)));
        panic_after(None);
        match res {
            Ok(res) => return (map, res),
            Err(_) => {
                assert_eq!(values(&map), before, "a panic modified the map");
                map.assert_correctness();
                assert_eq!(live() as usize, 2 * map.len(), "a panic leaked keys");
            }
        }
    }
    unreachable!()
}

const FIVE: [(i32, i32); 5] = [(1, 0), (2, 5), (3, 9), (4, 12), (6, 20)];

#[test]
fn panicking_ord_during_insert() {
    let (map, res) = panicking_run(&FIVE, |map| {
        map.insert(Tracked::new(5), Tracked::new(7)).map(|_| ())
    });
    assert_eq!(res, Ok(()));
    assert_eq!(values(&map), vec![(1, 0), (2, 5), (3, 9), (4, 12), (5, 7), (6, 20)]);
    drop(map);
    assert_eq!(live(), 0);
}

#[test]
fn panicking_ord_during_or_default() {
    let (map, res) = panicking_run(&FIVE, |map| {
        map.at_left_or_default(Tracked::new(7)).map(|r| r.value)
    });
    assert_eq!(res, Ok(0));
    assert_eq!(values(&map), vec![(2, 5), (3, 9), (4, 12), (6, 20), (7, 0)]);
    map.assert_correctness();
    drop(map);

    let (map, res) = panicking_run(&[(0, 3), (4, 1), (5, 2)], |map| {
        map.at_right_or_default(Tracked::new(8)).map(|l| l.value)
    });
    assert_eq!(res, Ok(0));
    assert_eq!(values(&map), vec![(0, 8), (4, 1), (5, 2)]);
    map.assert_correctness();
    drop(map);
    assert_eq!(live(), 0);
}

#[test]
fn or_default_into_every_gap() {
    // the element holding the default value sits at every possible position,
    // relative to where the new element goes
    for old_left in 0..6 {
        for new_left in 0..6 {
            let pairs: Vec<_> = (0..6)
                .filter(|&x| x != new_left)
                .map(|x| (x * 2, if x == old_left { 0 } else { x + 1 }))
                .collect();
            let mut map = tracked_map(&pairs);
            let res = map.at_left_or_default(Tracked::new(new_left * 2 + 1)).map(|r| r.value);
            assert_eq!(res, Ok(0));
            map.assert_correctness();
            assert!(values(&map).contains(&(new_left * 2 + 1, 0)));
            assert_eq!(map.len(), pairs.len() - (old_left != new_left) as usize + 1);
        }
    }
    assert_eq!(live(), 0);
}

#[test]
fn panicking_clone_during_copy() {
    let (source, copy) = panicking_run(&FIVE, |map| map.try_clone());
    let copy = copy.unwrap();
    assert_eq!(values(&copy), values(&source));
    copy.assert_correctness();
    assert_eq!(live(), 20);
    drop(source);
    drop(copy);
    assert_eq!(live(), 0);
}

#[test]
fn keys_are_dropped_exactly_once() {
    let mut map = tracked_map(&[(1, 10), (2, 20), (3, 30), (4, 40), (5, 50), (6, 60)]);
    assert_eq!(live(), 12);

    assert!(map.erase_left(&Tracked::new(1)));
    assert_eq!(live(), 10);
    let handle = map.find_right(&Tracked::new(20)).handle().unwrap();
    map.erase_right_at(handle);
    assert_eq!(live(), 8);
    let (left, right) = map.remove_by_left(&Tracked::new(3)).unwrap();
    assert_eq!((left.value, right.value), (3, 30));
    assert_eq!(live(), 8);
    drop((left, right));
    assert_eq!(live(), 6);
    assert_eq!(map.erase_left_range(Tracked::new(4)..Tracked::new(5)), 1);
    assert_eq!(live(), 4);

    map.clear();
    assert_eq!(live(), 0);

    let map = tracked_map(&[(1, 10), (2, 20), (3, 30)]);
    let mut pairs = map.into_iter();
    let first = pairs.next().unwrap();
    assert_eq!((first.0.value, first.1.value), (1, 10));
    assert_eq!(live(), 6);
    drop(first);
    drop(pairs);
    assert_eq!(live(), 0);

    let map = tracked_map(&[(1, 10), (2, 20)]);
    drop(map);
    assert_eq!(live(), 0);
}

#[test]
fn failed_copies_do_not_leak() {
    faulty_run(|| {
        let mut source = fault::suspend(|| tracked_map(&FIVE));
        let copy = guarded(&mut source, |source| source.try_clone());
        match &copy {
            Ok(_) => assert_eq!(live(), 20),
            Err(_) => assert_eq!(live(), 10),
        }
        copy.map(|_| ())
    });
    assert_eq!(live(), 0);
}

#[test]
fn failed_inserts_do_not_leak() {
    faulty_run(|| {
        let mut map = TrackedMap::new();
        for x in 0..10 {
            let res = guarded(&mut map, |map| map.insert(Tracked::new(x), Tracked::new(-x)));
            if let Err(err) = res {
                // the rejected pair is dropped with the error
                assert_eq!(live() as usize, 2 * map.len());
                return Err(err);
            }
        }
        Ok(())
    });
    assert_eq!(live(), 0);
}
