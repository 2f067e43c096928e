use super::*;
use crate::define_idx;

define_idx!(TestId);

#[test]
fn test_push_returns_sequential_ids() {
    let mut vec: IndexVec<TestId, i32> = IndexVec::new();
    let a = vec.push(10);
    let b = vec.push(20);
    assert_eq!(a, TestId(0));
    assert_eq!(b, TestId(1));
    assert_eq!(vec.len(), 2);
}

#[test]
fn test_typed_indexing() {
    let mut vec: IndexVec<TestId, &str> = IndexVec::new();
    let id = vec.push("hello");
    assert_eq!(vec[id], "hello");
    vec[id] = "world";
    assert_eq!(vec[id], "world");
}

#[test]
fn test_get_out_of_bounds() {
    let vec: IndexVec<TestId, i32> = IndexVec::new();
    assert_eq!(vec.get(TestId(0)), None);
}

#[test]
fn test_iter_enumerated() {
    let mut vec: IndexVec<TestId, i32> = IndexVec::new();
    vec.push(10);
    vec.push(20);

    let pairs: Vec<_> = vec.iter_enumerated().map(|(i, v)| (i.0, *v)).collect();
    assert_eq!(pairs, vec![(0, 10), (1, 20)]);
}

#[test]
fn test_next_index() {
    let mut vec: IndexVec<TestId, i32> = IndexVec::new();
    assert_eq!(vec.next_index(), TestId(0));
    vec.push(1);
    assert_eq!(vec.next_index(), TestId(1));
}

#[test]
fn test_idx_roundtrip() {
    for i in [0usize, 1, 7, 4096] {
        assert_eq!(TestId::from_usize(i).index(), i);
    }
}

#[quickcheck_macros::quickcheck]
fn prop_idx_roundtrip(raw: u32) -> bool {
    TestId::from_usize(raw as usize).index() == raw as usize
}
