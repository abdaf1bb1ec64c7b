//! Tests for IdAllocator
//!
//! These tests verify:
//! - Smallest-free-id allocation starting at 1
//! - Reuse of released ids
//! - Idempotent release
//! - Capacity errors once a bounded id space is full
//! - Uniqueness under concurrent allocation

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use settlement_registry::{IdAllocator, RegistryError};

// =============================================================================
// Basic Allocation Tests
// =============================================================================

#[test]
fn test_first_id_is_one() {
    let ids = IdAllocator::new();
    assert_eq!(ids.allocate().unwrap(), 1);
}

#[test]
fn test_sequential_allocation() {
    let ids = IdAllocator::new();
    let allocated: Vec<u32> = (0..5).map(|_| ids.allocate().unwrap()).collect();
    assert_eq!(allocated, vec![1, 2, 3, 4, 5]);
    assert_eq!(ids.len(), 5);
}

#[test]
fn test_released_id_is_reused_first() {
    let ids = IdAllocator::new();
    for _ in 0..4 {
        ids.allocate().unwrap();
    }

    ids.release(2);
    assert!(!ids.is_allocated(2));
    assert_eq!(ids.allocate().unwrap(), 2);
    assert_eq!(ids.allocate().unwrap(), 5);
}

#[test]
fn test_smallest_gap_wins() {
    let ids = IdAllocator::new();
    for _ in 0..6 {
        ids.allocate().unwrap();
    }

    ids.release(5);
    ids.release(3);
    assert_eq!(ids.allocate().unwrap(), 3);
    assert_eq!(ids.allocate().unwrap(), 5);
    assert_eq!(ids.allocate().unwrap(), 7);
}

#[test]
fn test_release_is_idempotent() {
    let ids = IdAllocator::new();
    let id = ids.allocate().unwrap();

    ids.release(id);
    ids.release(id);
    ids.release(42);

    assert!(ids.is_empty());
    assert_eq!(ids.allocate().unwrap(), 1);
}

// =============================================================================
// Claim Tests
// =============================================================================

#[test]
fn test_claim_free_id() {
    let ids = IdAllocator::new();
    assert!(ids.claim(3));
    assert!(ids.is_allocated(3));

    // Allocation fills the gaps below the claimed id
    assert_eq!(ids.allocate().unwrap(), 1);
    assert_eq!(ids.allocate().unwrap(), 2);
    assert_eq!(ids.allocate().unwrap(), 4);
}

#[test]
fn test_claim_taken_or_zero_id_fails() {
    let ids = IdAllocator::new();
    let id = ids.allocate().unwrap();

    assert!(!ids.claim(id));
    assert!(!ids.claim(0));
    assert_eq!(ids.len(), 1);
}

// =============================================================================
// Bounded Id Space Tests
// =============================================================================

#[test]
fn test_bounded_allocator_reports_capacity() {
    let ids = IdAllocator::with_max_id(2);

    assert_eq!(ids.allocate().unwrap(), 1);
    assert_eq!(ids.allocate().unwrap(), 2);
    assert!(matches!(ids.allocate(), Err(RegistryError::Capacity(_))));
    assert_eq!(ids.len(), 2);

    ids.release(1);
    assert_eq!(ids.allocate().unwrap(), 1);
}

#[test]
fn test_bounded_allocator_refuses_out_of_range_claim() {
    let ids = IdAllocator::with_max_id(2);

    assert!(!ids.claim(3));
    assert!(ids.claim(2));
    assert!(ids.is_empty() == false);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_allocation_is_unique() {
    let ids = Arc::new(IdAllocator::new());
    let mut handles = Vec::new();

    for _ in 0..8 {
        let ids = Arc::clone(&ids);
        handles.push(thread::spawn(move || {
            (0..50).map(|_| ids.allocate().unwrap()).collect::<Vec<_>>()
        }));
    }

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(id > 0);
            assert!(seen.insert(id), "id {} handed out twice", id);
        }
    }

    // Dense: exactly 1..=400
    assert_eq!(seen.len(), 400);
    assert_eq!(seen.iter().max(), Some(&400));
}

#[test]
fn test_concurrent_allocate_and_release() {
    let ids = Arc::new(IdAllocator::new());
    let mut handles = Vec::new();

    for _ in 0..4 {
        let ids = Arc::clone(&ids);
        handles.push(thread::spawn(move || {
            for _ in 0..200 {
                let id = ids.allocate().unwrap();
                assert!(ids.is_allocated(id));
                ids.release(id);
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(ids.is_empty());
}
