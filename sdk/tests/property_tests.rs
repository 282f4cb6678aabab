use proptest::prelude::*;
use sdk::errors::{BoardError, BoardErrorExt};
use sdk::types::{ItemKind, Rect};

// Every error variant yields a non-empty static hint that never echoes the
// offending request data back to the caller.
proptest! {
    #[test]
    fn test_error_user_hint_completeness(error_str in "[a-z]{12,40}") {
        let errs = vec![
            BoardError::Validation(error_str.clone()),
            BoardError::NotFound(error_str.clone()),
            BoardError::StorageUnavailable(error_str.clone()),
            BoardError::ChannelWrite(error_str.clone()),
            BoardError::Config(error_str.clone()),
            BoardError::Serialization(error_str.clone()),
        ];

        for err in errs {
            let hint = err.user_hint();
            prop_assert!(!hint.is_empty());
            prop_assert!(!hint.contains(&error_str));
        }
    }
}

// Unknown kind names are always rejected as validation errors, never panics
// and never a different error shape.
proptest! {
    #[test]
    fn test_unknown_kind_is_validation_error(name in "[a-z]{1,8}x[0-9]{1,3}") {
        match name.parse::<ItemKind>() {
            Err(BoardError::Validation(_)) => {}
            other => prop_assert!(false, "unexpected parse result: {:?}", other),
        }
    }
}

// Overlap is symmetric.
proptest! {
    #[test]
    fn test_overlap_is_symmetric(
        ax in -500.0..500.0f64, ay in -500.0..500.0f64,
        aw in 1.0..300.0f64, ah in 1.0..300.0f64,
        bx in -500.0..500.0f64, by in -500.0..500.0f64,
        bw in 1.0..300.0f64, bh in 1.0..300.0f64,
    ) {
        let a = Rect::new(ax, ay, aw, ah);
        let b = Rect::new(bx, by, bw, bh);
        prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        prop_assert!(a.overlaps(&a));
    }
}
