use std::time::Instant;

use flipbook::{
    CanvasSize, Editor, EditorEvent, InsertContent, PointerPhase, ProjectConfig, RasterSurface,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn pointer(x: f64, y: f64, phase: PointerPhase) -> EditorEvent {
    EditorEvent::Pointer { x, y, phase }
}

fn stroke(ed: &mut Editor, from: (f64, f64), to: (f64, f64), now: Instant) {
    ed.dispatch(pointer(from.0, from.1, PointerPhase::Down), now)
        .unwrap();
    ed.dispatch(pointer(to.0, to.1, PointerPhase::Move), now)
        .unwrap();
    ed.dispatch(pointer(to.0, to.1, PointerPhase::Up), now)
        .unwrap();
}

fn small_config(max_history: usize) -> ProjectConfig {
    ProjectConfig {
        canvas: CanvasSize {
            width: 40,
            height: 30,
        },
        layer_count: 4,
        max_history,
    }
}

#[test]
fn duplicate_move_delete_scenario() {
    init_tracing();
    // Full-size project: one empty 800x600 frame with 4 layers.
    let mut ed = Editor::new(ProjectConfig::default()).unwrap();
    let now = Instant::now();
    assert_eq!(ed.store().frame_count(), 1);

    // Mark frame 0 so the reorder below is observable.
    stroke(&mut ed, (100.0, 100.0), (120.0, 100.0), now);
    let marked = ed.store().snapshot_at(0).unwrap().clone();

    ed.dispatch(
        EditorEvent::InsertFrame {
            after: 0,
            content: InsertContent::DuplicateCurrent,
        },
        now,
    )
    .unwrap();
    assert_eq!(ed.store().frame_count(), 2);
    assert_eq!(ed.store().current_index(), 1);

    // The duplicate's serialized layers are bit-for-bit the source's.
    let dup = ed.store().snapshot_at(1).unwrap();
    for (a, b) in marked.layers().iter().zip(dup.layers()) {
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    // Paint only on the duplicate so the two frames diverge.
    stroke(&mut ed, (200.0, 200.0), (220.0, 220.0), now);
    let edited = ed.store().snapshot_at(1).unwrap().clone();
    assert_ne!(edited, marked);

    ed.dispatch(EditorEvent::MoveFrame { from: 1, to: 0 }, now)
        .unwrap();
    assert_eq!(ed.store().current_index(), 0);
    assert_eq!(*ed.store().snapshot_at(0).unwrap(), edited);
    assert_eq!(*ed.store().snapshot_at(1).unwrap(), marked);

    ed.dispatch(EditorEvent::DeleteFrame(1), now).unwrap();
    assert_eq!(ed.store().frame_count(), 1);
    assert_eq!(*ed.store().snapshot_at(0).unwrap(), edited);
}

#[test]
fn round_stroke_undo_restores_transparent_buffer_exactly() {
    let mut ed = Editor::new(ProjectConfig::default()).unwrap();
    let now = Instant::now();

    // Size-5 round stroke from (10,10) to (20,20).
    ed.dispatch(pointer(10.0, 10.0, PointerPhase::Down), now)
        .unwrap();
    ed.dispatch(pointer(20.0, 20.0, PointerPhase::Move), now)
        .unwrap();
    ed.dispatch(pointer(20.0, 20.0, PointerPhase::Up), now)
        .unwrap();
    assert!(!ed.store().live().active().is_blank());

    assert!(ed.undo(now).unwrap());
    let pristine = RasterSurface::new(ProjectConfig::default().canvas);
    assert_eq!(ed.store().live().active().data(), pristine.data());
}

#[test]
fn undo_redo_roundtrip_at_any_depth() {
    let mut ed = Editor::new(small_config(30)).unwrap();
    let now = Instant::now();

    let mut snapshots = vec![ed.store().live().snapshot().unwrap()];
    for i in 0..6 {
        let x = 4.0 + 4.0 * i as f64;
        stroke(&mut ed, (x, 10.0), (x, 20.0), now);
        snapshots.push(ed.store().live().snapshot().unwrap());
    }

    // Walk all the way back, checking every intermediate state.
    for depth in (0..6).rev() {
        assert!(ed.undo(now).unwrap());
        assert_eq!(ed.store().live().snapshot().unwrap(), snapshots[depth]);
    }
    assert!(!ed.undo(now).unwrap());

    // And forward again.
    for depth in 1..=6 {
        assert!(ed.redo(now).unwrap());
        assert_eq!(ed.store().live().snapshot().unwrap(), snapshots[depth]);
    }
    assert!(!ed.redo(now).unwrap());
}

#[test]
fn history_bound_evicts_oldest_first() {
    let mut ed = Editor::new(small_config(3)).unwrap();
    let now = Instant::now();

    let mut snapshots = vec![ed.store().live().snapshot().unwrap()];
    for i in 0..5 {
        let x = 4.0 + 6.0 * i as f64;
        stroke(&mut ed, (x, 8.0), (x, 22.0), now);
        snapshots.push(ed.store().live().snapshot().unwrap());
    }

    // Only the three most recent checkpoints survive.
    let mut undone = 0;
    while ed.undo(now).unwrap() {
        undone += 1;
    }
    assert_eq!(undone, 3);
    assert_eq!(ed.store().live().snapshot().unwrap(), snapshots[2]);
}

#[test]
fn drawing_after_undo_clears_redo() {
    let mut ed = Editor::new(small_config(30)).unwrap();
    let now = Instant::now();

    stroke(&mut ed, (10.0, 10.0), (20.0, 10.0), now);
    assert!(ed.undo(now).unwrap());
    stroke(&mut ed, (10.0, 20.0), (20.0, 20.0), now);

    let before = ed.store().live().snapshot().unwrap();
    assert!(!ed.redo(now).unwrap());
    assert_eq!(ed.store().live().snapshot().unwrap(), before);
}

#[test]
fn histories_stay_scoped_while_switching_frames() {
    let mut ed = Editor::new(small_config(30)).unwrap();
    let now = Instant::now();

    stroke(&mut ed, (10.0, 10.0), (20.0, 10.0), now);
    ed.dispatch(
        EditorEvent::InsertFrame {
            after: 0,
            content: InsertContent::Empty,
        },
        now,
    )
    .unwrap();

    // The fresh frame has no history of its own.
    assert!(!ed.undo(now).unwrap());
    stroke(&mut ed, (5.0, 5.0), (15.0, 5.0), now);

    // Frame 0 still carries its own single checkpoint.
    ed.select_frame(0, now).unwrap();
    assert!(ed.undo(now).unwrap());
    assert!(ed.store().live().active().is_blank());
    assert!(!ed.undo(now).unwrap());

    // Frame 1 kept both its content and its history.
    ed.select_frame(1, now).unwrap();
    assert!(!ed.store().live().active().is_blank());
    assert!(ed.undo(now).unwrap());
    assert!(ed.store().live().active().is_blank());
}

#[test]
fn delete_only_frame_is_rejected_with_state_intact() {
    let mut ed = Editor::new(small_config(30)).unwrap();
    let now = Instant::now();
    stroke(&mut ed, (10.0, 10.0), (20.0, 10.0), now);

    let err = ed.delete_frame(0, now).unwrap_err();
    assert!(matches!(err, flipbook::FlipbookError::MinimumFrames(_)));
    assert_eq!(ed.store().frame_count(), 1);
    assert!(!ed.store().live().active().is_blank());
}

#[test]
fn move_and_move_back_restore_order_and_selection() {
    let mut ed = Editor::new(small_config(30)).unwrap();
    let now = Instant::now();
    for _ in 0..3 {
        ed.dispatch(
            EditorEvent::InsertFrame {
                after: ed.store().current_index(),
                content: InsertContent::Empty,
            },
            now,
        )
        .unwrap();
    }
    ed.select_frame(2, now).unwrap();
    stroke(&mut ed, (12.0, 12.0), (18.0, 18.0), now);
    let ordering: Vec<_> = (0..4)
        .map(|i| ed.store().snapshot_at(i).unwrap().clone())
        .collect();

    ed.move_frame(2, 0).unwrap();
    assert_eq!(ed.store().current_index(), 0);
    ed.move_frame(0, 2).unwrap();
    assert_eq!(ed.store().current_index(), 2);

    for (i, snap) in ordering.iter().enumerate() {
        assert_eq!(ed.store().snapshot_at(i).unwrap(), snap);
    }
}
