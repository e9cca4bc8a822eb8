//! Integration tests for the render queue, executor, and resume
//! protocol against in-memory stores.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use slidereel_core::lifecycle::{
    STATUS_COMPLETED, STATUS_DRAFT, STATUS_QUEUED, STATUS_RENDERING,
};
use slidereel_core::ports::{ObjectStore, RenderStore};
use slidereel_render::executor::{frame_key, frame_prefix};
use slidereel_render::{collect_interrupted, RenderError, RenderQueue};
use slidereel_storage::MemoryObjectStore;
use tokio::sync::mpsc;

use common::{MemoryRenderStore, ScriptedCompositor};

fn harness() -> (Arc<MemoryRenderStore>, Arc<MemoryObjectStore>, Arc<RenderQueue>) {
    let store = Arc::new(MemoryRenderStore::new());
    let objects = Arc::new(MemoryObjectStore::new("http://cdn.test/media"));
    let queue = RenderQueue::new(
        Arc::clone(&store) as Arc<dyn RenderStore>,
        Arc::clone(&objects) as Arc<dyn ObjectStore>,
    );
    (store, objects, queue)
}

#[tokio::test]
async fn render_completes_and_uploads_every_frame() {
    let (store, objects, queue) = harness();
    let user = uuid::Uuid::new_v4();
    let id = store.add_slideshow(user, "1:1", 2, STATUS_DRAFT);

    queue
        .admit(id, Arc::new(ScriptedCompositor::ok()), None)
        .await
        .unwrap();

    let slideshow = store.slideshow(id);
    assert_eq!(slideshow.status_id, STATUS_COMPLETED);
    assert_eq!(slideshow.frame_paths.len(), 2);
    assert_eq!(objects.len().await, 2);
    assert_eq!(store.usage_count(user), 1);
}

#[tokio::test]
async fn concurrent_admits_for_one_id_share_a_single_job() {
    let (store, _objects, queue) = harness();
    let user = uuid::Uuid::new_v4();
    let id = store.add_slideshow(user, "1:1", 2, STATUS_DRAFT);
    let compositor = Arc::new(ScriptedCompositor::delayed(Duration::from_millis(50)));

    let (first, second) = tokio::join!(
        queue.admit(id, Arc::clone(&compositor) as _, None),
        queue.admit(id, Arc::clone(&compositor) as _, None),
    );

    assert!(first.is_ok());
    assert!(second.is_ok());
    // Exactly one execution despite two admissions.
    assert_eq!(store.begin_order(), vec![id]);
}

#[tokio::test]
async fn jobs_drain_in_admission_order() {
    let (store, _objects, queue) = harness();
    let user = uuid::Uuid::new_v4();
    let first = store.add_slideshow(user, "1:1", 1, STATUS_DRAFT);
    let second = store.add_slideshow(user, "1:1", 1, STATUS_DRAFT);

    let compositor = Arc::new(ScriptedCompositor::delayed(Duration::from_millis(30)));
    let queue_a = Arc::clone(&queue);
    let queue_b = Arc::clone(&queue);
    let comp_a = Arc::clone(&compositor);
    let comp_b = Arc::clone(&compositor);

    let handle_a = tokio::spawn(async move { queue_a.admit(first, comp_a as _, None).await });
    // Give the first admission time to land at the head of the queue.
    tokio::time::sleep(Duration::from_millis(5)).await;
    let handle_b = tokio::spawn(async move { queue_b.admit(second, comp_b as _, None).await });

    handle_a.await.unwrap().unwrap();
    handle_b.await.unwrap().unwrap();

    assert_eq!(store.begin_order(), vec![first, second]);
}

#[tokio::test]
async fn failed_slide_leaves_a_gap_not_a_reorder() {
    let (store, objects, queue) = harness();
    let user = uuid::Uuid::new_v4();
    let id = store.add_slideshow(user, "1:1", 3, STATUS_DRAFT);
    let slides = store.slideshow(id).slides.clone();

    queue
        .admit(id, Arc::new(ScriptedCompositor::failing_on(&[1])), None)
        .await
        .unwrap();

    let slideshow = store.slideshow(id);
    assert_eq!(slideshow.status_id, STATUS_COMPLETED);
    assert_eq!(
        slideshow.frame_paths,
        vec![
            frame_key(user, id, slides[0].id),
            frame_key(user, id, slides[2].id),
        ]
    );
    assert_eq!(objects.len().await, 2);
}

#[tokio::test]
async fn persistence_failure_mid_render_rolls_back_to_draft() {
    let (store, _objects, queue) = harness();
    let user = uuid::Uuid::new_v4();
    let id = store.add_slideshow(user, "1:1", 2, STATUS_DRAFT);
    store.fail_append.store(true, Ordering::SeqCst);

    let result = queue.admit(id, Arc::new(ScriptedCompositor::ok()), None).await;

    assert!(matches!(result, Err(RenderError::Store(_))));
    assert_eq!(store.slideshow(id).status_id, STATUS_DRAFT);
    assert_eq!(store.usage_count(user), 0);
}

#[tokio::test]
async fn admission_is_rejected_when_queued_persist_fails() {
    let (store, _objects, queue) = harness();
    let user = uuid::Uuid::new_v4();
    let id = store.add_slideshow(user, "1:1", 1, STATUS_DRAFT);
    store.fail_mark_queued.store(true, Ordering::SeqCst);

    let result = queue.admit(id, Arc::new(ScriptedCompositor::ok()), None).await;

    assert!(matches!(result, Err(RenderError::Admission(_))));
    assert!(!queue.is_outstanding(id).await);
    // Never enqueued: status untouched, executor never ran.
    assert_eq!(store.slideshow(id).status_id, STATUS_DRAFT);
    assert!(store.begin_order().is_empty());

    // The queue recovers once persistence does.
    store.fail_mark_queued.store(false, Ordering::SeqCst);
    queue
        .admit(id, Arc::new(ScriptedCompositor::ok()), None)
        .await
        .unwrap();
    assert_eq!(store.slideshow(id).status_id, STATUS_COMPLETED);
}

#[tokio::test]
async fn progress_fans_out_to_every_listener() {
    let (store, _objects, queue) = harness();
    let user = uuid::Uuid::new_v4();
    let id = store.add_slideshow(user, "1:1", 2, STATUS_DRAFT);
    let compositor = Arc::new(ScriptedCompositor::delayed(Duration::from_millis(40)));

    let (tx_a, mut rx_a) = mpsc::unbounded_channel();
    let (tx_b, mut rx_b) = mpsc::unbounded_channel();

    let (first, second) = tokio::join!(
        queue.admit(id, Arc::clone(&compositor) as _, Some(tx_a)),
        queue.admit(id, Arc::clone(&compositor) as _, Some(tx_b)),
    );
    first.unwrap();
    second.unwrap();

    for rx in [&mut rx_a, &mut rx_b] {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].completed, 1);
        assert_eq!(events[1].completed, 2);
        assert_eq!(events[1].total, 2);
        assert!(events.iter().all(|e| e.frame_path.is_some()));
    }

    // No job outstanding afterwards, so late listeners have nothing to
    // attach to.
    assert!(queue.attach_listener(id).await.is_none());
}

#[tokio::test]
async fn resume_scan_purges_rendering_and_requeues_queued() {
    let (store, objects, _queue) = harness();
    let user = uuid::Uuid::new_v4();

    let mid_render = store.add_slideshow(user, "1:1", 2, STATUS_RENDERING);
    let admitted = store.add_slideshow(user, "1:1", 2, STATUS_QUEUED);
    let draft = store.add_slideshow(user, "1:1", 2, STATUS_DRAFT);
    let done = store.add_slideshow(user, "1:1", 2, STATUS_COMPLETED);

    // Untrusted partial output from the interrupted render.
    let prefix = frame_prefix(user, mid_render);
    objects
        .upload(&format!("{prefix}a.png"), vec![1], "image/png")
        .await
        .unwrap();
    objects
        .upload(&format!("{prefix}b.png"), vec![2], "image/png")
        .await
        .unwrap();
    store.set_frame_paths(mid_render, vec![format!("{prefix}a.png")]);

    let store_dyn: Arc<dyn RenderStore> = Arc::clone(&store) as _;
    let objects_dyn: Arc<dyn ObjectStore> = Arc::clone(&objects) as _;
    let jobs = collect_interrupted(&store_dyn, &objects_dyn).await.unwrap();

    let ids: Vec<_> = jobs.iter().map(|j| j.slideshow_id).collect();
    assert_eq!(jobs.len(), 2);
    assert!(ids.contains(&mid_render));
    assert!(ids.contains(&admitted));
    assert!(!ids.contains(&draft));
    assert!(!ids.contains(&done));

    let purged = jobs.iter().find(|j| j.slideshow_id == mid_render).unwrap();
    assert_eq!(purged.purged_objects, 2);
    assert!(objects.list(&prefix).await.unwrap().is_empty());
    assert!(store.slideshow(mid_render).frame_paths.is_empty());

    let requeued = jobs.iter().find(|j| j.slideshow_id == admitted).unwrap();
    assert_eq!(requeued.purged_objects, 0);
}

#[tokio::test]
async fn completed_slideshow_can_be_rendered_again() {
    let (store, objects, queue) = harness();
    let user = uuid::Uuid::new_v4();
    let id = store.add_slideshow(user, "1:1", 1, STATUS_DRAFT);

    queue
        .admit(id, Arc::new(ScriptedCompositor::ok()), None)
        .await
        .unwrap();
    queue
        .admit(id, Arc::new(ScriptedCompositor::ok()), None)
        .await
        .unwrap();

    assert_eq!(store.begin_order(), vec![id, id]);
    assert_eq!(store.slideshow(id).status_id, STATUS_COMPLETED);
    // Same key per slide: the second render overwrites, not appends.
    assert_eq!(objects.len().await, 1);
    assert_eq!(store.usage_count(user), 2);
}
