use chrono::{TimeZone, Utc};
use taskdeck_core::filter::{self, FilterMode};
use taskdeck_core::storage::KvStore;
use taskdeck_core::store::TaskStore;
use taskdeck_core::task::WELCOME_TITLE;
use tempfile::tempdir;

#[test]
fn seed_mutate_and_reload_from_disk() {
    let temp = tempdir().expect("tempdir");
    let now = Utc
        .with_ymd_and_hms(2026, 2, 16, 5, 0, 0)
        .single()
        .expect("valid time");

    let first_id;
    {
        let mut store = TaskStore::open(KvStore::open(temp.path()));
        assert!(store.seed_if_empty(now));

        first_id = store.add_task("Water the plants", now).expect("task created");
        store.add_task("Ship it", now);
        store.toggle_completed(first_id);
    }

    // A fresh store over the same directory sees the persisted list.
    let mut store = TaskStore::open(KvStore::open(temp.path()));
    assert_eq!(store.tasks().len(), 3);
    assert!(!store.seed_if_empty(now));

    let titles: Vec<&str> = store.tasks().iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Ship it", "Water the plants", WELCOME_TITLE]);

    let counts = filter::count_completed(store.tasks());
    assert_eq!((counts.total, counts.completed), (3, 1));

    let completed = filter::visible_tasks(store.tasks(), FilterMode::Completed);
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, first_id);

    store.delete_task(first_id);
    let reloaded = TaskStore::open(KvStore::open(temp.path()));
    assert_eq!(reloaded.tasks().len(), 2);
}

#[test]
fn corrupt_persisted_list_is_discarded_at_load() {
    let temp = tempdir().expect("tempdir");
    std::fs::write(temp.path().join("tasks.json"), "{definitely not an array")
        .expect("write corrupt payload");

    let now = Utc
        .with_ymd_and_hms(2026, 2, 16, 5, 0, 0)
        .single()
        .expect("valid time");

    let mut store = TaskStore::open(KvStore::open(temp.path()));
    assert!(store.tasks().is_empty());

    assert!(store.seed_if_empty(now));
    assert_eq!(store.tasks().len(), 1);
    assert_eq!(store.tasks()[0].title, WELCOME_TITLE);
}
