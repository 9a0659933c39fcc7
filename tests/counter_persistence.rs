use chrono::{DateTime, NaiveDate, Utc};
use tempfile::TempDir;

use recount::{CounterStore, ItemType, Rollup, SqliteStateStore};

fn ts(date: &str) -> DateTime<Utc> {
    format!("{}T12:00:00Z", date).parse().unwrap()
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn open_counter(db_path: &str) -> CounterStore {
    let store = SqliteStateStore::open(db_path).expect("open sqlite store");
    CounterStore::open(Box::new(store)).expect("open counter")
}

#[test]
fn counts_survive_a_reopen() {
    let dir = TempDir::new().expect("temp dir");
    let db_path = dir.path().join("recount.db");
    let db_path = db_path.to_str().unwrap();

    {
        let mut counter = open_counter(db_path);
        counter
            .apply(ItemType::AluminumCan, 1, ts("2024-01-01"))
            .unwrap();
        counter
            .apply(ItemType::AluminumCan, 2, ts("2024-01-02"))
            .unwrap();
        counter.manual_apply(ItemType::GlassBottle, ts("2024-01-02")).unwrap();
    }

    let counter = open_counter(db_path);
    assert_eq!(counter.total(ItemType::AluminumCan), 3);
    assert_eq!(counter.total(ItemType::GlassBottle), 1);

    let daily = counter.query(
        ItemType::AluminumCan,
        Rollup::Daily,
        Some((date("2024-01-01"), date("2024-01-02"))),
    );
    let counts: Vec<u64> = daily.iter().map(|b| b.count).collect();
    assert_eq!(counts, vec![1, 2]);
}

#[test]
fn reset_is_durable() {
    let dir = TempDir::new().expect("temp dir");
    let db_path = dir.path().join("recount.db");
    let db_path = db_path.to_str().unwrap();

    {
        let mut counter = open_counter(db_path);
        counter.apply(ItemType::Pet1, 1, ts("2023-12-31")).unwrap();
        counter.apply(ItemType::Pet1, 3, ts("2024-01-01")).unwrap();
        counter.reset(Rollup::Daily, ts("2024-01-01"));
    }

    let counter = open_counter(db_path);
    assert_eq!(counter.total(ItemType::Pet1), 1);
    let today = counter.query(
        ItemType::Pet1,
        Rollup::Daily,
        Some((date("2024-01-01"), date("2024-01-01"))),
    );
    assert_eq!(today[0].count, 0);
}

#[test]
fn fresh_database_starts_empty() {
    let dir = TempDir::new().expect("temp dir");
    let db_path = dir.path().join("recount.db");
    let counter = open_counter(db_path.to_str().unwrap());
    for item in ItemType::ALL {
        assert_eq!(counter.total(item), 0);
    }
}
