//! Feedback file round-trips through the public store API

use feedback_insights::store::FeedbackStore;
use feedback_insights::FeedbackEntry;
use chrono::NaiveDate;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_save_assigns_next_id_after_existing() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("feedback.txt");
    std::fs::write(
        &path,
        "# Customer Feedback Analysis\n\n## Detailed Feedback Entries\n\n\
         Feedback #1\nCustomer: Alice\nDepartment: Electronics\nDate: 2024-03-01\nComment: Great TV\nSentiment: POSITIVE\n\n\
         Feedback #2\nCustomer: Bob\nDepartment: Grocery\nDate: 2024-03-02\nComment: Long lines\nSentiment: NEGATIVE\n",
    )?;

    let store = FeedbackStore::new(&path);
    let saved = store.save(
        FeedbackEntry::new("Carol", "Bakery", "Bread was stale")
            .with_date(date(2024, 3, 3))
            .with_sentiment("NEGATIVE"),
    )?;
    assert_eq!(saved.id, Some(3));

    let all = store.scan_all()?;
    let ids: Vec<_> = all.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![Some(1), Some(2), Some(3)]);
    assert_eq!(all[2], saved);

    // Preamble and layout survive the rewrite
    let text = std::fs::read_to_string(&path)?;
    assert!(text.starts_with("# Customer Feedback Analysis\n\n## Detailed Feedback Entries\n\n"));
    assert!(text.contains("Feedback #3\nCustomer: Carol\nDepartment: Bakery\nDate: 2024-03-03\nComment: Bread was stale\nSentiment: NEGATIVE\n"));
    Ok(())
}

#[test]
fn test_malformed_block_is_skipped() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("feedback.txt");
    std::fs::write(
        &path,
        "Some notes people left at the top\n\
         ## Detailed Feedback Entries\n\n\
         Feedback #1\nCustomer: Alice\nComment: Fine\n\n\
         Customer: Nobody\nComment: this block has no header\n\n\
         Feedback #3\nComment: Okay\nDate: not-a-date\n",
    )?;

    let store = FeedbackStore::new(&path);
    let all = store.scan_all()?;
    let ids: Vec<_> = all.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![Some(1), Some(3)]);

    // Unparseable dates fall back to today instead of dropping the record
    assert_eq!(all[1].date, Some(chrono::Local::now().date_naive()));
    assert_eq!(all[0].department, None);
    Ok(())
}

#[test]
fn test_queries_and_delete() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FeedbackStore::new(dir.path().join("nested/feedback.txt"));

    // A missing file reads as empty
    assert!(store.scan_all()?.is_empty());
    assert!(store.find_by_id(1).is_none());

    store.save(FeedbackEntry::new("Alice", "Electronics", "Great").with_sentiment("POSITIVE"))?;
    store.save(FeedbackEntry::new("Bob", "electronics", "Broken").with_sentiment("NEGATIVE"))?;
    store.save(FeedbackEntry::new("Carol", "Grocery", "Fresh").with_sentiment("POSITIVE"))?;

    assert_eq!(store.find_by_department("ELECTRONICS").len(), 2);
    assert_eq!(store.find_by_sentiment("positive").len(), 2);
    assert_eq!(store.find_by_id(2).and_then(|e| e.customer).as_deref(), Some("Bob"));

    assert!(store.delete_by_id(2)?);
    assert!(!store.delete_by_id(2)?);
    assert!(store.find_by_id(2).is_none());

    // Ids are never reused below the current maximum
    let next = store.save(FeedbackEntry::new("Dan", "Grocery", "Ok"))?;
    assert_eq!(next.id, Some(4));
    Ok(())
}

#[test]
fn test_save_with_existing_id_replaces_and_moves_to_end() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FeedbackStore::new(dir.path().join("feedback.txt"));
    store.save(FeedbackEntry::new("Alice", "Electronics", "First"))?;
    store.save(FeedbackEntry::new("Bob", "Grocery", "Second"))?;

    store.save(FeedbackEntry::new("Alice", "Electronics", "Edited").with_id(1))?;

    let all = store.scan_all()?;
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, Some(2));
    assert_eq!(all[1].id, Some(1));
    assert_eq!(all[1].comment.as_deref(), Some("Edited"));
    Ok(())
}
