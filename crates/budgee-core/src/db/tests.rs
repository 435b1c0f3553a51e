//! Database tests

use super::*;
use crate::models::*;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use rusqlite::params;

    fn funded_db(budget: f64) -> Database {
        let db = Database::in_memory().unwrap();
        db.set_total_budget(budget).unwrap();
        db
    }

    fn expense(title: &str, amount: f64, mood: Mood) -> NewTransaction {
        NewTransaction::now(title, "", amount, mood)
    }

    #[test]
    fn test_in_memory_db_starts_empty() {
        let db = Database::in_memory().unwrap();
        let budget = db.get_budget().unwrap();
        assert_eq!(budget.total_budget, 0.0);
        assert_eq!(budget.remaining_budget, 0.0);
        assert_eq!(budget.savings, 0.0);
        assert!(budget.last_budget_reset.is_none());
        assert!(db.all_transactions(&TransactionFilter::new()).unwrap().is_empty());
    }

    #[test]
    fn test_add_transaction_deducts_remaining() {
        let db = funded_db(1000.0);
        let tx = db
            .add_transaction(&expense("Groceries", 250.0, Mood::Happy))
            .unwrap();

        assert!(tx.id > 0);
        assert_eq!(tx.kind, TransactionKind::Expense);
        assert_eq!(tx.mood, Mood::Happy);
        assert_eq!(db.get_budget().unwrap().remaining_budget, 750.0);
    }

    #[test]
    fn test_overspend_rejected_without_side_effects() {
        let db = funded_db(100.0);
        let err = db
            .add_transaction(&expense("Laptop", 1200.0, Mood::Excited))
            .unwrap_err();

        match err {
            Error::InsufficientBudget {
                requested,
                available,
            } => {
                assert_eq!(requested, 1200.0);
                assert_eq!(available, 100.0);
            }
            other => panic!("expected InsufficientBudget, got {:?}", other),
        }
        assert_eq!(db.get_budget().unwrap().remaining_budget, 100.0);
        assert!(db.all_transactions(&TransactionFilter::new()).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_expense_rejected() {
        let db = funded_db(100.0);
        assert!(matches!(
            db.add_transaction(&expense("Zero", 0.0, Mood::Neutral)),
            Err(Error::InvalidData(_))
        ));
        assert!(matches!(
            db.add_transaction(&expense("NaN", f64::NAN, Mood::Neutral)),
            Err(Error::InvalidData(_))
        ));
        assert!(matches!(
            db.add_transaction(&expense("  ", 5.0, Mood::Neutral)),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_date_and_timestamp_round_trip() {
        let db = funded_db(100.0);
        let date = Utc.with_ymd_and_hms(2024, 3, 9, 18, 45, 12).unwrap();
        let mut new = expense("Dinner", 40.0, Mood::Unhappy);
        new.date = date;
        new.timestamp = Some(1_710_009_912_345);

        let stored = db.add_transaction(&new).unwrap();
        let fetched = db.get_transaction(stored.id).unwrap().unwrap();
        assert_eq!(fetched.date, date);
        assert_eq!(fetched.timestamp, Some(1_710_009_912_345));
        assert_eq!(fetched.mood, Mood::Unhappy);
    }

    #[test]
    fn test_update_amount_applies_difference() {
        let db = funded_db(500.0);
        let tx = db
            .add_transaction(&expense("Shoes", 100.0, Mood::Happy))
            .unwrap();

        let increased = db
            .update_transaction(
                tx.id,
                &TransactionUpdate {
                    amount: Some(150.0),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(increased.amount, 150.0);
        assert_eq!(db.get_budget().unwrap().remaining_budget, 350.0);

        db.update_transaction(
            tx.id,
            &TransactionUpdate {
                amount: Some(50.0),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(db.get_budget().unwrap().remaining_budget, 450.0);
    }

    #[test]
    fn test_update_without_amount_keeps_budget() {
        let db = funded_db(500.0);
        let tx = db
            .add_transaction(&expense("Book", 20.0, Mood::Neutral))
            .unwrap();

        let updated = db
            .update_transaction(
                tx.id,
                &TransactionUpdate {
                    title: Some("Novel".into()),
                    mood: Some(Mood::Excited),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.title, "Novel");
        assert_eq!(updated.mood, Mood::Excited);
        assert_eq!(updated.amount, 20.0);
        assert!(updated.updated_at.is_some());
        assert_eq!(db.get_budget().unwrap().remaining_budget, 480.0);
    }

    #[test]
    fn test_update_date_drops_entry_timestamp() {
        let db = funded_db(500.0);
        let mut new = expense("Lunch", 40.0, Mood::Neutral);
        new.date = chrono::Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        new.timestamp = Some(new.date.timestamp_millis() + 500);
        let tx = db.add_transaction(&new).unwrap();

        let renamed = db
            .update_transaction(
                tx.id,
                &TransactionUpdate {
                    title: Some("Team lunch".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(renamed.timestamp, new.timestamp);

        let moved_to = chrono::Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap();
        let moved = db
            .update_transaction(
                tx.id,
                &TransactionUpdate {
                    date: Some(moved_to),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(moved.date, moved_to);
        assert!(moved.timestamp.is_none());
        assert_eq!(moved.recency_key(), moved_to.timestamp_millis());
    }

    #[test]
    fn test_update_increase_beyond_remaining_rejected() {
        let db = funded_db(200.0);
        let tx = db
            .add_transaction(&expense("Concert", 150.0, Mood::Excited))
            .unwrap();

        let err = db
            .update_transaction(
                tx.id,
                &TransactionUpdate {
                    amount: Some(260.0),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientBudget { .. }));

        let unchanged = db.get_transaction(tx.id).unwrap().unwrap();
        assert_eq!(unchanged.amount, 150.0);
        assert_eq!(db.get_budget().unwrap().remaining_budget, 50.0);
    }

    #[test]
    fn test_update_missing_transaction() {
        let db = funded_db(10.0);
        let err = db
            .update_transaction(
                999,
                &TransactionUpdate {
                    title: Some("x".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_delete_refunds_amount() {
        let db = funded_db(300.0);
        let tx = db
            .add_transaction(&expense("Taxi", 45.5, Mood::Unhappy))
            .unwrap();
        assert_eq!(db.get_budget().unwrap().remaining_budget, 254.5);

        let deleted = db.delete_transaction(tx.id).unwrap();
        assert_eq!(deleted.id, tx.id);
        assert_eq!(db.get_budget().unwrap().remaining_budget, 300.0);
        assert!(db.get_transaction(tx.id).unwrap().is_none());

        assert!(matches!(
            db.delete_transaction(tx.id),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_bookkeeping_entries_cannot_be_edited() {
        let db = funded_db(100.0);
        db.add_to_budget(50.0).unwrap();
        let deposit = db
            .all_transactions(&TransactionFilter::new().kind(Some(TransactionKind::BudgetDeposit)))
            .unwrap()
            .remove(0);

        assert!(matches!(
            db.delete_transaction(deposit.id),
            Err(Error::InvalidData(_))
        ));
        assert!(matches!(
            db.update_transaction(
                deposit.id,
                &TransactionUpdate {
                    amount: Some(1.0),
                    ..Default::default()
                }
            ),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_set_total_budget() {
        let db = funded_db(100.0);
        db.add_transaction(&expense("Snack", 30.0, Mood::Happy))
            .unwrap();

        let state = db.set_total_budget(800.0).unwrap();
        assert_eq!(state.total_budget, 800.0);
        assert_eq!(state.remaining_budget, 800.0);

        assert!(matches!(
            db.set_total_budget(-1.0),
            Err(Error::InvalidData(_))
        ));
        assert_eq!(db.set_total_budget(0.0).unwrap().total_budget, 0.0);
    }

    #[test]
    fn test_add_to_budget_records_deposit() {
        let db = funded_db(100.0);
        let state = db.add_to_budget(25.0).unwrap();
        assert_eq!(state.total_budget, 125.0);
        assert_eq!(state.remaining_budget, 125.0);

        let entries = db
            .all_transactions(&TransactionFilter::new().kind(Some(TransactionKind::BudgetDeposit)))
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Add to Budget");
        assert_eq!(entries[0].mood, Mood::Neutral);
        assert_eq!(entries[0].amount, 25.0);

        assert!(db.add_to_budget(0.0).is_err());
    }

    #[test]
    fn test_savings_deposit_conserves_funds() {
        let db = funded_db(400.0);
        let before = db.get_budget().unwrap();

        let after = db.add_to_savings(150.0).unwrap();
        assert_eq!(after.remaining_budget, 250.0);
        assert_eq!(after.savings, 150.0);
        assert_eq!(after.total_budget, 400.0);
        assert_eq!(
            after.remaining_budget + after.savings,
            before.remaining_budget + before.savings
        );

        let err = db.add_to_savings(251.0).unwrap_err();
        assert!(matches!(err, Error::InsufficientBudget { .. }));
        assert_eq!(db.get_budget().unwrap().savings, 150.0);
    }

    #[test]
    fn test_transfer_from_savings() {
        let db = funded_db(400.0);
        db.add_to_savings(100.0).unwrap();

        let state = db.transfer_from_savings(60.0).unwrap();
        assert_eq!(state.savings, 40.0);
        assert_eq!(state.total_budget, 460.0);
        assert_eq!(state.remaining_budget, 360.0);

        let err = db.transfer_from_savings(41.0).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientSavings {
                requested,
                available
            } if requested == 41.0 && available == 40.0
        ));

        let withdrawals = db
            .all_transactions(
                &TransactionFilter::new().kind(Some(TransactionKind::SavingsWithdrawal)),
            )
            .unwrap();
        assert_eq!(withdrawals.len(), 1);
        assert_eq!(withdrawals[0].title, "Transfer from Savings");
    }

    #[test]
    fn test_monthly_reset_moves_remaining_to_savings_once() {
        let db = funded_db(500.0);
        db.add_transaction(&expense("Rent share", 200.0, Mood::Neutral))
            .unwrap();

        let march = Utc.with_ymd_and_hms(2024, 3, 1, 0, 5, 0).unwrap();
        let reset = db.check_and_reset_monthly_budget(march).unwrap().unwrap();
        assert_eq!(reset.transferred, 300.0);

        let state = db.get_budget().unwrap();
        assert_eq!(state.total_budget, 0.0);
        assert_eq!(state.remaining_budget, 0.0);
        assert_eq!(state.savings, 300.0);
        assert_eq!(state.last_budget_reset, Some(march));

        // Same month: nothing happens
        let later = Utc.with_ymd_and_hms(2024, 3, 28, 12, 0, 0).unwrap();
        assert!(db.check_and_reset_monthly_budget(later).unwrap().is_none());
        assert_eq!(db.get_budget().unwrap().savings, 300.0);

        let notifications = db.list_notifications(10).unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].message, MONTHLY_RESET_MESSAGE);
        assert_eq!(notifications[0].kind, NotificationKind::Info);
        assert_eq!(notifications[0].id, reset.notification_id);
    }

    #[test]
    fn test_monthly_reset_across_year_boundary() {
        let db = funded_db(50.0);
        let dec = Utc.with_ymd_and_hms(2023, 12, 31, 23, 0, 0).unwrap();
        db.check_and_reset_monthly_budget(dec).unwrap().unwrap();

        db.set_total_budget(80.0).unwrap();
        let jan = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let reset = db.check_and_reset_monthly_budget(jan).unwrap().unwrap();
        assert_eq!(reset.transferred, 80.0);
        assert_eq!(db.get_budget().unwrap().savings, 130.0);

        // Same month number a year later still resets
        let next_jan = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap();
        assert!(db.check_and_reset_monthly_budget(next_jan).unwrap().is_some());
    }

    #[test]
    fn test_monthly_reset_with_nothing_left() {
        let db = Database::in_memory().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let reset = db.check_and_reset_monthly_budget(now).unwrap().unwrap();
        assert_eq!(reset.transferred, 0.0);
        // No bookkeeping entry for an empty transfer
        assert!(db.all_transactions(&TransactionFilter::new()).unwrap().is_empty());
    }

    #[test]
    fn test_list_filters_and_sorting() {
        let db = funded_db(1000.0);
        let days = [(1, "Coffee beans", Mood::Happy), (2, "Parking fine", Mood::Regret), (3, "Coffee with Sam", Mood::Excited)];
        for (day, title, mood) in days {
            let mut new = expense(title, 10.0 * day as f64, mood);
            new.date = Utc.with_ymd_and_hms(2024, 5, day, 9, 0, 0).unwrap();
            db.add_transaction(&new).unwrap();
        }

        let all = db.list_transactions(&TransactionFilter::expenses(), 10, 0).unwrap();
        let titles: Vec<_> = all.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["Coffee with Sam", "Parking fine", "Coffee beans"]);

        let oldest_first = db
            .list_transactions(&TransactionFilter::expenses().sort_order(SortOrder::Asc), 10, 0)
            .unwrap();
        assert_eq!(oldest_first[0].title, "Coffee beans");

        let coffee = db
            .list_transactions(&TransactionFilter::new().search(Some("COFFEE")), 10, 0)
            .unwrap();
        assert_eq!(coffee.len(), 2);

        let moods = [Mood::Regret, Mood::Excited];
        let by_mood = db
            .list_transactions(&TransactionFilter::new().moods(Some(&moods)), 10, 0)
            .unwrap();
        assert_eq!(by_mood.len(), 2);

        let from = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let ranged = db
            .list_transactions(&TransactionFilter::new().date_range(Some((from, to))), 10, 0)
            .unwrap();
        assert_eq!(ranged.len(), 1);
        assert_eq!(ranged[0].title, "Parking fine");

        let page = db.list_transactions(&TransactionFilter::expenses(), 1, 1).unwrap();
        assert_eq!(page[0].title, "Parking fine");
    }

    #[test]
    fn test_transaction_totals() {
        let db = funded_db(1000.0);
        for amount in [20.0, 150.0, 100.0, 300.5] {
            db.add_transaction(&expense("Item", amount, Mood::Neutral))
                .unwrap();
        }

        let totals = db.transaction_totals(&TransactionFilter::expenses()).unwrap();
        assert_eq!(totals.count, 4);
        assert_eq!(totals.total_amount, 570.5);
        // 100 is not above the threshold
        assert_eq!(totals.large_count, 2);

        let empty = db
            .transaction_totals(&TransactionFilter::new().search(Some("nothing")))
            .unwrap();
        assert_eq!(empty, TransactionTotals::default());
    }

    #[test]
    fn test_legacy_moods_migrated_on_open() {
        let path = std::env::temp_dir().join(format!(
            "budgee_legacy_{}.db",
            std::process::id()
        ));
        let path = path.to_string_lossy().to_string();
        let _ = std::fs::remove_file(&path);

        {
            let db = Database::new_unencrypted(&path).unwrap();
            let conn = db.conn().unwrap();
            for tag in ["rad", "good", "meh", "bad", "awful", "AWFUL"] {
                conn.execute(
                    "INSERT INTO transactions (title, amount, date, mood) VALUES ('old', 1, '2023-01-01T00:00:00.000Z', ?)",
                    params![tag],
                )
                .unwrap();
            }
        }

        let db = Database::new_unencrypted(&path).unwrap();
        let moods: Vec<Mood> = db
            .list_transactions(&TransactionFilter::new().sort_order(SortOrder::Asc), 10, 0)
            .unwrap()
            .into_iter()
            .map(|t| t.mood)
            .collect();
        assert_eq!(
            moods,
            [
                Mood::Excited,
                Mood::Happy,
                Mood::Neutral,
                Mood::Unhappy,
                Mood::Regret,
                Mood::Regret
            ]
        );

        let conn = db.conn().unwrap();
        let legacy: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM transactions WHERE mood IN ('rad','good','meh','bad','awful','AWFUL')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(legacy, 0);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_notifications_feed() {
        let db = Database::in_memory().unwrap();
        let first = db.add_notification("Budget low", NotificationKind::Warning).unwrap();
        let second = db.add_notification("Saved!", NotificationKind::Success).unwrap();

        let listed = db.list_notifications(10).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].kind, NotificationKind::Warning);

        assert!(db.remove_notification(first.id).unwrap());
        assert!(!db.remove_notification(first.id).unwrap());
        assert_eq!(db.list_notifications(10).unwrap().len(), 1);

        assert_eq!(db.clear_notifications().unwrap(), 1);
        assert!(db.list_notifications(10).unwrap().is_empty());

        assert!(db.add_notification("  ", NotificationKind::Info).is_err());
    }

    #[test]
    fn test_conversation_lifecycle() {
        let db = Database::in_memory().unwrap();
        let conv = db.create_conversation(None).unwrap();
        assert_eq!(conv.name, DEFAULT_CONVERSATION_NAME);
        assert!(conv.has_default_name());
        assert_eq!(conv.unread_count, 0);

        db.add_chat_message(conv.id, Sender::User, "How am I doing?")
            .unwrap();
        db.add_chat_message(conv.id, Sender::Advisor, "Pretty well!")
            .unwrap();
        db.add_chat_message(conv.id, Sender::Advisor, "Keep it up.")
            .unwrap();

        let messages = db.list_chat_messages(conv.id).unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[2].text, "Keep it up.");

        let refreshed = db.get_conversation(conv.id).unwrap().unwrap();
        assert_eq!(refreshed.unread_count, 2);

        db.mark_conversation_read(conv.id).unwrap();
        assert_eq!(db.get_conversation(conv.id).unwrap().unwrap().unread_count, 0);

        let renamed = db.rename_conversation(conv.id, "Budget check-in").unwrap();
        assert_eq!(renamed.name, "Budget check-in");
        assert!(db.rename_conversation(conv.id, "   ").is_err());
    }

    #[test]
    fn test_delete_conversation_cascades() {
        let db = Database::in_memory().unwrap();
        let conv = db.create_conversation(Some("Temp")).unwrap();
        db.add_chat_message(conv.id, Sender::User, "hello").unwrap();

        assert!(db.delete_conversation(conv.id).unwrap());
        assert!(db.get_conversation(conv.id).unwrap().is_none());

        let conn = db.conn().unwrap();
        let orphaned: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM chat_messages WHERE conversation_id = ?",
                params![conv.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(orphaned, 0);

        assert!(!db.delete_conversation(conv.id).unwrap());
        assert!(matches!(
            db.add_chat_message(conv.id, Sender::User, "late"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_conversations_ordered_by_activity() {
        let db = Database::in_memory().unwrap();
        let a = db.create_conversation(Some("Alpha")).unwrap();
        let b = db.create_conversation(Some("Beta")).unwrap();

        let ids: Vec<i64> = db.list_conversations().unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, [b.id, a.id]);

        db.add_chat_message(a.id, Sender::User, "bump").unwrap();
        let ids: Vec<i64> = db.list_conversations().unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, [a.id, b.id]);
    }

    #[test]
    fn test_search_conversations_case_insensitive() {
        let db = Database::in_memory().unwrap();
        db.create_conversation(Some("Grocery Budget")).unwrap();
        db.create_conversation(Some("Vacation plans")).unwrap();

        let found = db.search_conversations("budget").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Grocery Budget");
        assert_eq!(db.search_conversations("").unwrap().len(), 2);
    }

    #[test]
    fn test_search_treats_wildcards_literally() {
        let db = funded_db(1000.0);
        for title in ["50% off shoes", "500 pesos load", "gift_card", "giftcard"] {
            db.add_transaction(&expense(title, 10.0, Mood::Happy)).unwrap();
        }
        let titles = |q: &str| -> Vec<String> {
            db.list_transactions(&TransactionFilter::new().search(Some(q)), 10, 0)
                .unwrap()
                .into_iter()
                .map(|t| t.title)
                .collect()
        };
        assert_eq!(titles("50%"), ["50% off shoes"]);
        assert_eq!(titles("gift_"), ["gift_card"]);

        db.create_conversation(Some("100% savings plan")).unwrap();
        db.create_conversation(Some("1000 peso challenge")).unwrap();
        let found = db.search_conversations("100%").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "100% savings plan");
    }

    #[test]
    fn test_contains_pattern_escapes() {
        assert_eq!(contains_pattern("a_b"), "%a\\_b%");
        assert_eq!(contains_pattern("5%"), "%5\\%%");
        assert_eq!(contains_pattern("c:\\x"), "%c:\\\\x%");
        assert_eq!(contains_pattern("plain"), "%plain%");
    }

    #[test]
    fn test_conversation_preview() {
        let db = Database::in_memory().unwrap();
        let conv = db.create_conversation(None).unwrap();

        db.update_conversation_preview(conv.id, "Short one").unwrap();
        assert_eq!(
            db.get_conversation(conv.id).unwrap().unwrap().last_message,
            "Short one"
        );

        let long = "Can you help me understand where my money went?";
        db.update_conversation_preview(conv.id, long).unwrap();
        let preview = db.get_conversation(conv.id).unwrap().unwrap().last_message;
        assert_eq!(preview, "Can you help me understand whe...");
        assert_eq!(preview.chars().count(), 33);

        assert_eq!(conversation_preview(&"a".repeat(30)), "a".repeat(30));
        assert!(db.update_conversation_preview(9999, "x").is_err());
    }

    #[test]
    fn test_audit_log() {
        let db = Database::in_memory().unwrap();
        db.log_audit("me@example.com", "create", Some("transaction"), Some(1), None)
            .unwrap();
        db.log_audit("scheduler", "monthly_reset", Some("budget"), None, Some("transferred 10.00"))
            .unwrap();

        let entries = db.list_audit_log(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].user_email, "scheduler");
        assert_eq!(entries[1].entity_id, Some(1));
    }
}
