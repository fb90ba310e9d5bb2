mod common;

use common::database_with_users;

/// The scenario from the product side: a property with a floor bid of
/// 1000, an owner, and a linked bidder. An accepted bid of 1500 produces
/// the bid record plus exactly two notifications; a later underbid of
/// 1200 is rejected and produces none.
#[test]
fn bid_fanout_end_to_end() {
    let db = database_with_users(&["owner", "bidder"]);
    let property = db
        .create_property(Some("owner"), "4 Birchfield Road", 1000)
        .unwrap();
    db.link_bidder(&property.id, "bidder").unwrap();

    let (bid, fanout) = db.place_bid(&property.id, "bidder", 1500).unwrap();
    assert_eq!(fanout.len(), 2);

    // Both records are durable and visible through the notification store.
    for user in ["owner", "bidder"] {
        assert_eq!(db.unread_notification_count(user).unwrap(), 1);
        let items = db.list_notifications(user, None).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, "bid");
        assert!(items[0].title.contains("1,500"));

        let meta: serde_json::Value = serde_json::from_str(&items[0].metadata).unwrap();
        assert_eq!(meta["property_id"], property.id.as_str());
        assert_eq!(meta["bid_id"], bid.id.as_str());
    }

    // Underbid: rejected, and notification counts are unchanged.
    let err = db.place_bid(&property.id, "bidder", 1200).unwrap_err();
    assert!(matches!(err, gavel_db::StoreError::BidRejected(_)));
    assert_eq!(db.unread_notification_count("owner").unwrap(), 1);
    assert_eq!(db.unread_notification_count("bidder").unwrap(), 1);

    // The owner reads theirs by id; the counter drops to zero and a
    // repeat read changes nothing.
    let owner_items = db.list_notifications("owner", None).unwrap();
    let ids: Vec<String> = owner_items.iter().map(|n| n.id.clone()).collect();
    assert_eq!(db.mark_notifications_read("owner", &ids).unwrap(), 1);
    assert_eq!(db.mark_notifications_read("owner", &ids).unwrap(), 0);
    assert_eq!(db.unread_notification_count("owner").unwrap(), 0);
}

/// Competing bids must each beat the running maximum, not the floor.
#[test]
fn competing_bids_raise_the_bar() {
    let db = database_with_users(&["owner", "first", "second"]);
    let property = db
        .create_property(Some("owner"), "Unit 7", 500)
        .unwrap();
    db.link_bidder(&property.id, "first").unwrap();
    db.link_bidder(&property.id, "second").unwrap();

    db.place_bid(&property.id, "first", 600).unwrap();
    assert!(db.place_bid(&property.id, "second", 600).is_err());
    db.place_bid(&property.id, "second", 700).unwrap();

    // Owner saw both accepted bids.
    assert_eq!(db.unread_notification_count("owner").unwrap(), 2);
}
