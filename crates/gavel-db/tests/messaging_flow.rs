mod common;

use common::database_with_users;
use gavel_crypto::encrypt::{decrypt_message, encrypt_message};
use gavel_crypto::keys::generate_conversation_key;

/// Two users exchange encrypted messages through the store. Exercises the
/// whole lifecycle: pairing, append, ordering, read state, and the store's
/// indifference to what the bytes mean.
#[test]
fn conversation_lifecycle() {
    let db = database_with_users(&["alice", "bob"]);
    let key = generate_conversation_key();

    // Either side may open the conversation; both land on the same record.
    let conv = db
        .get_or_create_conversation("alice", "bob", &key)
        .unwrap();
    let same = db
        .get_or_create_conversation("bob", "alice", &generate_conversation_key())
        .unwrap();
    assert_eq!(conv.id, same.id);
    assert_eq!(same.shared_key, key.to_vec());

    // Messages travel as ciphertext; the store never sees plaintext.
    let plaintexts = ["hey", "is the flat still listed?", "yes - come by saturday"];
    let senders = ["alice", "alice", "bob"];
    for (text, sender) in plaintexts.iter().zip(senders) {
        let blob = encrypt_message(&key, text.as_bytes()).unwrap();
        db.append_message(&conv.id, sender, &blob).unwrap();
    }

    // Stored order equals insertion order, and each blob decrypts back to
    // exactly what was sent.
    let messages = db.list_messages(&conv.id, "bob").unwrap();
    assert_eq!(messages.len(), 3);
    for (message, text) in messages.iter().zip(plaintexts) {
        assert_eq!(
            decrypt_message(&key, &message.content).unwrap(),
            text.as_bytes()
        );
        assert!(!message.is_read);
    }

    // Bob has two of Alice's messages unread; reading is idempotent.
    let bob_list = db.list_conversations_for("bob").unwrap();
    assert_eq!(bob_list[0].unread_count, 2);
    assert_eq!(db.mark_messages_read(&conv.id, "bob").unwrap(), 2);
    assert_eq!(db.mark_messages_read(&conv.id, "bob").unwrap(), 0);
    assert_eq!(db.list_conversations_for("bob").unwrap()[0].unread_count, 0);

    // Alice still has Bob's reply unread; her own messages never counted.
    assert_eq!(db.list_conversations_for("alice").unwrap()[0].unread_count, 1);
}

/// The conversation list is ordered by most recent activity, and appending
/// to an older conversation moves it back to the top.
#[test]
fn conversation_list_tracks_activity() {
    let db = database_with_users(&["alice", "bob", "carol"]);

    let with_bob = db
        .get_or_create_conversation("alice", "bob", &generate_conversation_key())
        .unwrap();
    let with_carol = db
        .get_or_create_conversation("alice", "carol", &generate_conversation_key())
        .unwrap();

    db.append_message(&with_bob.id, "bob", b"first").unwrap();
    db.append_message(&with_carol.id, "carol", b"second").unwrap();

    let list = db.list_conversations_for("alice").unwrap();
    assert_eq!(list[0].conversation.id, with_carol.id);
    assert_eq!(list[1].conversation.id, with_bob.id);
    assert_eq!(list[0].other_username, "user-carol");

    // Activity in the older conversation reorders the list.
    db.append_message(&with_bob.id, "alice", b"third").unwrap();
    let list = db.list_conversations_for("alice").unwrap();
    assert_eq!(list[0].conversation.id, with_bob.id);
}

/// The losing side of a creation race gets PairExists and recovers by
/// re-reading the pair, ending up on the winner's record.
#[test]
fn creation_race_resolves_to_single_record() {
    let db = database_with_users(&["alice", "bob"]);

    let winner = db.create_conversation("alice", "bob", &[1u8; 32]).unwrap();
    let loser = db.create_conversation("bob", "alice", &[2u8; 32]);
    assert!(matches!(loser, Err(gavel_db::StoreError::PairExists)));

    let recovered = db
        .get_or_create_conversation("bob", "alice", &[2u8; 32])
        .unwrap();
    assert_eq!(recovered.id, winner.id);
    assert_eq!(recovered.shared_key, vec![1u8; 32]);
}
