//! Carry a tag context from one thread to another over the wire format.
//!
//! Run with: cargo run --example propagate

use std::thread;

use tagwire_sdk::{attach, current, extract_or_default, inject_current, TagContext};

fn main() {
    // "Client" side: scope a context and serialize it for the call.
    let context = TagContext::builder()
        .insert("service", "checkout")
        .insert("region", "eu-west-1")
        .build();
    let _guard = attach(context);

    let header = inject_current().expect("context fits the wire limit");
    println!("client sends {} header bytes", header.len());

    // "Server" side: a different thread with its own (empty) slot.
    let server = thread::spawn(move || {
        assert!(current().is_empty(), "fresh thread starts with no tags");

        let peer_context = extract_or_default(&header);
        let _guard = attach(peer_context);

        for (key, value) in current().iter() {
            println!("server sees tag {key}={value}");
        }

        // Garbage from a misbehaving peer falls back to "no tags"
        // without disturbing what is attached here.
        let fallback = extract_or_default(b"\x02as\x03df\x02");
        assert!(fallback.is_empty());
        assert_eq!(current().get("service"), Some("checkout"));
    });

    server.join().unwrap();
}
