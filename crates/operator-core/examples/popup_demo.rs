//! Run an operator client against a local hub (or in demo mode if no hub
//! is listening) and print every popup state change.
//!
//! ```bash
//! cargo run -p callpop-call-hub --bin callpop-hub &
//! cargo run -p callpop-operator-core --example popup_demo
//! # then ring it:
//! curl -X POST http://127.0.0.1:5080/test/incoming-call \
//!      -H 'Content-Type: application/json' -d '{"fromNumber":"+353851234567"}'
//! ```

use callpop_operator_core::OperatorClient;

#[tokio::main]
async fn main() {
    let base = std::env::var("CALLPOP_HUB").unwrap_or_else(|_| "http://127.0.0.1:5080".to_string());
    println!("Connecting to {base} (demo mode if unreachable)");

    let mut client = OperatorClient::builder(base).with_group("operators").start().await;

    let mut state = client.notification_state();
    loop {
        let snapshot = state.borrow_and_update().clone();
        if snapshot.visible {
            match (&snapshot.customer, snapshot.resolving) {
                (_, true) => println!(
                    "RINGING  {} ({}): looking up caller…",
                    snapshot.from_number, snapshot.call_sid
                ),
                (Some(customer), false) => {
                    println!(
                        "RINGING  {}: {} [{}]",
                        snapshot.from_number,
                        customer.name,
                        customer.account_id.as_deref().unwrap_or("no account")
                    );
                    client.close();
                }
                (None, false) => {
                    println!("RINGING  {}: unknown caller", snapshot.from_number);
                    client.close();
                }
            }
        } else {
            println!("IDLE");
        }
        if state.changed().await.is_err() {
            break;
        }
    }

    client.stop().await;
}
