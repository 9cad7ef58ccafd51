use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::config::ConnectionConfig;
use crate::publisher::{PublisherBuilder, SyncPublisher};
use crate::schema::RequiredFields;
use crate::transport::memory::MemoryBroker;
use crate::utils::logging;

#[derive(Debug, Serialize)]
struct InvoiceIssued {
    #[serde(rename = "type")]
    kind: &'static str,
    invoice_id: u64,
}

fn invoice(invoice_id: u64) -> InvoiceIssued {
    InvoiceIssued {
        kind: "invoice.issued",
        invoice_id,
    }
}

#[tokio::test(start_paused = true)]
async fn integration_publish_survives_broker_restart() {
    logging::init("debug");

    let broker = MemoryBroker::new();
    let config = ConnectionConfig {
        hostname: "broker".to_string(),
        port: 5672,
        username: "u".to_string(),
        password: "p".to_string(),
        vhost: "billing".to_string(),
        use_tls: true,
    };

    let publisher = PublisherBuilder::new(config, "invoices")
        .schema("invoice.issued", RequiredFields::new(["invoice_id"]))
        .log_messages(true)
        .build(Arc::new(broker.clone()))
        .await
        .expect("publisher should connect");

    publisher.publish(&invoice(1)).unwrap();

    // broker goes away and refuses the first two reconnects
    broker.close_channels();
    broker.refuse_next_connections(2);

    let started = Instant::now();
    publisher.publish(&invoice(2)).unwrap();
    while publisher.reconnector().is_reconnecting() {
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    // 10s + 20s of backoff before the third attempt succeeds
    assert!(started.elapsed() >= Duration::from_secs(30));
    assert_eq!(broker.connect_attempts(), 4);
    assert!(
        broker
            .connected_uris()
            .iter()
            .all(|uri| uri == "amqps://u:p@broker:5672/billing")
    );

    publisher.publish(&invoice(3)).unwrap();

    let delivered: Vec<serde_json::Value> = broker
        .messages("invoices")
        .iter()
        .map(|bytes| serde_json::from_slice(bytes).unwrap())
        .collect();
    let ids: Vec<u64> = delivered
        .iter()
        .map(|m| m["invoice_id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 3]);
}
