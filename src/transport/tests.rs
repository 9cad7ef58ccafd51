use super::memory::MemoryBroker;
use super::BrokerConnector;
use crate::utils::error::{SendError, TransportError};

const URI: &str = "amqp://u:p@broker:5672/";

#[tokio::test]
async fn test_connect_and_send() {
    let broker = MemoryBroker::new();
    let connection = broker.connect(URI).await.unwrap();
    let channel = connection.create_channel().await.unwrap();

    channel.send_to_queue("orders", b"hello".to_vec()).unwrap();

    assert_eq!(broker.messages("orders"), vec![b"hello".to_vec()]);
    assert!(broker.messages("other").is_empty());
    assert_eq!(broker.connected_uris(), vec![URI.to_string()]);
}

#[tokio::test]
async fn test_refused_connections_are_counted() {
    let broker = MemoryBroker::new();
    broker.refuse_next_connections(2);

    assert!(broker.connect(URI).await.is_err());
    assert!(broker.connect(URI).await.is_err());
    assert!(broker.connect(URI).await.is_ok());
    assert_eq!(broker.connect_attempts(), 3);
}

#[tokio::test]
async fn test_rejects_unknown_scheme() {
    let broker = MemoryBroker::new();
    let result = broker.connect("ws://broker:5672/").await;
    assert!(matches!(result, Err(TransportError::Connection(_))));
}

#[tokio::test]
async fn test_closed_channel_reports_signature() {
    let broker = MemoryBroker::new();
    let connection = broker.connect(URI).await.unwrap();
    let stale = connection.create_channel().await.unwrap();

    broker.close_channels();

    let err = stale.send_to_queue("orders", b"x".to_vec()).unwrap_err();
    assert_eq!(err, SendError::channel_closed());

    let fresh = connection.create_channel().await.unwrap();
    fresh.send_to_queue("orders", b"y".to_vec()).unwrap();
    assert_eq!(broker.messages("orders"), vec![b"y".to_vec()]);
}

#[tokio::test]
async fn test_forced_send_failure() {
    let broker = MemoryBroker::new();
    let channel = broker
        .connect(URI)
        .await
        .unwrap()
        .create_channel()
        .await
        .unwrap();

    broker.fail_sends_with(Some("frame too large"));
    let err = channel.send_to_queue("orders", b"x".to_vec()).unwrap_err();
    assert_eq!(err.message(), "frame too large");

    broker.fail_sends_with(None);
    assert!(channel.send_to_queue("orders", b"x".to_vec()).is_ok());
}
