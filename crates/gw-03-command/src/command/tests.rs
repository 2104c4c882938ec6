use super::*;
use shared_types::amqp::Link;
use shared_types::testing::{MockDelivery, MockLink};
use shared_types::constants::DEFAULT_TENANT;

const DEVICE: &str = "4711";

fn command_message(reply_to: &str) -> Message {
    Message::new()
        .with_subject("doThis")
        .with_correlation_id("the-correlation-id")
        .with_reply_to(reply_to)
}

fn parse(message: Message, tenant_id: &str, device_id: &str) -> (Command, std::sync::Arc<MockDelivery>) {
    let receiver = MockLink::receiver("control/DEFAULT_TENANT/4711");
    let delivery = MockDelivery::new();
    let command = Command::from(&*receiver, &*delivery, message, tenant_id, device_id);
    (command, delivery)
}

fn assert_rejected(delivery: &MockDelivery) {
    assert_eq!(
        delivery.dispositions(),
        vec![(DeliveryState::Rejected(None), true)]
    );
    assert!(delivery.is_settled());
}

#[test]
fn test_valid_command() {
    let message = command_message("control/DEFAULT_TENANT/4711/the-reply-to-id");
    let (command, delivery) = parse(message, DEFAULT_TENANT, DEVICE);

    assert!(command.is_valid());
    assert_eq!(command.name(), Some("doThis"));
    assert_eq!(command.reply_to_id(), Some("4711/the-reply-to-id"));
    assert_eq!(
        command.correlation_id(),
        Some(&MessageId::from("the-correlation-id"))
    );
    assert_eq!(command.invalid_reason(), None);
    assert!(delivery.dispositions().is_empty());
}

#[test]
fn test_reply_to_id_keeps_all_trailing_segments() {
    let message = command_message("control/DEFAULT_TENANT/4711/a/b/c");
    let (command, _) = parse(message, DEFAULT_TENANT, DEVICE);

    assert_eq!(command.reply_to_id(), Some("4711/a/b/c"));
    assert_eq!(
        command.response_address().as_deref(),
        Some("control/DEFAULT_TENANT/4711/a/b/c")
    );
}

#[test]
fn test_missing_correlation_id() {
    let message = Message::new()
        .with_subject("doThis")
        .with_reply_to("control/DEFAULT_TENANT/4711/the-reply-to-id");
    let (command, delivery) = parse(message, DEFAULT_TENANT, DEVICE);

    assert!(!command.is_valid());
    assert_eq!(
        command.invalid_reason(),
        Some(&InvalidCommand::MissingCorrelationId)
    );
    assert_rejected(&delivery);
}

#[test]
fn test_missing_reply_to() {
    let message = Message::new()
        .with_subject("doThis")
        .with_correlation_id("the-correlation-id");
    let (command, delivery) = parse(message, DEFAULT_TENANT, DEVICE);

    assert!(!command.is_valid());
    assert_eq!(command.invalid_reason(), Some(&InvalidCommand::MissingReplyTo));
    assert_eq!(command.name(), None);
    assert_eq!(command.correlation_id(), None);
    assert_eq!(
        command.raw_correlation_id(),
        Some(&MessageId::from("the-correlation-id"))
    );
    assert_rejected(&delivery);
}

#[test]
fn test_correlation_id_checked_before_reply_to() {
    let (command, _) = parse(Message::new(), DEFAULT_TENANT, DEVICE);
    assert_eq!(
        command.invalid_reason(),
        Some(&InvalidCommand::MissingCorrelationId)
    );
}

#[test]
fn test_malformed_reply_to() {
    let message = command_message("control/4711/DEFAULT_TENANT");
    let (command, delivery) = parse(message, DEFAULT_TENANT, DEVICE);

    assert!(!command.is_valid());
    assert!(matches!(
        command.invalid_reason(),
        Some(InvalidCommand::MalformedReplyTo { .. })
    ));
    assert_eq!(command.reply_to_id(), None);
    assert_eq!(command.response_address(), None);
    assert_eq!(command.raw_reply_to(), Some("control/4711/DEFAULT_TENANT"));
    assert_rejected(&delivery);
}

#[test]
fn test_single_segment_reply_to_is_malformed() {
    let (command, delivery) = parse(command_message("control"), DEFAULT_TENANT, DEVICE);
    assert!(matches!(
        command.invalid_reason(),
        Some(InvalidCommand::MalformedReplyTo { .. })
    ));
    assert_rejected(&delivery);
}

#[test]
fn test_trailing_slash_reply_to_is_malformed() {
    let message = command_message("control/DEFAULT_TENANT/4711/");
    let (command, delivery) = parse(message, DEFAULT_TENANT, DEVICE);

    assert!(!command.is_valid());
    assert!(matches!(
        command.invalid_reason(),
        Some(InvalidCommand::MalformedReplyTo { .. })
    ));
    assert_eq!(command.reply_to_id(), None);
    assert_rejected(&delivery);
}

#[test]
fn test_non_matching_reply_to() {
    let message = command_message("control/the-reply-to-id");
    let (command, delivery) = parse(message, DEFAULT_TENANT, "4712");

    assert!(!command.is_valid());
    assert_rejected(&delivery);
}

#[test]
fn test_reply_to_for_other_device() {
    let message = command_message("control/DEFAULT_TENANT/4711/the-reply-to-id");
    let (command, delivery) = parse(message, DEFAULT_TENANT, "4712");

    assert_eq!(
        command.invalid_reason(),
        Some(&InvalidCommand::NonMatchingReplyTo {
            reply_to: "control/DEFAULT_TENANT/4711/the-reply-to-id".into(),
            tenant_id: DEFAULT_TENANT.into(),
            device_id: "4712".into(),
        })
    );
    assert_rejected(&delivery);
}

#[test]
fn test_reply_to_for_other_tenant() {
    let message = command_message("control/other-tenant/4711/the-reply-to-id");
    let (command, delivery) = parse(message, DEFAULT_TENANT, DEVICE);

    assert!(matches!(
        command.invalid_reason(),
        Some(InvalidCommand::NonMatchingReplyTo { .. })
    ));
    assert_rejected(&delivery);
}

#[test]
fn test_payload_accessors() {
    let message = command_message("control/DEFAULT_TENANT/4711/r")
        .with_content_type("application/json")
        .with_application_property("k", "v")
        .with_body(&b"{\"on\":true}"[..]);
    let (command, _) = parse(message, DEFAULT_TENANT, DEVICE);

    assert_eq!(command.content_type(), Some("application/json"));
    assert_eq!(command.payload(), Some(&b"{\"on\":true}"[..]));
    assert_eq!(command.application_properties().get("k").map(String::as_str), Some("v"));
    assert_eq!(command.tenant_id(), DEFAULT_TENANT);
    assert_eq!(command.device_id(), DEVICE);
}

#[test]
fn test_display() {
    let (valid, _) = parse(
        command_message("control/DEFAULT_TENANT/4711/r"),
        DEFAULT_TENANT,
        DEVICE,
    );
    assert!(valid.to_string().contains("name: doThis"));

    let (invalid, _) = parse(Message::new(), DEFAULT_TENANT, DEVICE);
    assert!(invalid.to_string().starts_with("Invalid Command"));
}

#[test]
fn test_receiver_is_only_used_for_context() {
    let receiver = MockLink::receiver("control/DEFAULT_TENANT/4711");
    let delivery = MockDelivery::new();
    let _ = Command::from(&*receiver, &*delivery, Message::new(), DEFAULT_TENANT, DEVICE);
    assert!(receiver.calls().is_empty());
    assert!(!receiver.is_open());
}
