//! Admin notification emails via AWS SESv2 (best-effort)

use aws_sdk_sesv2::Client as SesClient;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use rust_decimal::Decimal;

pub async fn send_order_paid_notice(
    ses: &SesClient,
    from: &str,
    to: &str,
    order_id: i64,
    handle: &str,
    stars: i32,
    amount_ton: Decimal,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let subject = Content::builder()
        .data(format!("Order #{order_id} paid"))
        .build()?;

    let body_text = format!(
        "Order #{order_id} is paid.\n\
         Buyer: @{handle}\n\
         Stars: {stars}\n\
         Amount: {amount_ton} TON\n\n\
         If automatic delivery did not go through, complete it from the admin panel."
    );

    let body = Body::builder()
        .text(Content::builder().data(body_text).build()?)
        .build();

    let message = Message::builder().subject(subject).body(body).build();

    ses.send_email()
        .from_email_address(from)
        .destination(Destination::builder().to_addresses(to).build())
        .content(EmailContent::builder().simple(message).build())
        .send()
        .await?;

    tracing::info!(order_id = order_id, to = to, "Paid-order notice sent");
    Ok(())
}
